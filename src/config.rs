use std::env;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11300;
pub const DEFAULT_JOB_PRIORITY: u32 = 1024;
pub const DEFAULT_JOB_DELAY: Duration = Duration::from_secs(0);
pub const DEFAULT_JOB_TTR: Duration = Duration::from_secs(60);
pub const DEFAULT_BURY_PRIORITY: u32 = 10;

pub const HOST_ENV: &str = "BEANSTALK_HOST";
pub const PORT_ENV: &str = "BEANSTALK_PORT";

/// Where to find the server and which parameters new jobs get.
///
/// Job durations are whole seconds, which is all the protocol can express.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Connect timeout in milliseconds. `None` blocks as long as the OS allows.
    pub connect_timeout_ms: Option<u64>,
    pub priority: u32,
    pub delay: u64,
    pub ttr: u64,
    pub bury_priority: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: None,
            priority: DEFAULT_JOB_PRIORITY,
            delay: DEFAULT_JOB_DELAY.as_secs(),
            ttr: DEFAULT_JOB_TTR.as_secs(),
            bury_priority: DEFAULT_BURY_PRIORITY,
        }
    }
}

impl Config {
    /// Default config with `BEANSTALK_HOST` and `BEANSTALK_PORT` applied on top.
    ///
    /// An unparsable port is ignored with a warning.
    pub fn from_env() -> Self {
        Config::default().overlay(|key| env::var(key).ok())
    }

    /// Apply `BEANSTALK_HOST` / `BEANSTALK_PORT` as returned by `lookup`.
    fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            if !host.trim().is_empty() {
                self.host = host;
            }
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("ignoring {}={:?}: not a port number", PORT_ENV, port),
            }
        }
        self
    }

    /// The connect timeout, never shorter than one millisecond.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(|ms| Duration::from_millis(ms.max(1)))
    }

    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout_ms =
            timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    pub fn ttr(&self) -> Duration {
        Duration::from_secs(self.ttr)
    }

    pub(crate) fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
