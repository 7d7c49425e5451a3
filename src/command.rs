use std::fmt;
use std::time::Duration;

use strum::{Display, EnumString};

/// Reply status words this client understands. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Inserted,
    Buried,
    Using,
    Reserved,
    TimedOut,
    Found,
    NotFound,
    Deleted,
    Released,
    Touched,
    Watching,
    JobTooBig,
}

/// One request line, plus the job body for `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Put {
        body: &'a [u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    },
    Use(&'a str),
    Reserve,
    ReserveWithTimeout(Duration),
    Delete(u64),
    Release {
        id: u64,
        priority: u32,
        delay: Duration,
    },
    Bury {
        id: u64,
        priority: u32,
    },
    Touch(u64),
    Watch(&'a str),
    Peek(u64),
    PeekReady,
    PeekDelayed,
    PeekBuried,
    ListTubes,
    ListTubeUsed,
    Stats,
    StatsJob(u64),
    StatsTube(&'a str),
    Quit,
}

impl<'a> Command<'a> {
    /// The command keyword, used to label replies in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Put { .. } => "put",
            Command::Use(_) => "use",
            Command::Reserve => "reserve",
            Command::ReserveWithTimeout(_) => "reserve-with-timeout",
            Command::Delete(_) => "delete",
            Command::Release { .. } => "release",
            Command::Bury { .. } => "bury",
            Command::Touch(_) => "touch",
            Command::Watch(_) => "watch",
            Command::Peek(_) => "peek",
            Command::PeekReady => "peek-ready",
            Command::PeekDelayed => "peek-delayed",
            Command::PeekBuried => "peek-buried",
            Command::ListTubes => "list-tubes",
            Command::ListTubeUsed => "list-tube-used",
            Command::Stats => "stats",
            Command::StatsJob(_) => "stats-job",
            Command::StatsTube(_) => "stats-tube",
            Command::Quit => "quit",
        }
    }

    /// Encode the full request as it goes on the wire.
    pub fn build(&self) -> Vec<u8> {
        let mut message = self.to_string().into_bytes();
        message.extend_from_slice(b"\r\n");
        if let Command::Put { body, .. } = self {
            message.extend_from_slice(body);
            message.extend_from_slice(b"\r\n");
        }
        message
    }
}

/// The request line, without its terminating CRLF.
impl<'a> fmt::Display for Command<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = self.name();
        match self {
            Command::Put {
                body,
                priority,
                delay,
                ttr,
            } => write!(
                f,
                "{} {} {} {} {}",
                name,
                priority,
                delay.as_secs(),
                ttr.as_secs(),
                body.len()
            ),
            Command::Use(tube) | Command::Watch(tube) | Command::StatsTube(tube) => {
                write!(f, "{} {}", name, tube)
            }
            Command::ReserveWithTimeout(timeout) => write!(f, "{} {}", name, timeout.as_secs()),
            Command::Delete(id) | Command::Touch(id) | Command::Peek(id) | Command::StatsJob(id) => {
                write!(f, "{} {}", name, id)
            }
            Command::Release {
                id,
                priority,
                delay,
            } => write!(f, "{} {} {} {}", name, id, priority, delay.as_secs()),
            Command::Bury { id, priority } => write!(f, "{} {} {}", name, id, priority),
            Command::Reserve
            | Command::PeekReady
            | Command::PeekDelayed
            | Command::PeekBuried
            | Command::ListTubes
            | Command::ListTubeUsed
            | Command::Stats
            | Command::Quit => f.write_str(name),
        }
    }
}
