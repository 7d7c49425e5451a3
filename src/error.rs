use std::io;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

pub type BeanstalkResult<T> = Result<T, BeanstalkError>;

/// Why the server (or its reply) was rejected.
///
/// Variants display in their wire spelling, e.g. `JOB_TOO_BIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    OutOfMemory,
    InternalError,
    Draining,
    BadFormat,
    UnknownCommand,
    ExpectedCrlf,
    JobTooBig,
    NotFound,
    UnknownError,
}

impl Reason {
    /// Error statuses the server may send in reply to any command.
    pub(crate) fn universal(status: &str) -> Option<Reason> {
        match status {
            "OUT_OF_MEMORY" => Some(Reason::OutOfMemory),
            "INTERNAL_ERROR" => Some(Reason::InternalError),
            "DRAINING" => Some(Reason::Draining),
            "BAD_FORMAT" => Some(Reason::BadFormat),
            "UNKNOWN_COMMAND" => Some(Reason::UnknownCommand),
            "EXPECTED_CRLF" => Some(Reason::ExpectedCrlf),
            _ => None,
        }
    }
}

/// A reply that was an error status, or did not fit the command's grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {message}")]
pub struct ServerError {
    reason: Reason,
    message: String,
}

impl ServerError {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        ServerError {
            reason,
            message: message.into(),
        }
    }

    pub(crate) fn bad_format(message: impl Into<String>) -> Self {
        ServerError::new(Reason::BadFormat, message)
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum BeanstalkError {
    #[error("unable to connect to beanstalk server: {0}")]
    Connect(String),

    #[error("not connected to a beanstalk server")]
    NotConnected,

    #[error("connection closed with {missing} of {expected} bytes still expected")]
    ConnectionClosed { expected: usize, missing: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("job {job_id} was not received on this connection")]
    ForeignJob { job_id: u64 },

    #[error("invalid job payload: {0}")]
    InvalidPayload(String),
}

impl BeanstalkError {
    /// True for failures of the socket itself, after which the connection is unusable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BeanstalkError::Connect(_)
                | BeanstalkError::NotConnected
                | BeanstalkError::ConnectionClosed { .. }
                | BeanstalkError::Io(_)
        )
    }

    /// The server-side reason, if this is a server error.
    pub fn reason(&self) -> Option<Reason> {
        match self {
            BeanstalkError::Server(e) => Some(e.reason()),
            _ => None,
        }
    }
}
