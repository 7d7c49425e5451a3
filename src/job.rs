use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BeanstalkError, BeanstalkResult};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Identifies one client connection, so a job can only be settled where it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        ConnectionId(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `Job` is an immutable snapshot of a job received from the server.
///
/// Delete or bury it through the client it came from, e.g. `conn.delete(&job)`.
/// `Job::default()` is an empty placeholder (id 0, no body) that no server sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    id: u64,
    body: Vec<u8>,
    origin: Option<ConnectionId>,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "Job(id: {}, body: \"{}\")",
            self.id,
            String::from_utf8_lossy(&self.body)
        )
    }
}

impl Job {
    pub(crate) fn new(origin: ConnectionId, id: u64, body: Vec<u8>) -> Job {
        Job {
            id,
            body,
            origin: Some(origin),
        }
    }

    /// Return job id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return job body.
    pub fn body(&self) -> &[u8] {
        &self.body[..]
    }

    /// The connection this job was received on, `None` for the placeholder.
    pub fn origin(&self) -> Option<ConnectionId> {
        self.origin
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.body()
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Read the body as a base-10 integer, surrounding whitespace allowed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().connect().unwrap();
    /// conn.put_default(b"42").unwrap();
    ///
    /// let job = conn.reserve().unwrap();
    /// assert_eq!(job.as_integer().unwrap(), 42);
    /// conn.delete(&job).unwrap();
    /// ```
    pub fn as_integer(&self) -> BeanstalkResult<i64> {
        let text = std::str::from_utf8(&self.body)
            .map_err(|_| BeanstalkError::InvalidPayload("body is not valid UTF-8".to_string()))?;
        text.trim().parse().map_err(|_| {
            BeanstalkError::InvalidPayload(format!("{:?} is not an integer", text))
        })
    }
}
