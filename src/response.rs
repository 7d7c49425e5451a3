use std::collections::HashMap;
use std::io::{Read, Write};
use std::str::FromStr;

use log::warn;
use serde_yaml::Value;

use crate::command::Status;
use crate::error::{BeanstalkError, BeanstalkResult, Reason, ServerError};
use crate::request::Stream;

/// The `---\n` line opening a list body.
const LIST_HEADER_LEN: usize = 4;
/// The `- ` in front of every list entry.
const LIST_MARKER_LEN: usize = 2;

/// The reply to one command, positioned right after its status word.
///
/// Every accessor consumes what it reads, and the ones that finish a reply also
/// consume its line ending, so the next command starts on a clean frame.
pub struct Response<'b, S: Read + Write> {
    command: &'static str,
    status: String,
    stream: &'b mut Stream<S>,
}

impl<'b, S: Read + Write> Response<'b, S> {
    pub(crate) fn new(command: &'static str, status: String, stream: &'b mut Stream<S>) -> Self {
        Response {
            command,
            status,
            stream,
        }
    }

    /// The status word, if it is one this client knows.
    pub fn status(&self) -> Option<Status> {
        Status::from_str(&self.status).ok()
    }

    /// Consume the rest of a status-only line.
    pub fn end(&mut self) -> BeanstalkResult<()> {
        self.stream.expect_eol()
    }

    /// `<status> <int>\r\n`
    pub fn int_line(&mut self) -> BeanstalkResult<u64> {
        let value = self.stream.expect_u64()?;
        self.stream.expect_eol()?;
        Ok(value)
    }

    /// `<status> <token>\r\n`, returning the token.
    pub fn token_line(&mut self) -> BeanstalkResult<String> {
        let token = self.stream.next_token()?;
        self.stream.expect_eol()?;
        Ok(token)
    }

    /// `<status> <expected>\r\n`
    pub fn expect_line(&mut self, expected: &str) -> BeanstalkResult<()> {
        self.stream.expect_token(expected)?;
        self.stream.expect_eol()
    }

    /// `<status> <len>\r\n<body>\r\n`
    pub fn body(&mut self) -> BeanstalkResult<Vec<u8>> {
        let len = self.length()?;
        self.stream.expect_eol()?;
        self.chunk(len)
    }

    /// `<status> <id> <len>\r\n<body>\r\n`
    pub fn job(&mut self) -> BeanstalkResult<(u64, Vec<u8>)> {
        let id = self.stream.expect_u64()?;
        let len = self.length()?;
        self.stream.expect_eol()?;
        let body = self.chunk(len)?;
        Ok((id, body))
    }

    /// Finish a recognized error status, returning it as a `ServerError`.
    pub fn fail<T>(mut self, reason: Reason, message: impl Into<String>) -> BeanstalkResult<T> {
        self.end()?;
        Err(ServerError::new(reason, message).into())
    }

    /// The error for a status this command does not expect. Nothing more is read:
    /// after a reply we cannot frame, the connection is not trusted again.
    pub fn unexpected(self) -> BeanstalkError {
        warn!("unexpected reply to {}: {:?}", self.command, self.status);
        ServerError::bad_format(format!(
            "unexpected reply to {}: {}",
            self.command, self.status
        ))
        .into()
    }

    fn length(&mut self) -> BeanstalkResult<usize> {
        let len = self.stream.expect_u64()?;
        usize::try_from(len).map_err(|_| {
            BeanstalkError::from(ServerError::bad_format(format!(
                "body length {} does not fit in memory",
                len
            )))
        })
    }

    fn chunk(&mut self, len: usize) -> BeanstalkResult<Vec<u8>> {
        let body = self.stream.read_exact(len)?;
        self.stream.expect_eol()?;
        Ok(body)
    }
}

/// Parse a `list-tubes` body: a `---\n` header, then one `- <name>\n` line per tube.
///
/// Only this fixed layout is understood. Bytes after the last newline are ignored.
pub fn parse_tube_list(body: &[u8]) -> Vec<String> {
    let entries = body.get(LIST_HEADER_LEN..).unwrap_or_default();
    let mut tubes = Vec::new();
    let mut rest = entries;
    while let Some(end) = rest.iter().position(|&b| b == b'\n') {
        let name = rest[..end].get(LIST_MARKER_LEN..).unwrap_or_default();
        tubes.push(String::from_utf8_lossy(name).into_owned());
        rest = &rest[end + 1..];
    }
    tubes
}

/// Parse a `stats*` body, a flat YAML dict, into string values.
pub fn parse_dict(body: &[u8]) -> BeanstalkResult<HashMap<String, String>> {
    let parsed: HashMap<String, Value> = serde_yaml::from_slice(body)
        .map_err(|e| ServerError::bad_format(format!("invalid stats body: {}", e)))?;
    Ok(parsed
        .into_iter()
        .map(|(key, value)| (key, scalar_to_string(value)))
        .collect())
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_start_matches("---").trim().to_string())
            .unwrap_or_default(),
    }
}
