use std::io::{Read, Write};

use bufstream::BufStream;
use log::{debug, warn};

use crate::command::Command;
use crate::error::{BeanstalkResult, Reason, ServerError};
use crate::reader::TokenReader;
use crate::response::Response;

pub(crate) type Stream<S> = TokenReader<BufStream<S>>;

/// A single command/reply exchange on a connection.
pub struct Request<'b, S: Read + Write> {
    stream: &'b mut Stream<S>,
}

impl<'b, S: Read + Write> Request<'b, S> {
    pub fn new(stream: &'b mut Stream<S>) -> Self {
        Request { stream }
    }

    /// Write `command` and read the status word of its reply.
    ///
    /// Error statuses the server may send for any command are turned into a
    /// `ServerError` here, after draining their line.
    pub fn send(mut self, command: &Command) -> BeanstalkResult<Response<'b, S>> {
        self.write(command)?;

        let status = self.stream.next_token()?;
        debug!("<- {} ({})", status, command.name());

        if let Some(reason) = Reason::universal(&status) {
            self.stream.expect_eol()?;
            warn!("server rejected {}: {}", command.name(), status);
            return Err(ServerError::new(
                reason,
                format!("server replied {} to {}", status, command.name()),
            )
            .into());
        }

        Ok(Response::new(command.name(), status, self.stream))
    }

    /// Write `command` without waiting for a reply.
    pub fn fire(mut self, command: &Command) -> BeanstalkResult<()> {
        self.write(command)
    }

    fn write(&mut self, command: &Command) -> BeanstalkResult<()> {
        debug!("-> {}", command);
        let writer = self.stream.get_mut();
        writer.write_all(&command.build())?;
        writer.flush()?;
        Ok(())
    }
}
