use std::io::{self, BufRead};

use log::trace;

use crate::error::{BeanstalkError, BeanstalkResult, ServerError};

/// Upper bound on what `read_exact` reserves before any bytes have arrived.
const MAX_PREALLOC: usize = 64 * 1024;

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b' ' | b'\r' | b'\n')
}

/// Reads a reply stream as space/CR/LF-delimited tokens and as raw byte chunks.
///
/// Everything goes through the buffer of the wrapped `BufRead`, so a reply split
/// across several socket reads resumes exactly where the last call stopped.
#[derive(Debug)]
pub struct TokenReader<S> {
    inner: S,
}

impl<S: BufRead> TokenReader<S> {
    pub fn new(inner: S) -> Self {
        TokenReader { inner }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Return the next token.
    ///
    /// Leading spaces are skipped. A space ending the token is consumed, while `\r` and
    /// `\n` stay buffered for `expect_eol`. At end of input whatever was collected is
    /// returned, possibly an empty string.
    pub fn next_token(&mut self) -> BeanstalkResult<String> {
        let mut token = Vec::new();
        loop {
            let (used, done) = {
                let available = match self.inner.fill_buf() {
                    Ok(available) => available,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                if available.is_empty() {
                    break;
                }

                let start = if token.is_empty() {
                    available.iter().take_while(|&&b| b == b' ').count()
                } else {
                    0
                };
                match available[start..].iter().position(|&b| is_delimiter(b)) {
                    Some(offset) => {
                        let end = start + offset;
                        token.extend_from_slice(&available[start..end]);
                        let used = if available[end] == b' ' { end + 1 } else { end };
                        (used, true)
                    }
                    None => {
                        token.extend_from_slice(&available[start..]);
                        (available.len(), false)
                    }
                }
            };
            self.inner.consume(used);
            if done {
                break;
            }
        }

        let token = String::from_utf8_lossy(&token).into_owned();
        trace!("token {:?}", token);
        Ok(token)
    }

    /// Read exactly `count` raw bytes, delimiters included.
    ///
    /// `count` comes from the peer, so the buffer grows with the data received.
    pub fn read_exact(&mut self, count: usize) -> BeanstalkResult<Vec<u8>> {
        let mut chunk = Vec::with_capacity(count.min(MAX_PREALLOC));
        while chunk.len() < count {
            let taken = {
                let available = match self.inner.fill_buf() {
                    Ok(available) => available,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                if available.is_empty() {
                    return Err(BeanstalkError::ConnectionClosed {
                        expected: count,
                        missing: count - chunk.len(),
                    });
                }
                let taken = available.len().min(count - chunk.len());
                chunk.extend_from_slice(&available[..taken]);
                taken
            };
            self.inner.consume(taken);
        }
        trace!("read {} raw bytes", count);
        Ok(chunk)
    }

    pub fn expect_token(&mut self, expected: &str) -> BeanstalkResult<()> {
        let token = self.next_token()?;
        if token != expected {
            return Err(ServerError::bad_format(format!(
                "expected '{}' but got: '{}'",
                expected, token
            ))
            .into());
        }
        Ok(())
    }

    pub fn expect_u64(&mut self) -> BeanstalkResult<u64> {
        let token = self.next_token()?;
        // `u64::from_str` accepts a leading '+', the protocol never sends one
        if token.starts_with('+') {
            return Err(invalid_integer(&token));
        }
        token.parse().map_err(|_| invalid_integer(&token))
    }

    pub fn expect_eol(&mut self) -> BeanstalkResult<()> {
        let eol = self.read_exact(2)?;
        if eol != b"\r\n" {
            return Err(ServerError::bad_format(format!(
                "expected \\r\\n but got: {:?}",
                String::from_utf8_lossy(&eol)
            ))
            .into());
        }
        Ok(())
    }
}

fn invalid_integer(token: &str) -> BeanstalkError {
    ServerError::bad_format(format!("expected integer but got: '{}'", token)).into()
}
