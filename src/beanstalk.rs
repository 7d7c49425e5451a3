use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bufstream::BufStream;
use log::{debug, info};

use crate::command::{Command, Status};
use crate::config::Config;
use crate::error::{BeanstalkError, BeanstalkResult, Reason};
use crate::job::{ConnectionId, Job};
use crate::reader::TokenReader;
use crate::request::{Request, Stream};
use crate::response::{parse_dict, parse_tube_list, Response};

const DEFAULT_TUBE: &str = "default";

/// `Beanstalk` provides beanstalkd client operations over one connection.
///
/// Every command blocks until its whole reply, body included, has been read.
/// After a transport failure or a reply that cannot be framed, the connection
/// is dropped and later commands fail with `NotConnected`.
pub struct Beanstalk<S: Read + Write = TcpStream> {
    config: Config,
    stream: Option<Stream<S>>,
    id: ConnectionId,
    using: String,
}

impl<S: Read + Write> fmt::Debug for Beanstalk<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Beanstalk")
            .field("config", &self.config)
            .field("id", &self.id)
            .field("using", &self.using)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl Default for Beanstalk<TcpStream> {
    fn default() -> Self {
        Beanstalk::with_config(Config::default())
    }
}

impl Beanstalk<TcpStream> {
    /// Create a new, not yet connected client with default configuration.
    pub fn new() -> Self {
        Beanstalk::default()
    }

    /// Create a new, not yet connected client.
    pub fn with_config(config: Config) -> Self {
        Beanstalk {
            config,
            stream: None,
            id: ConnectionId::next(),
            using: DEFAULT_TUBE.to_string(),
        }
    }

    /// Change host to beanstalkd server.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().host("localhost").connect().unwrap();
    /// ```
    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    /// Change port to beanstalkd server.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout, with millisecond precision.
    pub fn connection_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.set_connect_timeout(timeout);
        self
    }

    /// Connect to the configured beanstalkd server.
    ///
    /// Resolution and connection failures come back as `BeanstalkError::Connect`
    /// carrying the underlying message.
    pub fn connect(mut self) -> BeanstalkResult<Self> {
        let address = self.config.address();
        let candidates = address
            .to_socket_addrs()
            .map_err(|e| BeanstalkError::Connect(format!("{}: {}", address, e)))?;

        let mut last_error = None;
        for candidate in candidates {
            let attempt = match self.config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(tcp) => {
                    info!("connected to {} ({}) as {}", address, candidate, self.id);
                    self.stream = Some(TokenReader::new(BufStream::new(tcp)));
                    self.using = DEFAULT_TUBE.to_string();
                    return Ok(self);
                }
                Err(e) => {
                    debug!("connecting to {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(BeanstalkError::Connect(match last_error {
            Some(e) => format!("{}: {}", address, e),
            None => format!("{}: no addresses found", address),
        }))
    }
}

impl<S: Read + Write> Beanstalk<S> {
    /// Wrap an already connected stream.
    pub fn from_stream(stream: S, config: Config) -> Self {
        Beanstalk {
            config,
            stream: Some(TokenReader::new(BufStream::new(stream))),
            id: ConnectionId::next(),
            using: DEFAULT_TUBE.to_string(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The id stamped on every job received through this client.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// The tube `put` currently sends jobs to, as last confirmed by the server.
    pub fn using(&self) -> &str {
        &self.using
    }

    /// Put a job into the current tube with the configured priority, delay and ttr.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().connect().unwrap();
    /// let job_id = conn.put_default(b"hello, world").unwrap();
    /// ```
    pub fn put_default(&mut self, body: &[u8]) -> BeanstalkResult<u64> {
        let (priority, delay, ttr) = (self.config.priority, self.config.delay(), self.config.ttr());
        self.put(body, priority, delay, ttr)
    }

    /// Put a job into the current tube and return its id.
    ///
    /// A job the server inserted straight into the buried list still counts as put.
    pub fn put(
        &mut self,
        body: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> BeanstalkResult<u64> {
        let command = Command::Put {
            body,
            priority,
            delay,
            ttr,
        };
        let result = self.send(&command).and_then(|mut reply| match reply.status() {
            Some(Status::Inserted) | Some(Status::Buried) => reply.int_line(),
            Some(Status::JobTooBig) => reply.fail(
                Reason::JobTooBig,
                format!("job too big ({} bytes)", body.len()),
            ),
            _ => Err(reply.unexpected()),
        });
        self.settle(result)
    }

    /// Use a tube for subsequent `put` commands.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().connect().unwrap();
    /// conn.use_tube("jobs").unwrap();
    /// assert_eq!(conn.using(), "jobs");
    /// ```
    pub fn use_tube(&mut self, tube: &str) -> BeanstalkResult<()> {
        let result = self
            .send(&Command::Use(tube))
            .and_then(|mut reply| match reply.status() {
                Some(Status::Using) => reply.expect_line(tube),
                _ => Err(reply.unexpected()),
            });
        self.settle(result)?;
        self.using = tube.to_string();
        Ok(())
    }

    /// Ask the server which tube is in use.
    pub fn list_tube_used(&mut self) -> BeanstalkResult<String> {
        let result = self
            .send(&Command::ListTubeUsed)
            .and_then(|mut reply| match reply.status() {
                Some(Status::Using) => reply.token_line(),
                _ => Err(reply.unexpected()),
            });
        let tube = self.settle(result)?;
        self.using = tube.clone();
        Ok(tube)
    }

    /// Reserve a job from one of the watched tubes, waiting as long as it takes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().connect().unwrap();
    /// conn.watch("jobs").unwrap();
    ///
    /// let job = conn.reserve().unwrap();
    /// // execute job here...
    /// conn.delete(&job).unwrap();
    /// ```
    pub fn reserve(&mut self) -> BeanstalkResult<Job> {
        let origin = self.id;
        let result = self
            .send(&Command::Reserve)
            .and_then(|mut reply| match reply.status() {
                Some(Status::Reserved) => {
                    let (id, body) = reply.job()?;
                    Ok(Job::new(origin, id, body))
                }
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Reserve a job, giving up once the server reports `TIMED_OUT`.
    ///
    /// The wait happens on the server; a zero timeout returns at once.
    pub fn reserve_with_timeout(&mut self, timeout: Duration) -> BeanstalkResult<Option<Job>> {
        let origin = self.id;
        let result = self
            .send(&Command::ReserveWithTimeout(timeout))
            .and_then(|mut reply| match reply.status() {
                Some(Status::Reserved) => {
                    let (id, body) = reply.job()?;
                    Ok(Some(Job::new(origin, id, body)))
                }
                Some(Status::TimedOut) => reply.end().map(|_| None),
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Remove a reserved or buried job from the server.
    pub fn delete(&mut self, job: &Job) -> BeanstalkResult<()> {
        self.check_origin(job)?;
        let result = self
            .send(&Command::Delete(job.id()))
            .and_then(|mut reply| match reply.status() {
                Some(Status::Deleted) => reply.end(),
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Put a reserved job back into the ready queue.
    pub fn release(&mut self, job: &Job, priority: u32, delay: Duration) -> BeanstalkResult<()> {
        self.check_origin(job)?;
        let id = job.id();
        let result = self
            .send(&Command::Release {
                id,
                priority,
                delay,
            })
            .and_then(|mut reply| match reply.status() {
                Some(Status::Released) | Some(Status::Buried) => reply.end(),
                Some(Status::NotFound) => {
                    reply.fail(Reason::NotFound, format!("job {} not found for release", id))
                }
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Bury a job with the configured bury priority.
    pub fn bury_default(&mut self, job: &Job) -> BeanstalkResult<()> {
        let priority = self.config.bury_priority;
        self.bury(job, priority)
    }

    /// Bury a job. It stays out of the ready queue until kicked.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beanstalk_wire::Beanstalk;
    ///
    /// let mut conn = Beanstalk::new().connect().unwrap();
    ///
    /// let job = conn.reserve().unwrap();
    /// conn.bury(&job, 1024).unwrap();
    /// ```
    pub fn bury(&mut self, job: &Job, priority: u32) -> BeanstalkResult<()> {
        self.check_origin(job)?;
        let id = job.id();
        let result = self
            .send(&Command::Bury { id, priority })
            .and_then(|mut reply| match reply.status() {
                Some(Status::Buried) => reply.end(),
                Some(Status::NotFound) => {
                    reply.fail(Reason::NotFound, format!("job {} not found for bury", id))
                }
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Ask for more time to work on a reserved job.
    pub fn touch(&mut self, job: &Job) -> BeanstalkResult<()> {
        self.check_origin(job)?;
        let id = job.id();
        let result = self
            .send(&Command::Touch(id))
            .and_then(|mut reply| match reply.status() {
                Some(Status::Touched) => reply.end(),
                Some(Status::NotFound) => {
                    reply.fail(Reason::NotFound, format!("job {} not found for touch", id))
                }
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Add a tube to the watch list and return how many tubes are watched.
    pub fn watch(&mut self, tube: &str) -> BeanstalkResult<u64> {
        let result = self
            .send(&Command::Watch(tube))
            .and_then(|mut reply| match reply.status() {
                Some(Status::Watching) => reply.int_line(),
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Inspect a job by id without reserving it.
    pub fn peek(&mut self, id: u64) -> BeanstalkResult<Option<Job>> {
        self.peek_with(Command::Peek(id))
    }

    /// Inspect the next ready job in the current tube.
    pub fn peek_ready(&mut self) -> BeanstalkResult<Option<Job>> {
        self.peek_with(Command::PeekReady)
    }

    pub fn peek_delayed(&mut self) -> BeanstalkResult<Option<Job>> {
        self.peek_with(Command::PeekDelayed)
    }

    pub fn peek_buried(&mut self) -> BeanstalkResult<Option<Job>> {
        self.peek_with(Command::PeekBuried)
    }

    /// Return the names of all existing tubes, in server order.
    pub fn list_tubes(&mut self) -> BeanstalkResult<Vec<String>> {
        let result = self
            .send(&Command::ListTubes)
            .and_then(|mut reply| match reply.status() {
                Some(Status::Ok) => reply.body().map(|body| parse_tube_list(&body)),
                _ => Err(reply.unexpected()),
            });
        self.settle(result)
    }

    /// Return server statistics.
    pub fn stats(&mut self) -> BeanstalkResult<HashMap<String, String>> {
        self.stats_with(Command::Stats, "server")
    }

    /// Return statistics about one job.
    pub fn stats_job(&mut self, id: u64) -> BeanstalkResult<HashMap<String, String>> {
        self.stats_with(Command::StatsJob(id), "job")
    }

    /// Return statistics about one tube.
    pub fn stats_tube(&mut self, tube: &str) -> BeanstalkResult<HashMap<String, String>> {
        self.stats_with(Command::StatsTube(tube), "tube")
    }

    /// Say goodbye to the server and close the connection.
    pub fn quit(mut self) -> BeanstalkResult<()> {
        let result = self.request()?.fire(&Command::Quit);
        self.stream = None;
        result
    }

    fn peek_with(&mut self, command: Command) -> BeanstalkResult<Option<Job>> {
        let origin = self.id;
        let result = self.send(&command).and_then(|mut reply| match reply.status() {
            Some(Status::Found) => {
                let (id, body) = reply.job()?;
                Ok(Some(Job::new(origin, id, body)))
            }
            Some(Status::NotFound) => reply.end().map(|_| None),
            _ => Err(reply.unexpected()),
        });
        self.settle(result)
    }

    fn stats_with(
        &mut self,
        command: Command,
        subject: &str,
    ) -> BeanstalkResult<HashMap<String, String>> {
        let result = self.send(&command).and_then(|mut reply| match reply.status() {
            Some(Status::Ok) => reply.body().and_then(|body| parse_dict(&body)),
            Some(Status::NotFound) => {
                reply.fail(Reason::NotFound, format!("{} not found for stats", subject))
            }
            _ => Err(reply.unexpected()),
        });
        self.settle(result)
    }

    fn check_origin(&self, job: &Job) -> BeanstalkResult<()> {
        if job.origin() != Some(self.id) {
            return Err(BeanstalkError::ForeignJob { job_id: job.id() });
        }
        Ok(())
    }

    fn request(&mut self) -> BeanstalkResult<Request<S>> {
        self.stream
            .as_mut()
            .map(Request::new)
            .ok_or(BeanstalkError::NotConnected)
    }

    fn send(&mut self, command: &Command) -> BeanstalkResult<Response<S>> {
        self.request()?.send(command)
    }

    /// Drop the connection once its framing can no longer be trusted.
    fn settle<T>(&mut self, result: BeanstalkResult<T>) -> BeanstalkResult<T> {
        if let Err(e) = &result {
            let broken = e.is_transport() || e.reason() == Some(Reason::BadFormat);
            if broken && self.stream.take().is_some() {
                info!("dropping connection {}: {}", self.id, e);
            }
        }
        result
    }
}
