//! A blocking Beanstalkd client.
//!
//! Replies are read through a token reader that understands the two halves of the
//! protocol: space/CRLF-delimited status lines, and length-prefixed binary bodies
//! that may contain any byte. Each command issues one request, drains its whole
//! reply and returns a typed value or a classified error.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! beanstalk-wire = "^0.1.0"
//! ```
//!
//! Producer
//!
//! ```no_run
//! use std::time::Duration;
//! use beanstalk_wire::Beanstalk;
//!
//! let mut conn = Beanstalk::new()
//!      .connect()
//!      .expect("connect to beanstalkd server failed");
//!
//! conn.use_tube("jobs").unwrap();
//! conn.put_default(b"hello, world").unwrap();
//! conn.put(b"hello, rust", 1, Duration::from_secs(10), Duration::from_secs(1800)).unwrap();
//! ```
//!
//! Worker
//!
//! ```no_run
//! use beanstalk_wire::{Beanstalk, Reason};
//!
//! let mut conn = Beanstalk::new()
//!      .connect()
//!      .expect("connect to beanstalkd server failed");
//!
//! conn.watch("jobs").unwrap();
//!
//! let job = conn.reserve().unwrap();
//! // execute job here...
//! match conn.bury_default(&job) {
//!     Err(e) if e.reason() == Some(Reason::NotFound) => println!("job expired"),
//!     other => other.unwrap(),
//! }
//! ```
//!
//! Errors come in two tiers: transport failures (`Connect`, `Io`,
//! `ConnectionClosed`, `NotConnected`) and `ServerError`s carrying a `Reason`.
pub use crate::beanstalk::Beanstalk;
pub use crate::command::{Command, Status};
pub use crate::config::Config;
pub use crate::error::{BeanstalkError, BeanstalkResult, Reason, ServerError};
pub use crate::job::{ConnectionId, Job};
pub use crate::reader::TokenReader;

mod beanstalk;
mod command;
pub mod config;
mod error;
mod job;
mod reader;
mod request;
mod response;
