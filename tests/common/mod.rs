//! A tiny in-process beanstalkd stand-in: per-tube ready queues, `use`/`watch` state, and
//! enough commands for the client tests.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use beanstalk_wire::{Beanstalk, Config};

pub const MAX_JOB_SIZE: usize = 1 << 16;

#[derive(Default)]
struct Queue {
    next_id: u64,
    ready: HashMap<String, VecDeque<(u64, Vec<u8>)>>,
    reserved: HashMap<u64, Vec<u8>>,
    buried: HashMap<u64, Vec<u8>>,
    tubes: Vec<String>,
    using: String,
    watched: Vec<String>,
}

impl Queue {
    fn new() -> Self {
        Queue {
            next_id: 1,
            tubes: vec!["default".to_string()],
            using: "default".to_string(),
            watched: vec!["default".to_string()],
            ..Default::default()
        }
    }

    fn add_tube(&mut self, tube: &str) {
        if !self.tubes.iter().any(|t| t == tube) {
            self.tubes.push(tube.to_string());
        }
    }

    fn put(&mut self, body: Vec<u8>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.ready
            .entry(self.using.clone())
            .or_default()
            .push_back((id, body));
        id
    }

    /// Oldest ready job across the watched tubes.
    fn take_watched(&mut self) -> Option<(u64, Vec<u8>)> {
        let tube = self
            .watched
            .iter()
            .filter_map(|tube| {
                let (id, _) = self.ready.get(tube)?.front()?;
                Some((*id, tube.clone()))
            })
            .min()
            .map(|(_, tube)| tube)?;
        self.ready.get_mut(&tube)?.pop_front()
    }

    fn front_of_used(&self) -> Option<&(u64, Vec<u8>)> {
        self.ready.get(&self.using)?.front()
    }
}

/// Start a server for exactly one client connection and return its port.
pub fn spawn() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            serve(stream);
        }
    });
    port
}

/// A client connected to a fresh server.
pub fn connected() -> Beanstalk {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: spawn(),
        ..Config::default()
    };
    Beanstalk::with_config(config).connect().expect("connect")
}

fn serve(stream: TcpStream) {
    let mut writer = stream.try_clone().expect("clone");
    let mut reader = BufReader::new(stream);
    let mut queue = Queue::new();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let parts: Vec<&str> = line.trim_end_matches("\r\n").split(' ').collect();
        let reply = match parts.as_slice() {
            ["put", _, _, _, len] => {
                let len: usize = len.parse().expect("len");
                let mut body = vec![0; len + 2];
                reader.read_exact(&mut body).expect("body");
                body.truncate(len);
                if len > MAX_JOB_SIZE {
                    b"JOB_TOO_BIG\r\n".to_vec()
                } else {
                    format!("INSERTED {}\r\n", queue.put(body)).into_bytes()
                }
            }
            ["use", tube] => {
                queue.add_tube(tube);
                queue.using = tube.to_string();
                format!("USING {}\r\n", tube).into_bytes()
            }
            ["watch", tube] => {
                queue.add_tube(tube);
                if !queue.watched.iter().any(|t| t == tube) {
                    queue.watched.push(tube.to_string());
                }
                format!("WATCHING {}\r\n", queue.watched.len()).into_bytes()
            }
            ["reserve"] | ["reserve-with-timeout", _] => match queue.take_watched() {
                Some((id, body)) => {
                    let reply = frame("RESERVED", id, &body);
                    queue.reserved.insert(id, body);
                    reply
                }
                None => b"TIMED_OUT\r\n".to_vec(),
            },
            ["peek-ready"] => match queue.front_of_used() {
                Some((id, body)) => frame("FOUND", *id, body),
                None => b"NOT_FOUND\r\n".to_vec(),
            },
            ["delete", id] => {
                let id: u64 = id.parse().expect("id");
                if queue.reserved.remove(&id).or_else(|| queue.buried.remove(&id)).is_some() {
                    b"DELETED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            ["bury", id, _] => {
                let id: u64 = id.parse().expect("id");
                match queue.reserved.remove(&id) {
                    Some(body) => {
                        queue.buried.insert(id, body);
                        b"BURIED\r\n".to_vec()
                    }
                    None => b"NOT_FOUND\r\n".to_vec(),
                }
            }
            ["list-tubes"] => {
                let mut body = String::from("---\n");
                for tube in &queue.tubes {
                    body.push_str(&format!("- {}\n", tube));
                }
                format!("OK {}\r\n{}\r\n", body.len(), body).into_bytes()
            }
            ["quit"] => return,
            _ => b"UNKNOWN_COMMAND\r\n".to_vec(),
        };
        if writer.write_all(&reply).is_err() {
            return;
        }
    }
}

fn frame(status: &str, id: u64, body: &[u8]) -> Vec<u8> {
    let mut reply = format!("{} {} {}\r\n", status, id, body.len()).into_bytes();
    reply.extend_from_slice(body);
    reply.extend_from_slice(b"\r\n");
    reply
}
