use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use beanstalk_wire::{Beanstalk, Config};
use clap::{Parser, Subcommand};
use log::info;

/// Sentences put and read back by `stress`, one job each.
const STRESS_WORDS: &str = "This will return a newly-reserved job. If no job is available to be \
reserved, beanstalkd will wait to send a response until one becomes available. Once a job is \
reserved for the client, the client has limited time to run (TTR) the job before the job times out.";

#[derive(Parser)]
#[command(name = "beans")]
#[command(about = "Small beanstalkd client for poking at tubes")]
struct Args {
    /// Server host [default: $BEANSTALK_HOST or localhost]
    #[arg(long)]
    host: Option<String>,

    /// Server port [default: $BEANSTALK_PORT or 11300]
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Put a raw job into a tube. Reads the job from stdin when none is given.
    Put { tube: String, job: Option<String> },
    /// Reserve, print and delete every job arriving in a tube. Runs until killed.
    Reserve { tube: String },
    /// Show the next ready job in a tube without reserving it.
    Peek { tube: String },
    /// List all tubes on the server.
    Tubes,
    /// Put a batch of jobs and verify they come back in order.
    Stress {
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        #[arg(long, default_value = "default")]
        tube: String,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    let mut conn = Beanstalk::with_config(config)
        .connect()
        .context("connecting to beanstalkd")?;

    match args.command {
        Action::Put { tube, job } => {
            let body = match job {
                Some(job) => job.into_bytes(),
                None => {
                    eprintln!("Reading from stdin...");
                    let mut body = Vec::new();
                    io::stdin().read_to_end(&mut body)?;
                    body
                }
            };
            conn.use_tube(&tube)?;
            let id = conn.put_default(&body)?;
            println!("{}", id);
        }
        Action::Reserve { tube } => {
            conn.watch(&tube)?;
            loop {
                let job = conn.reserve()?;
                println!("Received job:\n{}", job.as_string());
                conn.delete(&job)?;
            }
        }
        Action::Peek { tube } => {
            conn.use_tube(&tube)?;
            match conn.peek_ready()? {
                Some(job) => println!("Next ready job:\n{}", job.as_string()),
                None => println!("No ready job is in the tube."),
            }
        }
        Action::Tubes => {
            for tube in conn.list_tubes()? {
                println!("{}", tube);
            }
        }
        Action::Stress { rounds, tube } => stress(&mut conn, rounds, &tube)?,
    }

    Ok(())
}

fn stress(conn: &mut Beanstalk, rounds: u32, tube: &str) -> Result<()> {
    conn.use_tube(tube)?;
    conn.watch(tube)?;
    let words: Vec<&str> = STRESS_WORDS.split(' ').collect();

    for round in 0..rounds {
        for word in &words {
            conn.put_default(word.as_bytes())?;
        }
        for word in &words {
            let job = conn.reserve()?;
            if job.body() != word.as_bytes() {
                bail!(
                    "round {}: expected {:?}, got {:?} (job {})",
                    round,
                    word,
                    job.as_string(),
                    job.id()
                );
            }
            conn.delete(&job)?;
        }
        info!("round {} verified {} jobs", round, words.len());
    }

    println!("Verified {} jobs in {} rounds", words.len() as u64 * rounds as u64, rounds);
    Ok(())
}
