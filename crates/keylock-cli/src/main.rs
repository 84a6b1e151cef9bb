//! keylock command-line client.
//!
//! Provides the `keylock` binary: one subcommand per lock operation, a
//! health probe, and `bench` for driving request mixes at a server.
//!
//! Exit codes: 0 = accepted/ok, 1 = conflict/locked,
//! 2 = bad request or unexpected status, 3 = transport error.

mod bench;
mod client;

use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keylock_core::{Operation, ResultCode};

use crate::bench::Scenario;
use crate::client::{ClientError, KeylockClient};

/// Advisory lock client.
#[derive(Parser)]
#[command(name = "keylock", about = "Advisory lock client for keylock-server")]
struct Cli {
    /// Base URL of the server.
    #[arg(
        short,
        long,
        env = "KEYLOCK_URL",
        default_value = "http://127.0.0.1:8080",
        global = true
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

/// Polling options for acquiring operations.
#[derive(Args, Debug, Clone, Copy)]
struct RetryArgs {
    /// Keep retrying on conflict for up to this many milliseconds.
    #[arg(long, value_name = "MS")]
    wait: Option<u64>,

    /// Initial pause between retries; doubles up to one second.
    #[arg(long, value_name = "MS", default_value_t = 50)]
    retry_interval: u64,
}

impl RetryArgs {
    /// The polling deadline and first retry pause, when `--wait` was given.
    fn polling(&self) -> Option<(Duration, Duration)> {
        self.wait.map(|wait| {
            (
                Duration::from_millis(wait),
                Duration::from_millis(self.retry_interval.max(1)),
            )
        })
    }
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Take the exclusive lock on a key.
    Lock {
        key: String,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Release the exclusive lock on a key.
    Unlock { key: String },
    /// Add a shared hold on a key.
    Rlock {
        key: String,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Drop a shared hold on a key (never fails).
    Runlock { key: String },
    /// Report whether a key is exclusively locked.
    Status { key: String },
    /// Check that the server is up.
    Health,
    /// Drive a request mix at the server and report throughput.
    Bench {
        #[arg(value_enum)]
        scenario: Scenario,

        /// Concurrent client tasks.
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Distinct random keys in the plan.
        #[arg(short, long, default_value_t = 1000)]
        keys: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = match KeylockClient::new(&cli.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let exit_code = match cli.command {
        Commands::Lock { key, retry } => run_op(&client, Operation::Lock, &key, Some(retry)).await,
        Commands::Unlock { key } => run_op(&client, Operation::Unlock, &key, None).await,
        Commands::Rlock { key, retry } => run_op(&client, Operation::RLock, &key, Some(retry)).await,
        Commands::Runlock { key } => run_op(&client, Operation::RUnlock, &key, None).await,
        Commands::Status { key } => run_op(&client, Operation::Status, &key, None).await,
        Commands::Health => run_health(&client).await,
        Commands::Bench {
            scenario,
            workers,
            keys,
        } => {
            let report = bench::run(&client, scenario, keys, workers).await;
            println!("{}", report);
            if report.errors == 0 {
                0
            } else {
                1
            }
        }
    };
    process::exit(exit_code);
}

/// Execute one operation, printing the result code.
async fn run_op(
    client: &KeylockClient,
    op: Operation,
    key: &str,
    retry: Option<RetryArgs>,
) -> i32 {
    let result = match retry.and_then(|r| r.polling()) {
        Some((wait, interval)) => client.acquire(op, key, wait, interval).await,
        None => client.call(op, key).await,
    };

    match result {
        Ok(code) => {
            println!("{}", code);
            exit_code(code)
        }
        Err(e) => report_error(e),
    }
}

/// Execute the health subcommand.
async fn run_health(client: &KeylockClient) -> i32 {
    match client.health().await {
        Ok(body) => {
            let json = serde_json::to_string_pretty(&body)
                .unwrap_or_else(|e| format!("{{\"error\": \"failed to render health: {}\"}}", e));
            println!("{}", json);
            0
        }
        Err(e) => report_error(e),
    }
}

fn exit_code(code: ResultCode) -> i32 {
    match code {
        ResultCode::Ok | ResultCode::Accepted => 0,
        ResultCode::Conflict | ResultCode::Locked => 1,
        ResultCode::BadRequest => 2,
    }
}

fn report_error(err: ClientError) -> i32 {
    eprintln!("Error: {}", err);
    match err {
        ClientError::Http(_) => 3,
        ClientError::InvalidUrl(_)
        | ClientError::UnaddressableKey(_)
        | ClientError::UnexpectedStatus(_) => 2,
    }
}
