//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `domain_custody` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use domain_custody::config::constants::{
    DATA_DIR, DB_PATH, DEFAULT_INITIAL_WAIT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
    HTTP_TIMEOUT_SECS,
};
use domain_custody::initialization::init_logger_with;
use domain_custody::{
    init_db_pool_with_path, init_schema, run_pipeline, Config, HickoryTxtChecker, LogFormat,
    LogLevel, PollWorker, ResultStore, TaskStore, TxtVerificationEngine,
};

#[derive(Parser)]
#[command(name = "domain_custody", version, about)]
struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, default_value = DB_PATH, global = true)]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a domain list and assess ownership
    Run {
        /// File with one domain per line; `#` comments allowed
        file: PathBuf,

        /// Base directory for per-run artifacts
        #[arg(long, default_value = DATA_DIR)]
        data_dir: PathBuf,

        /// Case identifier; defaults to a generated run id
        #[arg(long)]
        case_id: Option<String>,

        /// API key for the WHOIS API fallback
        #[arg(long, env = "WHOIS_API_KEY", hide_env_values = true)]
        whois_api_key: Option<String>,

        /// Per-request timeout for registry/scrape HTTP calls, in seconds
        #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
        timeout: u64,

        /// Maximum verification poll attempts per minted TXT task
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Interval between verification poll attempts, in seconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval: u64,

        /// Grace period before a task's first DNS check, in seconds
        #[arg(long, default_value_t = DEFAULT_INITIAL_WAIT_SECS)]
        initial_wait: u64,

        /// Drain this case's TXT verification tasks before exiting
        #[arg(long)]
        verify: bool,
    },

    /// Run the DNS poll worker over all WAITING tasks
    Worker {
        /// Interval between worker ticks, in seconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval: u64,

        /// Grace period before a task's first DNS check, in seconds
        #[arg(long, default_value_t = DEFAULT_INITIAL_WAIT_SECS)]
        initial_wait: u64,

        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },

    /// Show the status of one verification task
    Status {
        /// Task id
        task_id: String,
    },

    /// Print the DNS record instructions for one verification task
    Instructions {
        /// Task id
        task_id: String,
    },

    /// List the verification tasks of a case
    Tasks {
        /// Case identifier
        case_id: String,
    },
}

/// Cancellation token that trips on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received; finishing the current step");
            trip.cancel();
        }
    });
    cancel
}

async fn open_engine(db_path: &PathBuf) -> Result<(TxtVerificationEngine, ResultStore)> {
    let pool = init_db_pool_with_path(db_path)
        .await
        .context("Failed to initialize database pool")?;
    init_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;
    Ok((
        TxtVerificationEngine::new(TaskStore::new(pool.clone())),
        ResultStore::new(pool),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    match cli.command {
        Command::Run {
            file,
            data_dir,
            case_id,
            whois_api_key,
            timeout,
            max_attempts,
            poll_interval,
            initial_wait,
            verify,
        } => {
            let config = Config {
                file,
                log_level: cli.log_level,
                log_format: cli.log_format,
                db_path: cli.db_path.clone(),
                data_dir,
                case_id,
                whois_api_key,
                timeout_seconds: timeout,
                max_attempts,
                poll_interval_secs: poll_interval,
                initial_wait_secs: initial_wait,
                verify_inline: verify,
            };

            match run_pipeline(config, cancel_on_ctrl_c()).await {
                Ok(report) => {
                    println!("{}", report.render_text());
                    println!("Results saved in {}", cli.db_path.display());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("domain_custody error: {e:#}");
                    process::exit(1);
                }
            }
        }

        Command::Worker {
            poll_interval,
            initial_wait,
            once,
        } => {
            let (engine, results) = open_engine(&cli.db_path).await?;
            let worker = PollWorker::new(
                engine,
                results,
                Arc::new(HickoryTxtChecker::new()),
                Duration::from_secs(poll_interval),
                Duration::from_secs(initial_wait),
            );
            if once {
                let summary = worker.run_once().await.context("Worker tick failed")?;
                println!(
                    "{} polled, {} verified, {} failed, {} deferred, {} errors",
                    summary.polled,
                    summary.verified,
                    summary.failed,
                    summary.deferred,
                    summary.errors
                );
            } else {
                worker.run(cancel_on_ctrl_c()).await;
            }
            Ok(())
        }

        Command::Status { task_id } => {
            let (engine, _) = open_engine(&cli.db_path).await?;
            match engine.get_status(&task_id).await? {
                Some(task) => {
                    println!("Task:         {}", task.id);
                    println!("Domain:       {}", task.domain);
                    println!("Case:         {}", task.case_id);
                    println!("Status:       {}", task.state.as_str());
                    println!("Token:        {}", task.expected_token);
                    println!("Attempts:     {}/{}", task.attempts, task.max_attempts);
                    if let Some(at) = task.verified_at {
                        println!("Verified at:  {}", at.to_rfc3339());
                    }
                    if let Some(reason) = &task.fail_reason {
                        println!("Fail reason:  {reason}");
                    }
                    Ok(())
                }
                None => {
                    eprintln!("No task with id {task_id}");
                    process::exit(1);
                }
            }
        }

        Command::Instructions { task_id } => {
            let (engine, _) = open_engine(&cli.db_path).await?;
            match engine.instructions(&task_id).await? {
                Some(text) => {
                    println!("{text}");
                    Ok(())
                }
                None => {
                    eprintln!("No task with id {task_id}");
                    process::exit(1);
                }
            }
        }

        Command::Tasks { case_id } => {
            let (engine, _) = open_engine(&cli.db_path).await?;
            let tasks = engine.store().list_by_case(&case_id).await?;
            if tasks.is_empty() {
                println!("No tasks for case {case_id}");
                return Ok(());
            }
            for task in tasks {
                println!(
                    "{}  {:<12} {:>2}/{:<2}  {}",
                    task.id,
                    task.state.as_str(),
                    task.attempts,
                    task.max_attempts,
                    task.domain
                );
            }
            Ok(())
        }
    }
}
