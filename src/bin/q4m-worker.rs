//! q4m-worker CLI: consume a Q4M queue table with an external command.

use clap::{Parser, Subcommand};
use q4m_worker::config::Config;
use q4m_worker::config::secrets::ExposeSecret;
use q4m_worker::db::Db;
use q4m_worker::hook::CommandQueue;
use q4m_worker::runner::{Runner, RunnerConfig};
use q4m_worker::session::QueueSession;
use q4m_worker::telemetry::{TelemetryConfig, init_telemetry};
use q4m_worker::worker::{RunOutcome, Worker};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "q4m-worker", about = "Consume jobs from a MySQL Q4M queue table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Claim jobs and hand each one to a command
    Run {
        /// Queue table (`table` or `db.table`)
        #[arg(long)]
        table: String,
        /// Handle a single job and exit
        #[arg(long)]
        once: bool,
        /// Sleep between runs when the queue is empty
        #[arg(long, default_value_t = 5000)]
        poll_interval_ms: u64,
        /// Command run per job; receives Q4M_TABLE and Q4M_JOB
        command: PathBuf,
        /// Arguments passed to the command
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Print the number of rows in a queue table
    Count {
        #[arg(long)]
        table: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "q4m-worker".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let mut db = Db::connect(config.database_url.expose_secret()).await?;
    db.health_check().await?;

    match cli.command {
        Command::Run {
            table,
            once,
            poll_interval_ms,
            command,
            args,
        } => {
            let queue = CommandQueue::new(table, command).args(args);
            let worker = Worker::with_config(db, queue, config.worker_config()).await?;
            if once {
                cmd_run_once(worker).await
            } else {
                cmd_serve(worker, Duration::from_millis(poll_interval_ms)).await
            }
        }
        Command::Count { table } => {
            let count = db.count(&table).await?;
            println!("{count}");
            db.close().await?;
            Ok(())
        }
    }
}

/// Handle one job; `run(true)` closes the connection afterwards.
async fn cmd_run_once(mut worker: Worker<CommandQueue, Db>) -> anyhow::Result<()> {
    match worker.run(true).await? {
        RunOutcome::Completed(job) => println!("Completed: {job}"),
        RunOutcome::Idle => println!("Queue {} is empty", worker.table_name()),
        RunOutcome::TimedOut => println!("Timed out waiting on {}", worker.table_name()),
    }
    Ok(())
}

async fn cmd_serve(worker: Worker<CommandQueue, Db>, poll_interval: Duration) -> anyhow::Result<()> {
    let runner = Runner::new(worker, RunnerConfig { poll_interval });

    let handle = runner.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        handle.shutdown();
    });

    let completed = runner.run().await?;
    println!("Completed {completed} job(s)");
    Ok(())
}
