//! Command-line surface: `procvisor start|stop|status`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use procvisor::{
    Config, EventLog, LogWriter, ServiceSpec, ServiceStatus, StartMode, StartOutcome, StopOutcome,
    Subscribe, Supervisor, SupervisorError,
};

#[derive(Parser)]
#[command(name = "procvisor")]
#[command(about = "Launch, monitor, and stop a long-running service process", version)]
struct Cli {
    /// Base directory for the pid record and log files.
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Logical service name; keys the pid record and log file names.
    #[arg(long, global = true, default_value = "service")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the service: `procvisor start [flags] -- CMD [ARGS]...`
    Start {
        /// basic = launch only; persistent = launch + watchdog (stays in the
        /// foreground); debug = run attached to this terminal.
        #[arg(long, value_enum, default_value = "basic")]
        mode: Mode,

        /// Capability probe, run via `sh -c` before launching.
        #[arg(long, value_name = "CMDLINE")]
        probe: Option<String>,

        /// One-shot recovery action, run via `sh -c` when the probe fails.
        #[arg(long, value_name = "CMDLINE")]
        recovery: Option<String>,

        /// Ask the service for immediate-flush output.
        #[arg(long)]
        unbuffered: bool,

        /// Env var set to 1 for immediate-flush output (with --unbuffered).
        #[arg(long, value_name = "VAR", default_value = "PYTHONUNBUFFERED")]
        flush_env: String,

        /// The service entry command, after `--`.
        #[arg(last = true, required = true, value_name = "CMD")]
        command: Vec<String>,
    },
    /// Stop the service (graceful, escalating to SIGKILL).
    Stop,
    /// Report RUNNING/NOT_RUNNING from the pid record.
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Basic,
    Persistent,
    Debug,
}

impl From<Mode> for StartMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Basic => StartMode::Basic,
            Mode::Persistent => StartMode::Persistent,
            Mode::Debug => StartMode::Debug,
        }
    }
}

fn sh(cmdline: &str) -> Vec<String> {
    vec!["/bin/sh".into(), "-c".into(), cmdline.into()]
}

async fn run(cli: Cli) -> Result<(), SupervisorError> {
    let mut cfg = Config::default().apply_env();
    if let Some(dir) = cli.base_dir {
        cfg = cfg.with_base_dir(dir);
    }

    match cli.command {
        Commands::Start {
            mode,
            probe,
            recovery,
            unbuffered,
            flush_env,
            command,
        } => {
            cfg.unbuffered = cfg.unbuffered || unbuffered;

            let event_log = EventLog::create(cfg.event_log_path(&cli.name))?;
            let subscribers: Vec<Arc<dyn Subscribe>> =
                vec![Arc::new(LogWriter), Arc::new(event_log)];
            let sup = Supervisor::new(cfg, cli.name.as_str(), subscribers);

            let mut spec = ServiceSpec::new(cli.name.as_str(), command).with_flush_env(flush_env);
            if let Some(cmdline) = probe {
                spec = spec.with_probe(sh(&cmdline));
            }
            if let Some(cmdline) = recovery {
                spec = spec.with_recovery(sh(&cmdline));
            }

            match sup.start(&spec, mode.into()).await? {
                StartOutcome::Launched { pid } => {
                    println!("started pid={pid}");
                    if mode == Mode::Persistent {
                        sup.run_until_shutdown().await?;
                    }
                    Ok(())
                }
                StartOutcome::DebugExited { exit_code } => {
                    std::process::exit(exit_code);
                }
            }
        }
        Commands::Stop => {
            let event_log = EventLog::create(cfg.event_log_path(&cli.name))?;
            let subscribers: Vec<Arc<dyn Subscribe>> =
                vec![Arc::new(LogWriter), Arc::new(event_log)];
            let sup = Supervisor::new(cfg, cli.name.as_str(), subscribers);

            match sup.stop().await? {
                StopOutcome::Terminated { pid, escalated } => {
                    if escalated {
                        println!("stopped pid={pid} (forced)");
                    } else {
                        println!("stopped pid={pid}");
                    }
                }
                StopOutcome::NotRunning => println!("not running"),
            }
            Ok(())
        }
        Commands::Status => {
            let sup = Supervisor::new(cfg, cli.name.as_str(), Vec::new());
            match sup.status() {
                ServiceStatus::Running { pid, since } => {
                    let since: chrono::DateTime<chrono::Utc> = since.into();
                    println!(
                        "RUNNING pid={pid} since={}",
                        since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                    );
                }
                ServiceStatus::NotRunning => println!("NOT_RUNNING"),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;

    // Bus delivery is fire-and-forget; give the subscriber workers a beat to
    // drain the tail of the event log before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
