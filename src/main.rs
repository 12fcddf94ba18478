use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use worldrec_watch::config::{
    SupervisorConfig, WatchConfig, DEFAULT_POLL_SECONDS, DEFAULT_TASK_NAME,
};
use worldrec_watch::logging::{self, LogLevel, LogTarget};
use worldrec_watch::process::{
    DetachedLauncher, InstanceLock, ProcessProbe, SystemEnvironment, SystemProcessTable,
};
use worldrec_watch::scheduler::{Registrar, Schtasks};
use worldrec_watch::supervisor::Supervisor;

#[derive(Parser, Debug)]
#[command(name = "worldrec-watch")]
#[command(about = "Start WorldRec whenever VRChat is running", long_about = None)]
struct Args {
    /// Config file overriding process names and install directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides WORLDREC_WATCH_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Directory for the supervisor's log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll for VRChat and launch WorldRec when it is missing
    Run {
        /// Seconds between polls
        #[arg(long, default_value_t = DEFAULT_POLL_SECONDS, value_parser = clap::value_parser!(u64).range(1..))]
        poll_seconds: u64,
    },
    /// Register the supervisor as a logon task (replaces an existing one)
    Register {
        #[arg(long, default_value = DEFAULT_TASK_NAME)]
        task_name: String,

        /// Poll interval embedded in the task's command line
        #[arg(long, default_value_t = DEFAULT_POLL_SECONDS, value_parser = clap::value_parser!(u64).range(1..))]
        poll_seconds: u64,
    },
    /// Remove the logon task; succeeds if it is not registered
    Unregister {
        #[arg(long, default_value = DEFAULT_TASK_NAME)]
        task_name: String,
    },
    /// Print what the supervisor currently sees
    Status {
        #[arg(long, default_value = DEFAULT_TASK_NAME)]
        task_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_target = match args.command {
        Command::Run { .. } => {
            LogTarget::DailyFile(args.log_dir.clone().unwrap_or_else(logging::default_log_dir))
        }
        _ => LogTarget::Stderr,
    };
    logging::init_logging(args.log_level, log_target)?;

    let watch = WatchConfig::load(args.config.as_deref()).context("Failed to load config")?;

    match args.command {
        Command::Run { poll_seconds } => run(watch, poll_seconds).await,
        Command::Register {
            task_name,
            poll_seconds,
        } => {
            let task = registrar(args.config)?.register(&task_name, poll_seconds)?;
            println!("Registered logon task '{}': {}", task.name, task.command_line);
            Ok(())
        }
        Command::Unregister { task_name } => {
            if registrar(args.config)?.unregister(&task_name)? {
                println!("Removed logon task '{task_name}'");
            } else {
                println!("Logon task '{task_name}' was not registered");
            }
            Ok(())
        }
        Command::Status { task_name } => status(watch, args.config, &task_name),
    }
}

async fn run(watch: WatchConfig, poll_seconds: u64) -> Result<()> {
    let config = SupervisorConfig::new(poll_seconds, DEFAULT_TASK_NAME)?;

    let lock_path = InstanceLock::default_path();
    let Some(_lock) = InstanceLock::acquire(&lock_path)? else {
        tracing::info!(
            path = %lock_path.display(),
            holder = ?InstanceLock::holder(&lock_path),
            "another supervisor is already running, exiting"
        );
        return Ok(());
    };

    let supervisor = build_supervisor(&watch, config)?;
    supervisor.run().await;
    Ok(())
}

fn build_supervisor(watch: &WatchConfig, config: SupervisorConfig) -> Result<Supervisor> {
    Ok(Supervisor::new(
        config,
        Box::new(watch.process_view(SystemProcessTable)),
        watch.resolver(Box::new(SystemEnvironment))?,
        Box::new(DetachedLauncher),
        watch.companion.start_flag.clone(),
    ))
}

fn registrar(config_path: Option<PathBuf>) -> Result<Registrar> {
    let exe = std::env::current_exe().context("Cannot locate the supervisor executable")?;
    Ok(Registrar::new(Box::new(Schtasks), exe).with_config_path(config_path)?)
}

fn status(watch: WatchConfig, config_path: Option<PathBuf>, task_name: &str) -> Result<()> {
    let probe = watch.process_view(SystemProcessTable);
    let resolver = watch.resolver(Box::new(SystemEnvironment))?;

    println!("Install dir:       {}", resolver.install_dir().display());
    println!("Target running:    {}", display_result(probe.is_target_running()));
    println!("Companion running: {}", display_result(probe.is_companion_running()));
    match resolver.resolve() {
        Ok(candidate) => println!(
            "Runtime:           {} ({})",
            candidate.program.display(),
            candidate.tier
        ),
        Err(e) => println!("Runtime:           {e}"),
    }
    let lock_path = InstanceLock::default_path();
    match InstanceLock::holder(&lock_path) {
        Some(pid) => println!("Supervisor lock:   held by pid {pid}"),
        None => println!("Supervisor lock:   free"),
    }
    println!(
        "Logon task:        {}",
        display_result(registrar(config_path)?.is_registered(task_name))
    );
    Ok(())
}

fn display_result(result: worldrec_watch::Result<bool>) -> String {
    match result {
        Ok(true) => "yes".to_string(),
        Ok(false) => "no".to_string(),
        Err(e) => format!("unknown ({e})"),
    }
}
