//! l2vcmgrd - L2 virtual circuit configuration manager
//!
//! Entry point for the l2vcmgrd command.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use l2vcmgrd::tables::DEFAULT_CONFIG_PATH;
use l2vcmgrd::{CommandBatch, DesiredState, L2vcConfig, L2vcMgr};

/// L2 virtual circuit configuration manager
#[derive(Parser, Debug)]
#[command(name = "l2vcmgrd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a circuit from the device and print it
    Show {
        /// Circuit name
        name: String,
    },
    /// Print the commands that would bring the device from BEFORE to AFTER
    Plan(WriteArgs),
    /// Bring the device from BEFORE to AFTER
    Apply(WriteArgs),
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Circuit name
    name: String,

    /// Desired-state JSON before the change (omit when creating)
    #[arg(long)]
    before: Option<PathBuf>,

    /// Desired-state JSON after the change (omit when deleting)
    #[arg(long)]
    after: Option<PathBuf>,
}

impl WriteArgs {
    fn load(&self) -> Result<(Option<DesiredState>, Option<DesiredState>)> {
        let load = |path: &Option<PathBuf>| -> Result<Option<DesiredState>> {
            path.as_ref()
                .map(|p| {
                    DesiredState::load(p)
                        .with_context(|| format!("loading desired state {}", p.display()))
                })
                .transpose()
        };
        Ok((load(&self.before)?, load(&self.after)?))
    }
}

/// Initializes tracing/logging subsystem
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so that
/// command output stays on stdout.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn print_batches<'a>(batches: impl IntoIterator<Item = &'a CommandBatch>) {
    for batch in batches {
        println!("! {:?}", batch.kind);
        for line in &batch.lines {
            println!("{}", line);
        }
    }
}

async fn run(cli: Cli, config: L2vcConfig) -> Result<()> {
    let mut mgr = L2vcMgr::from_config(&config);

    match cli.command {
        Command::Show { name } => match mgr.read_circuit(&name).await? {
            Some(circuit) => {
                println!("{}", serde_json::to_string_pretty(&circuit)?);
            }
            None => println!("circuit {} is absent", name),
        },
        Command::Plan(args) => {
            let (before, after) = args.load()?;
            let plan = mgr.plan_reconcile(&args.name, before.as_ref(), after.as_ref())?;
            println!("! {} {}", plan.op, args.name);
            print_batches(plan.commands.batches());
        }
        Command::Apply(args) => {
            let (before, after) = args.load()?;
            let op = mgr
                .reconcile(&args.name, before.as_ref(), after.as_ref())
                .await
                .with_context(|| format!("reconciling circuit {}", args.name))?;
            println!("{} {}: {}", op, args.name, mgr.state());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match L2vcConfig::load_or_default(&cli.config).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("l2vcmgrd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging.level);
    info!(
        "l2vcmgrd using {} via {:?}",
        config.device.cli_program, config.device.dialects
    );

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("l2vcmgrd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
