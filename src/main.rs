use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(version, about = "Static site engine")]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: RoqCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "roq.yaml")]
    config_file: Option<PathBuf>,

    /// Include pages marked as drafts
    #[arg(long, default_value = "false")]
    drafts: bool,

    /// Include pages dated in the future
    #[arg(long, default_value = "false")]
    future: bool,

    /// Abort on the first error
    #[arg(long, default_value = "false")]
    strict: bool,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "roq.yaml")]
    config_file: Option<PathBuf>,

    /// Only print what would be deleted
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum RoqCommand {
    /// Initialize a new Roq site
    Init(InitArgs),

    /// Build the site into its output directory
    Build(BuildArgs),

    /// Delete the output directory
    Clean(CleanArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "roq=debug" } else { "roq=info" })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        RoqCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        RoqCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        RoqCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}
