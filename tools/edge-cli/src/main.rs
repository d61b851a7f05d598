//! Edge CLI - Command line tool for edge interception cache configurations.
//!
//! Commands:
//! - `edge check` - Compile a configuration file and summarize it
//! - `edge routes` - List the compiled routes in match order
//! - `edge fetch` - Answer one request through the pipeline
//! - `edge install` - Warm the precache against a live origin

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edge_observability::{init_tracing, LogFormat, LogSettings};

use commands::{CheckArgs, FetchArgs, InstallArgs, RoutesArgs};

/// Edge CLI - Inspect and exercise interception cache configurations
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path (defaults to edge.toml, .edge.toml or edge.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log format (json or human)
    #[arg(long, global = true, default_value = "human")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a configuration and print a summary
    Check(CheckArgs),

    /// List compiled routes in match order
    Routes(RoutesArgs),

    /// Dispatch one request through the configured pipeline
    Fetch(FetchArgs),

    /// Warm the precache routes against an origin
    Install(InstallArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "debug" } else { "warn" };
    init_tracing(&LogSettings::new(cli.log_format).with_default_directive(directive))?;

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Check(args) => commands::check::run(args, &ctx).await,
        Commands::Routes(args) => commands::routes::run(args, &ctx).await,
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Install(args) => commands::install::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
