//! tcond command - Diffserv traffic conditioner tool.

mod commands;

use clap::{Parser, Subcommand};

use commands::Output;

#[derive(Parser)]
#[command(name = "tcond", version, about = "Diffserv traffic conditioner tool")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Log every conditioning step.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a configuration and print its action table.
    #[command(visible_alias = "c")]
    Check(commands::check::CheckCmd),

    /// Run a packet trace through a conditioner.
    #[command(visible_alias = "r")]
    Replay(commands::replay::ReplayCmd),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let output = Output {
        json: cli.json,
        pretty: cli.pretty,
    };

    let result = match cli.command {
        Command::Check(cmd) => cmd.run(&output),
        Command::Replay(cmd) => cmd.run(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
