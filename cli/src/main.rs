mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{apportion, study};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log to stderr at a level picked by `-v`; `RUST_LOG` takes precedence.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Apportion(args) => apportion::run(&cli, args),
        Commands::Study(args) => study::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
