//! Wildspot CLI - command-line client for the Wildspot wildlife API

use clap::Parser;

use wildspot::cli::{self, Cli, CommandContext, Commands};
use wildspot::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        if let Some(hint) = cli::hint_for(&err) {
            eprintln!("  → {}", hint);
        }
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if debug {
        builder.filter_module("wildspot", log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = CommandContext::new(&cli)?;

    match &cli.command {
        Commands::Login(args) => cli::login::run(&ctx, args).await,
        Commands::Logout => cli::logout::run(&ctx).await,
        Commands::Status => cli::status::run(&ctx).await,
        Commands::Refresh => cli::refresh::run(&ctx).await,
        Commands::Request(args) => cli::request::run(&ctx, args).await,
        Commands::Upload(args) => cli::upload::run(&ctx, args).await,
    }
}
