use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands};
use gemini_vision_chat::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Config management must not create the file it is about to inspect
    let config = match &cli.command {
        Commands::Config(_) => Config::load_or_default(cli.config.as_deref())?,
        _ => Config::load_from(cli.config.as_deref())?,
    };

    // RUST_LOG wins, then --verbose, then the config file
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat(args) => cli::chat::run(args, config).await,
        Commands::Ask(args) => cli::ask::run(args, config).await,
        Commands::Serve(args) => cli::serve::run(args, config).await,
        Commands::Config(args) => cli::config::run(args, config, cli.config.as_deref()),
    }
}
