use anyhow::Result;
use clap::Args;

use gemini_vision_chat::config::Config;
use gemini_vision_chat::server::Server;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,
}

pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(model) = args.model {
        config.gemini.model = model;
    }

    let server = Server::new(&config)?;
    server.run().await
}
