pub mod ask;
pub mod chat;
pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gemini-vision-chat")]
#[command(author, version, about = "Ask a Gemini vision model about an image")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "GEMINI_VISION_CHAT_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat about an image
    Chat(chat::ChatArgs),

    /// Ask a single question about an image
    Ask(ask::AskArgs),

    /// Serve the single-page web UI
    Serve(serve::ServeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}
