use anyhow::Result;
use clap::{Args, Subcommand};

use gemini_vision_chat::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Rewrite the config file from the default template
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Get a value by dotted key (e.g. gemini.model)
    Get { key: String },

    /// Set a value by dotted key and save
    Set { key: String, value: String },
}

pub fn run(args: ConfigArgs, mut config: Config, path: Option<&str>) -> Result<()> {
    let path = Config::resolve_path(path)?;

    match args.command {
        ConfigCommands::Show => {
            let mut shown = config.clone();
            if shown.gemini.api_key.is_some() {
                shown.gemini.api_key = Some("(set)".to_string());
            }
            print!("{}", toml::to_string_pretty(&shown)?);
            let source = if config.gemini_api_key().is_some() {
                "configured"
            } else {
                "missing"
            };
            println!("\n# Gemini API key: {}", source);
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save_with_template_to(&path)?;
        }
        ConfigCommands::Get { key } => println!("{}", config.get_value(&key)?),
        ConfigCommands::Set { key, value } => {
            config.set_value(&key, &value)?;
            config.save_to(&path)?;
            println!("Set {} in {}", key, path.display());
        }
    }

    Ok(())
}
