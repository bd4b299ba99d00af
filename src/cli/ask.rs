use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use gemini_vision_chat::config::Config;
use gemini_vision_chat::controller::{Controller, Outcome};
use gemini_vision_chat::session::Session;

#[derive(Args)]
pub struct AskArgs {
    /// The question to ask about the image
    pub prompt: String,

    /// Image to ask about (png, jpg or jpeg)
    #[arg(short, long)]
    pub image: String,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: AskArgs, mut config: Config) -> Result<()> {
    if let Some(model) = args.model {
        config.gemini.model = model;
    }
    // No spinner to show in one-shot mode
    config.ui.wait_delay_ms = 0;

    let controller = Controller::from_config(&config)?;
    let mut session = Session::new();

    controller
        .upload_file(&mut session, &args.image)
        .await
        .with_context(|| format!("Failed to load image {}", args.image))?;
    let image_name = session
        .current_image()
        .map(|image| image.name.clone())
        .unwrap_or_default();

    let result = controller.submit(&mut session, &args.prompt).await?;
    let reply = match result.outcome {
        Outcome::Answered { reply } => reply,
        Outcome::Ignored => anyhow::bail!("Prompt is empty"),
        other => anyhow::bail!("Unexpected outcome: {:?}", other),
    };

    if args.format == "json" {
        let output = json!({
            "prompt": args.prompt,
            "image": image_name,
            "model": controller.model_id(),
            "response": reply,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", reply);
    }

    Ok(())
}
