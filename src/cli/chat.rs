use anyhow::Result;
use clap::Args;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};

use gemini_vision_chat::config::Config;
use gemini_vision_chat::controller::{Action, Controller, Notice, Outcome};
use gemini_vision_chat::render;
use gemini_vision_chat::session::Session;

#[derive(Args)]
pub struct ChatArgs {
    /// Image to start with (png, jpg or jpeg)
    #[arg(short, long)]
    pub image: Option<String>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,
}

pub async fn run(args: ChatArgs, mut config: Config) -> Result<()> {
    if let Some(model) = args.model {
        config.gemini.model = model;
    }
    let width = config.ui.terminal_width;
    let controller = Controller::from_config(&config)?;
    let mut session = Session::new();

    println!("Chat with Gemini Vision (model: {})", controller.model_id());
    print_instructions();

    if let Some(path) = args.image.as_deref() {
        upload(&controller, &mut session, path).await;
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("You: ");

        let input = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        if input.starts_with('/') {
            let mut parts = input.splitn(2, ' ');
            let cmd = parts.next().unwrap_or_default();
            let arg = parts.next().map(str::trim).unwrap_or_default();

            match cmd {
                "/quit" | "/exit" | "/q" => break,
                "/help" | "/h" | "/?" => print_help(),
                "/upload" | "/image" => {
                    if arg.is_empty() {
                        eprintln!("Usage: /upload <file_path>");
                    } else {
                        upload(&controller, &mut session, arg).await;
                    }
                }
                "/remove" => {
                    controller.dispatch(&mut session, Action::Upload(None)).await?;
                    println!("Image removed. Chat history kept.\n");
                }
                "/clear" => {
                    let result = controller.dispatch(&mut session, Action::Clear).await?;
                    print_notices(&result.notices);
                }
                "/history" => println!("{}", render::terminal(&session, width)),
                "/export" => export(&session, arg),
                "/status" => print_status(&session, &controller),
                _ => eprintln!("Unknown command: {} (type /help)", cmd),
            }
            continue;
        }

        print!("Wait for it...");
        io::stdout().flush().ok();
        match controller
            .dispatch(&mut session, Action::Submit(input.to_string()))
            .await
        {
            Ok(result) => {
                println!("\r              \r");
                print_notices(&result.notices);
                if let Outcome::Answered { .. } = result.outcome {
                    let conversation = session.conversation();
                    let exchange = &conversation[conversation.len().saturating_sub(2)..];
                    println!("{}", render::messages(exchange, width));
                }
            }
            Err(e) => {
                println!();
                eprintln!("Error: {}\n", e);
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn upload(controller: &Controller, session: &mut Session, path: &str) {
    match controller.upload_file(session, path).await {
        Ok(_) => {
            if let Some(image) = session.current_image() {
                println!(
                    "Uploaded image: {} ({}x{}, {} bytes)\n",
                    image.name,
                    image.width,
                    image.height,
                    image.size()
                );
            }
        }
        Err(e) => eprintln!("Error: {} (current image unchanged)\n", e),
    }
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::Warning { text } => println!("⚠️  {}", text),
            Notice::Toast { text, icon } => println!("{} {}", icon, text),
            Notice::Spinner { .. } => {}
        }
    }
}

fn export(session: &Session, path: &str) {
    let markdown = render::markdown(session);
    if path.is_empty() {
        println!("{}", markdown);
        return;
    }
    let expanded = shellexpand::tilde(path).to_string();
    match std::fs::write(&expanded, markdown) {
        Ok(()) => println!("Exported {} messages to {}\n", session.len(), expanded),
        Err(e) => eprintln!("Failed to export: {}\n", e),
    }
}

fn print_status(session: &Session, controller: &Controller) {
    println!("\nSession:  {}", session.id());
    println!("Started:  {}", session.started_at().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Model:    {}", controller.model_id());
    println!("State:    {:?}", session.state());
    match session.current_image() {
        Some(image) => println!("Image:    {}", image.name),
        None => println!("Image:    (none)"),
    }
    println!("Messages: {}\n", session.len());
}

fn print_instructions() {
    println!("1. Upload an image with /upload <file>.");
    println!("2. Type a prompt to ask questions about the image.");
    println!("3. Press Enter to get a response from Gemini Vision.");
    println!("4. Use /clear to reset the session.");
    println!("5. Continue the conversation with follow-up questions.");
    println!("Type /help for commands, /quit to exit\n");
}

fn print_help() {
    println!("\nCommands:");
    println!("  /help, /h, /?      - Show this help");
    println!("  /quit, /exit, /q   - Exit chat");
    println!("  /upload <file>     - Upload an image (png, jpg, jpeg)");
    println!("  /remove            - Remove the image, keep the chat history");
    println!("  /clear             - Clear the image and chat history");
    println!("  /history           - Show the chat history");
    println!("  /export [file]     - Export the chat as markdown");
    println!("  /status            - Show session status");
    println!("\nAnything else is sent as a prompt about the current image.\n");
}
