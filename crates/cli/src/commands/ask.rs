//! `docent ask`: Single-question or interactive chat.

use std::io::Write;

use docent_chat::{ChatOutcome, ChatPipeline};
use docent_gateway::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!("    DOCENT_API_KEY = 'sk-...'   (takes precedence)");
        eprintln!();
        eprintln!("  Or add it to your config file, globally or per provider:");
        eprintln!("    {}", docent_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!("    [providers.{}] api_key = 'sk-...'", config.chat.provider);
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let state = AppState::from_config(&config).await?;

    if let Some(msg) = message {
        debug!(len = msg.len(), "Single-question mode");
        eprint!("  Thinking...");
        let outcome = state.pipeline.run(&msg).await;
        eprint!("\r              \r");
        println!("{}", render(outcome?));
        return Ok(());
    }

    println!();
    println!("  Docent: Interactive Mode");
    println!();
    println!("  Model:     {}", config.chat.model);
    println!("  Sections:  {}", state.sections.count().await?);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    interactive(&state.pipeline).await?;

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn interactive(pipeline: &ChatPipeline) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        eprint!("  ...");
        match pipeline.run(line).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for text in render(outcome).lines() {
                    println!("  Docent > {text}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                warn!(error = %e, "Query failed");
                println!();
            }
        }
    }

    Ok(())
}

fn render(outcome: ChatOutcome) -> String {
    match outcome {
        ChatOutcome::Answered(reply) => reply.content,
        ChatOutcome::Flagged(verdict) => format!(
            "Your question was flagged by moderation ({}).",
            verdict.flagged_categories().join(", ")
        ),
    }
}
