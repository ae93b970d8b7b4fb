//! Interactive or single-message chat with the agent.

use std::io::Write;
use std::sync::Arc;
use taskloom_agent::{AgentLoop, AgentSession};
use taskloom_config::AppConfig;
use taskloom_core::{EventBus, Message};
use taskloom_providers::OpenAiCompatProvider;
use taskloom_tools::DirSkillStore;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::progress::{ProgressRenderer, render_until_closed};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let backend = match config.backend() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set them as environment variables (API_KEY, BASE_URL, MODEL)");
            eprintln!("  or in the config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err("Backend is not configured. See above for setup instructions.".into());
        }
    };

    let provider = Arc::new(OpenAiCompatProvider::new(
        "openai_compat",
        &backend.base_url,
        &backend.api_key,
    ));
    let skills = Arc::new(DirSkillStore::load(&config.skills_dir()).await);
    let event_bus = Arc::new(EventBus::default());
    let agent = AgentLoop::from_config(&config, provider, &backend.model, skills, event_bus.clone());

    let printer = tokio::spawn(render_until_closed(
        event_bus.subscribe(),
        ProgressRenderer::new(),
        |line| println!("{line}"),
    ));

    let mut session = AgentSession::new();
    let mut conv = agent.new_conversation();

    if let Some(msg) = message {
        conv.push(Message::user(&msg));
        let response = agent.run(&mut conv, &mut session, false).await;
        // Closing the bus lets the printer flush every queued line first.
        drop(agent);
        drop(event_bus);
        printer.await?;
        println!("{}", response?);
        return Ok(());
    }

    println!();
    println!("  Taskloom: interactive mode");
    println!();
    println!("  Model:     {}", agent.model());
    println!("  Workdir:   {}", agent.workdir().display());
    println!("  Skills:    {}", join_or_none(&agent.skills().names()));
    println!("  Agents:    {}", join_or_none(&agent.agent_types().names()));
    println!();
    println!("  Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() || matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }

        conv.push(Message::user(input));
        match agent.run(&mut conv, &mut session, true).await {
            Ok(response) => {
                tokio::task::yield_now().await;
                println!();
                println!("{response}");
                println!();
            }
            // Already reported on stderr by the loop.
            Err(_) => println!(),
        }
    }

    drop(agent);
    drop(event_bus);
    printer.await?;
    println!();
    println!("  Goodbye!");
    Ok(())
}

fn join_or_none<S: std::borrow::Borrow<str>>(names: &[S]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
