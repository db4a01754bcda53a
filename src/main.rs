use anyhow::Result;
use clap::Parser;
use convograph::api::{StreamEvent, ThreadState};
use convograph::cli::{Cli, Commands};
use convograph::client::BackendClient;
use convograph::{utils, ConversationService, Message, Settings};
use std::net::SocketAddr;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => handle_serve(settings, host, port).await,
        Commands::Chat { thread_id, remote } => handle_chat(settings, thread_id, remote).await,
        Commands::State { thread_id, remote } => handle_state(settings, thread_id, remote).await,
        Commands::Delete { thread_id, remote } => handle_delete(settings, thread_id, remote).await,
        Commands::Threads => handle_threads(settings).await,
    }
}

async fn handle_serve(settings: Settings, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let service = ConversationService::from_settings(&settings).await?;
    tracing::info!(
        "convograph v{} (model {}, summary threshold {})",
        env!("CARGO_PKG_VERSION"),
        settings.llm.model,
        settings.graph.summary_threshold
    );

    convograph::server::serve(service, addr).await
}

/// Where chat turns go: an in-process service or a remote server
enum ChatBackend {
    Local(ConversationService),
    Remote(BackendClient),
}

impl ChatBackend {
    async fn connect(settings: &Settings, remote: Option<String>) -> Result<Self> {
        Ok(match remote {
            Some(url) => ChatBackend::Remote(BackendClient::new(url)),
            None => ChatBackend::Local(ConversationService::from_settings(settings).await?),
        })
    }

    async fn history(&self, thread_id: &str) -> Result<ThreadState> {
        match self {
            ChatBackend::Local(service) => Ok(service.get_state(thread_id).await),
            ChatBackend::Remote(client) => client.fetch_history(thread_id).await,
        }
    }

    async fn send(&self, thread_id: &str, content: &str) -> Result<StreamEvent> {
        match self {
            ChatBackend::Local(service) => {
                let mut rx = service.stream(thread_id, vec![Message::human(content)]);
                rx.recv()
                    .await
                    .ok_or_else(|| anyhow::anyhow!("Turn ended without a result"))
            }
            ChatBackend::Remote(client) => client.send_turn(thread_id, content).await,
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        match self {
            ChatBackend::Local(service) => Ok(service.delete_state(thread_id).await?),
            ChatBackend::Remote(client) => client.delete_thread(thread_id).await,
        }
    }
}

async fn handle_chat(settings: Settings, thread_id: Option<String>, remote: Option<String>) -> Result<()> {
    let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let backend = ChatBackend::connect(&settings, remote).await?;

    utils::print_header("Chat");
    utils::print_info(&format!("Thread ID: {}", thread_id));
    utils::print_info("Type your messages (/help for commands, Ctrl+C to exit)\n");

    let history = backend.history(&thread_id).await?;
    if !history.messages.is_empty() {
        utils::print_success(&format!(
            "Resumed thread with {} stored messages",
            history.messages.len()
        ));
        history.messages.iter().for_each(utils::print_message);
        println!();
    }

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/state" => {
                let state = backend.history(&thread_id).await?;
                utils::print_info(&format!("Messages in thread: {}", state.messages.len()));
                utils::print_summary(&state.summary);
                println!();
                continue;
            }
            "/clear" => {
                match backend.delete(&thread_id).await {
                    Ok(()) => utils::print_success("Thread history cleared"),
                    Err(e) => utils::print_error(&format!("Failed to clear thread: {}", e)),
                }
                println!();
                continue;
            }
            "/help" => {
                println!("Special commands:");
                println!("  /state  - Show message count and summary");
                println!("  /clear  - Delete this thread's history");
                println!("  /help   - Show this help");
                println!("  Ctrl+C  - Exit\n");
                continue;
            }
            _ => {}
        }

        match backend.send(&thread_id, input).await? {
            StreamEvent::Message { messages, state, .. } => {
                if let Some(reply) = messages.last().filter(|m| m.kind == "ai") {
                    utils::print_message(reply);
                }
                if state.compacted {
                    utils::print_info("(older messages were summarized)");
                }
            }
            StreamEvent::Error { error } => utils::print_error(&format!("Stream error: {}", error)),
        }
        println!();
    }

    Ok(())
}

async fn handle_state(settings: Settings, thread_id: String, remote: Option<String>) -> Result<()> {
    let backend = ChatBackend::connect(&settings, remote).await?;
    let state = backend.history(&thread_id).await?;

    utils::print_header(&format!("Thread {}", thread_id));
    if state.messages.is_empty() {
        utils::print_info("No stored messages");
    }
    state.messages.iter().for_each(utils::print_message);
    utils::print_summary(&state.summary);
    Ok(())
}

async fn handle_delete(settings: Settings, thread_id: String, remote: Option<String>) -> Result<()> {
    let backend = ChatBackend::connect(&settings, remote).await?;
    backend.delete(&thread_id).await?;
    utils::print_success(&format!("Deleted thread {}", thread_id));
    Ok(())
}

async fn handle_threads(settings: Settings) -> Result<()> {
    let service = ConversationService::from_settings(&settings).await?;
    let threads = service.list_threads().await?;

    if threads.is_empty() {
        utils::print_info("No stored threads");
    }
    for thread_id in threads {
        println!("{}", thread_id);
    }
    Ok(())
}
