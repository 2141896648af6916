//! sales-gateway: Sales Agents Main Binary
//!
//! Runs one role per process.
//!
//! Usage:
//!   sales-gateway expert    - Serve the expert agent
//!   sales-gateway manager   - Serve the manager agent (consults the expert)
//!   sales-gateway chat      - Serve the chat backend (consults the manager)
//!   sales-gateway --help    - Show help

use sales_api::{start_agent_server, start_chat_server};
use sales_core::a2a::{ConsultationClient, HttpAgentTransport, TaskEngine};
use sales_core::agents::card_for;
use sales_core::{
    AgentRole, ChatService, ChatStore, ClientConfig, CompletionProvider, Config, ExpertExecutor,
    LlmClient, ManagerExecutor, PeerConfig, ToolManager,
};
use sales_tools::register_default_tools;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Serve an agent over the task protocol
    Agent(AgentRole),
    /// Serve the chat backend
    Chat,
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Command line overrides for the listening socket
#[derive(Debug, Default, PartialEq, Eq)]
struct Overrides {
    host: Option<String>,
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (mode, overrides) = parse_args(std::env::args().skip(1))?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("sales-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let mut config = Config::load()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    if let Some(host) = overrides.host {
        config.agent.host = host;
    }

    tracing::info!("Starting sales-gateway...");

    match mode {
        RunMode::Agent(role) => {
            if let Some(port) = overrides.port {
                config.agent.port = Some(port);
            }
            run_agent(role, config).await
        }
        RunMode::Chat => {
            if let Some(port) = overrides.port {
                config.api.port = port;
            }
            run_chat(config).await
        }
        _ => Ok(()),
    }
}

/// `RUST_LOG` directives when set and valid, `info` otherwise
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<(RunMode, Overrides)> {
    let mut mode = None;
    let mut overrides = Overrides::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok((RunMode::Help, overrides)),
            "--version" | "-v" => return Ok((RunMode::Version, overrides)),
            "--host" => {
                let host = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--host requires a value"))?;
                overrides.host = Some(host);
            }
            "--port" | "-p" => {
                let port = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--port requires a value"))?;
                overrides.port = Some(
                    port.parse()
                        .map_err(|_| anyhow::anyhow!("Invalid port: {}", port))?,
                );
            }
            "expert" => mode = Some(RunMode::Agent(AgentRole::Expert)),
            "manager" => mode = Some(RunMode::Agent(AgentRole::Manager)),
            "chat" => mode = Some(RunMode::Chat),
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok((mode.unwrap_or(RunMode::Help), overrides))
}

/// Print help message
fn print_help() {
    println!("sales-gateway - Multi-agent sales chat backend");
    println!();
    println!("Usage:");
    println!("  sales-gateway expert  [--host H] [--port P]   Serve the expert agent (default port 10007)");
    println!("  sales-gateway manager [--host H] [--port P]   Serve the manager agent (default port 10008)");
    println!("  sales-gateway chat    [--host H] [--port P]   Serve the chat backend (default port 3000)");
    println!("  sales-gateway --help                          Show this help message");
    println!("  sales-gateway --version                       Show version");
    println!();
    println!("Configuration is read from ./sales-gateway.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY          API key (required for expert and manager)");
    println!("  LLM_MODEL            Model name (default: claude-sonnet-4-20250514)");
    println!("  LLM_PROVIDER         Provider: claude or openai (default: claude)");
    println!("  LLM_BASE_URL         Custom API endpoint");
    println!("  AGENT_HOST           Bind host, IP or hostname (default: 0.0.0.0)");
    println!("  AGENT_PORT           Agent port override");
    println!("  PUBLIC_AGENT_URL     URL published in the agent card");
    println!("  EXPERT_AGENT_URL     Expert agent base URL (default: http://localhost:10007/)");
    println!("  MANAGER_AGENT_URL    Manager agent base URL (default: http://localhost:10008/)");
    println!("  API_KEY              Bearer key for the chat API (optional)");
    println!("  API_PORT             Chat API port (default: 3000)");
    println!("  API_ALLOWED_ORIGINS  Comma-separated CORS origins");
    println!("  CHAT_DB_PATH         SQLite path (default: data/sales-gateway.db)");
    println!("  RUST_LOG             Log filter (default: info)");
}

/// Serve the expert or manager agent
async fn run_agent(role: AgentRole, config: Config) -> anyhow::Result<()> {
    config.require_llm_key()?;

    let llm_client = LlmClient::new(config.llm_config())
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;
    tracing::info!("Model: {} ({:?})", llm_client.model(), llm_client.provider());
    let provider: Arc<dyn CompletionProvider> = Arc::new(llm_client);

    let addr = bind_addr(&config.agent.host, config.agent_port(role)).await?;
    let card = card_for(role, &config.public_agent_url(role));

    match role {
        AgentRole::Expert => {
            let mut tool_manager = ToolManager::new();
            register_default_tools(&mut tool_manager);
            tracing::info!("Registered {} built-in tools", tool_manager.len());

            let engine = TaskEngine::new(ExpertExecutor::new(provider, Arc::new(tool_manager)));
            start_agent_server(addr, engine, card, shutdown_signal()).await
        }
        AgentRole::Manager => {
            let expert = consultation_client(&config.expert, &config.client)?;
            tracing::info!("Consulting expert at {}", config.expert.url);

            let engine = TaskEngine::new(ManagerExecutor::new(provider, expert));
            start_agent_server(addr, engine, card, shutdown_signal()).await
        }
    }
}

/// Serve the chat backend
async fn run_chat(config: Config) -> anyhow::Result<()> {
    let store = ChatStore::new(&config.chat.db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open chat store: {}", e))?;
    tracing::info!("Chat history stored in {}", config.chat.db_path);

    let manager = consultation_client(&config.manager, &config.client)?;
    tracing::info!("Consulting manager at {}", config.manager.url);

    let service = Arc::new(ChatService::new(store, manager, config.chat.send_transcript));
    let addr = bind_addr(&config.agent.host, config.api.port).await?;
    start_chat_server(addr, service, &config.api, shutdown_signal()).await
}

/// One HTTP client pool per peer, owned by this process
fn consultation_client(peer: &PeerConfig, client: &ClientConfig) -> anyhow::Result<ConsultationClient> {
    let transport = HttpAgentTransport::new(&peer.url, client)?;
    Ok(ConsultationClient::new(Arc::new(transport), peer.poll_policy()))
}

/// Resolve the listening socket; `host` may be an IP literal or a hostname
async fn bind_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| anyhow::anyhow!("Cannot resolve bind address {}: {}", host, e))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for bind host: {}", host))
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    tracing::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_roles() {
        let (mode, _) = parse_args(args(&["expert"])).unwrap();
        assert_eq!(mode, RunMode::Agent(AgentRole::Expert));

        let (mode, overrides) = parse_args(args(&["manager", "--port", "9000"])).unwrap();
        assert_eq!(mode, RunMode::Agent(AgentRole::Manager));
        assert_eq!(overrides.port, Some(9000));

        let (mode, overrides) = parse_args(args(&["--host", "127.0.0.1", "chat"])).unwrap();
        assert_eq!(mode, RunMode::Chat);
        assert_eq!(overrides.host.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_parse_defaults_to_help() {
        let (mode, _) = parse_args(Vec::new()).unwrap();
        assert_eq!(mode, RunMode::Help);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(args(&["--port", "not-a-port"])).is_err());
        assert!(parse_args(args(&["--port"])).is_err());
        assert!(parse_args(args(&["serve"])).is_err());
    }

    #[tokio::test]
    async fn test_bind_addr() {
        let addr = bind_addr("0.0.0.0", 10007).await.unwrap();
        assert_eq!(addr, "0.0.0.0:10007".parse().unwrap());

        let addr = bind_addr("localhost", 10008).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 10008);
    }

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            log_filter(Some("sales_core=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }
}
