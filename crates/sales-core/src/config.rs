//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. sales-gateway.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::a2a::PollPolicy;
use crate::Error;

/// LLM Provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude API
    #[default]
    Claude,
    /// OpenAI-compatible API (Mistral, GLM, etc.)
    OpenAi,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "openai" | "mistral" | "glm" => LlmProvider::OpenAi,
            _ => LlmProvider::Claude,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API provider
    #[serde(default)]
    pub provider: LlmProvider,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::Claude,
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Which agent a process hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Expert,
    Manager,
}

impl AgentRole {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Expert => 10007,
            Self::Manager => 10008,
        }
    }

    /// Host name used on the container network
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::Expert => "expert-agent",
            Self::Manager => "manager-agent",
        }
    }
}

/// Agent server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_host")]
    pub host: String,

    /// Port override; each role has its own default
    pub port: Option<u16>,

    /// URL published in the agent card
    pub public_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: default_agent_host(),
            port: None,
            public_url: None,
        }
    }
}

fn default_agent_host() -> String {
    "0.0.0.0".to_string()
}

/// A remote agent this process consults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Base URL of the remote agent (its card is served below it)
    pub url: String,

    /// Maximum number of task polls before giving up
    pub max_attempts: u32,

    /// Delay between task polls in milliseconds
    pub poll_interval_ms: u64,
}

impl PeerConfig {
    pub fn expert() -> Self {
        Self {
            url: "http://localhost:10007/".to_string(),
            max_attempts: 40,
            poll_interval_ms: 500,
        }
    }

    pub fn manager() -> Self {
        Self {
            url: "http://localhost:10008/".to_string(),
            max_attempts: 120,
            poll_interval_ms: 500,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_millis(self.poll_interval_ms))
    }
}

/// HTTP client pool settings for agent-to-agent calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on in-flight requests; excess requests wait for a slot
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Keep-alive connections retained per host
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_client_timeout(),
            max_connections: default_max_connections(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

fn default_client_timeout() -> u64 {
    90
}

fn default_max_connections() -> usize {
    100
}

fn default_max_idle_per_host() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key for HTTP API authentication
    pub key: Option<String>,

    /// Port for the chat HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins. If empty, any origin is allowed
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Send the whole transcript to the manager instead of the latest message
    #[serde(default = "default_send_transcript")]
    pub send_transcript: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            send_transcript: default_send_transcript(),
        }
    }
}

fn default_db_path() -> String {
    "data/sales-gateway.db".to_string()
}

fn default_send_transcript() -> bool {
    true
}

/// Main configuration for sales-gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    /// Expert agent, consulted by the manager
    pub expert: PeerConfig,

    /// Manager agent, consulted by the chat backend
    pub manager: PeerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
            expert: PeerConfig::expert(),
            manager: PeerConfig::manager(),
            client: ClientConfig::default(),
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 環境変数が優先
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./sales-gateway.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> crate::Result<Self> {
        if Path::new("sales-gateway.toml").exists() {
            return Self::from_toml_file("sales-gateway.toml");
        }

        Ok(Self::from_env())
    }

    /// Load configuration from defaults and environment variables only
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            api_key: llm.api_key.unwrap_or_default(),
            model: llm.model.unwrap_or_else(default_model),
            provider: LlmProvider::parse(&llm.provider.unwrap_or_default()),
            base_url: llm.base_url,
        };

        let agent = toml.agent.unwrap_or_default();
        let agent_config = AgentConfig {
            host: agent.host.unwrap_or_else(default_agent_host),
            port: agent.port,
            public_url: agent.public_url,
        };

        let expert = toml.expert.unwrap_or_default().into_peer(PeerConfig::expert());
        let manager = toml.manager.unwrap_or_default().into_peer(PeerConfig::manager());

        let client = toml.client.unwrap_or_default();
        let client_config = ClientConfig {
            timeout_secs: client.timeout_secs.unwrap_or_else(default_client_timeout),
            max_connections: client.max_connections.unwrap_or_else(default_max_connections),
            max_idle_per_host: client
                .max_idle_per_host
                .unwrap_or_else(default_max_idle_per_host),
        };

        let api = toml.api.unwrap_or_default();
        let api_config = ApiConfig {
            key: api.key,
            port: api.port.unwrap_or_else(default_api_port),
            allowed_origins: api.allowed_origins,
        };

        let chat = toml.chat.unwrap_or_default();
        let chat_config = ChatConfig {
            db_path: chat.db_path.unwrap_or_else(default_db_path),
            send_transcript: chat.send_transcript.unwrap_or_else(default_send_transcript),
        };

        Config {
            llm: llm_config,
            agent: agent_config,
            expert,
            manager,
            client: client_config,
            api: api_config,
            chat: chat_config,
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Some(api_key) = non_empty_env("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = non_empty_env("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = non_empty_env("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(base_url) = non_empty_env("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(host) = non_empty_env("AGENT_HOST") {
            self.agent.host = host;
        }
        if let Some(port) = non_empty_env("AGENT_PORT").and_then(|p| p.parse().ok()) {
            self.agent.port = Some(port);
        }
        if let Some(url) = non_empty_env("PUBLIC_AGENT_URL") {
            self.agent.public_url = Some(url);
        }

        if let Some(url) = non_empty_env("EXPERT_AGENT_URL") {
            self.expert.url = url;
        }
        if let Some(url) = non_empty_env("MANAGER_AGENT_URL") {
            self.manager.url = url;
        }

        if let Some(key) = non_empty_env("API_KEY") {
            self.api.key = Some(key);
        }
        if let Some(port) = non_empty_env("API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }
        if let Some(origins) = non_empty_env("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins =
                Some(origins.split(',').map(|s| s.trim().to_string()).collect());
        }

        if let Some(path) = non_empty_env("CHAT_DB_PATH") {
            self.chat.db_path = path;
        }
    }

    /// Get the effective LLM configuration
    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm
    }

    /// Port the agent server for `role` binds to
    pub fn agent_port(&self, role: AgentRole) -> u16 {
        self.agent.port.unwrap_or_else(|| role.default_port())
    }

    /// URL published in the agent card for `role`
    pub fn public_agent_url(&self, role: AgentRole) -> String {
        if let Some(url) = &self.agent.public_url {
            return url.clone();
        }

        let port = self.agent_port(role);
        if self.agent.host == "0.0.0.0" {
            tracing::warn!(
                "Agent bound to 0.0.0.0 without PUBLIC_AGENT_URL; advertising http://{}:{}/",
                role.service_name(),
                port
            );
            format!("http://{}:{}/", role.service_name(), port)
        } else {
            format!("http://{}:{}/", self.agent.host, port)
        }
    }

    /// Fail early when a role that talks to the LLM has no API key
    pub fn require_llm_key(&self) -> crate::Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(Error::Config("LLM_API_KEY not set".to_string()));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    agent: Option<TomlAgentConfig>,
    expert: Option<TomlPeerConfig>,
    manager: Option<TomlPeerConfig>,
    client: Option<TomlClientConfig>,
    api: Option<TomlApiConfig>,
    chat: Option<TomlChatConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// API プロバイダー ("claude" または "openai")
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAgentConfig {
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPeerConfig {
    url: Option<String>,
    max_attempts: Option<u32>,
    poll_interval_ms: Option<u64>,
}

impl TomlPeerConfig {
    fn into_peer(self, defaults: PeerConfig) -> PeerConfig {
        PeerConfig {
            url: self.url.unwrap_or(defaults.url),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            poll_interval_ms: self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct TomlClientConfig {
    timeout_secs: Option<u64>,
    max_connections: Option<usize>,
    max_idle_per_host: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    key: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlChatConfig {
    db_path: Option<String>,
    send_transcript: Option<bool>,
}
