use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub history: HistoryConfig,
    pub rate_limit: RateLimitConfig,
    pub personas: PersonasConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` (only behind a proxy)
    pub trust_proxy: bool,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            trust_proxy: false,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// OpenAI-compatible endpoint; the public API when unset
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Deadline for one completion call; capped at `server.request_timeout_secs`
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: Some(120),
        }
    }
}

impl From<&LlmConfig> for persona_llm::ChatOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Turns kept per session (user and assistant turns count separately)
    pub max_turns: usize,
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_sessions: 10_000,
            idle_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub ip: WindowConfig,
    pub session: WindowConfig,
    pub max_keys: usize,
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip: WindowConfig {
                max_requests: 10,
                window_secs: 3600,
            },
            session: WindowConfig {
                max_requests: 10,
                window_secs: 60,
            },
            max_keys: 100_000,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonasConfig {
    pub a: PersonaConfig,
    pub b: PersonaConfig,
}

impl Default for PersonasConfig {
    fn default() -> Self {
        Self {
            a: PersonaConfig::from_file("Persona A", "prompts/persona-a.txt"),
            b: PersonaConfig::from_file("Persona B", "prompts/persona-b.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    /// Inline system prompt; wins over `prompt_file`
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub prompt_file: Option<String>,
}

impl PersonaConfig {
    pub fn inline(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: Some(prompt.into()),
            prompt_file: None,
        }
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: None,
            prompt_file: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. Built-in defaults
    /// 2. config/default.toml
    /// 3. config/{ENV}.toml (ENV defaults to `dev`)
    /// 4. `PERSONA_`-prefixed variables, `__` between levels
    ///    (e.g. `PERSONA_RATE_LIMIT__IP__MAX_REQUESTS=20`)
    /// 5. `PORT`, and the `OPENAI_API_KEY` secret
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PERSONA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.resolve_env(|key| std::env::var(key).ok())?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Apply secrets and plain-name overrides read through `lookup`
    pub fn resolve_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string())
            })?;

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("PORT is not a valid port: {}", port)))?;
        }

        Ok(())
    }
}
