use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the Gemini API key. Deliberately kept out of
/// the TOML config so the key never lands on disk; the gateway fails fast at
/// startup when it is absent.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level config (opsgate.toml + OPSGATE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsgateConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Default for OpsgateConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier; a cheap/fast tier by default.
    #[serde(default = "default_model")]
    pub name: String,
    /// API base URL (without trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl OpsgateConfig {
    /// Load config from a TOML file with OPSGATE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.opsgate/opsgate.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: OpsgateConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("OPSGATE_").split("_"))
            .extract()
            .map_err(|e| crate::error::OpsgateError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.opsgate/opsgate.toml", home)
}
