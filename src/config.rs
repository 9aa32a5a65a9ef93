use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Directory holding `*.recipe.json` files and `images/`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the OpenAI chat-completions provider
#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    /// API key (falls back to the OPENAI_API_KEY environment variable)
    pub api_key: Option<String>,
    /// Base URL for the API endpoint (for proxies or compatible servers)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier (e.g., "gpt-4o")
    #[serde(default = "default_model")]
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout: u64,
}

/// Import pipeline settings
#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Run the cleanup pass before structured extraction
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
    /// Page fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    /// Image download timeout in seconds
    #[serde(default = "default_image_timeout")]
    pub image_timeout: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
            openai: OpenAiConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_llm_timeout(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            cleanup: default_cleanup(),
            fetch_timeout: default_fetch_timeout(),
            image_timeout: default_image_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl OpenAiConfig {
    /// The configured key, or OPENAI_API_KEY from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl ImportConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_cleanup() -> bool {
    true
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_image_timeout() -> u64 {
    30
}

impl CatalogConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPES__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPES__OPENAI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from `config.toml` (optional) and the environment.
pub fn load_config() -> Result<CatalogConfig, ConfigError> {
    build(File::with_name("config").required(false))
}

/// Load configuration from an explicit file, still honouring the environment.
pub fn load_config_from(path: &Path) -> Result<CatalogConfig, ConfigError> {
    build(File::from(path).required(true))
}

fn build<S>(file: S) -> Result<CatalogConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = Config::builder()
        .add_source(file)
        // Use double underscore for nested: RECIPES__SERVER__PORT
        .add_source(
            Environment::with_prefix("RECIPES")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = CatalogConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.openai.base_url, "https://api.openai.com");
        assert_eq!(config.openai.temperature, 0.7);
        assert_eq!(config.openai.timeout(), Duration::from_secs(300));
        assert!(config.import.cleanup);
        assert_eq!(config.import.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.import.image_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/srv/recipes"

[server]
port = 3001

[openai]
model = "gpt-4o-mini"
api_key = "sk-test"

[import]
cleanup = false
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/recipes"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.resolved_api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.openai.max_tokens, 4096);
        assert!(!config.import.cleanup);
        assert_eq!(config.import.fetch_timeout, 10);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(&dir.path().join("absent.toml")).is_err());
    }
}
