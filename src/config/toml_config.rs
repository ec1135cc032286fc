use crate::utils::error::{Result, TriageError};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub fallback_path: Option<String>,
    /// Load the artifact at startup instead of on the first ticket.
    pub preload: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "ticket_classifier.json".to_string(),
            fallback_path: None,
            preload: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Supabase,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub key: Option<String>,
    pub timeout_seconds: u64,
}

// the key never reaches logs
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            key: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl TriageConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TriageError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TriageError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Defaults plus the environment variables the hosted deployment sets.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("TRIAGE_MODEL_PATH") {
            config.model.path = path;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }

        let url = std::env::var("SUPABASE_URL").ok();
        let key = std::env::var("SUPABASE_ANON_KEY").ok();
        if url.is_some() && key.is_some() {
            config.store.backend = StoreBackend::Supabase;
            config.store.url = url;
            config.store.key = key;
        }

        config
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TriageError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_positive_number("server.port", u64::from(self.server.port), 1)?;
        for origin in &self.server.cors_origins {
            if origin != "*" {
                validate_url("server.cors_origins", origin)?;
            }
        }

        validate_path("model.path", &self.model.path)?;
        if let Some(fallback) = &self.model.fallback_path {
            validate_path("model.fallback_path", fallback)?;
        }

        if self.store.backend == StoreBackend::Supabase {
            let url = self
                .store
                .url
                .as_deref()
                .ok_or_else(|| TriageError::MissingConfigError {
                    field: "store.url".to_string(),
                })?;
            validate_url("store.url", url)?;

            let key = self
                .store
                .key
                .as_deref()
                .ok_or_else(|| TriageError::MissingConfigError {
                    field: "store.key".to_string(),
                })?;
            validate_non_empty_string("store.key", key)?;
            if key.starts_with("${") {
                // substitution left the placeholder in place
                return Err(TriageError::MissingConfigError {
                    field: format!("store.key (environment variable {})", key),
                });
            }
            validate_positive_number("store.timeout_seconds", self.store.timeout_seconds, 1)?;
        }

        validate_one_of(
            "logging.level",
            &self.logging.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
        )?;
        Ok(())
    }
}

impl Validate for TriageConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
