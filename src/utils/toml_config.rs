//! TOML-based configuration for Elytra
//!
//! All infrastructure settings (server, auth, database, providers, mail) live
//! in a single `elytra.toml`. Secrets are never written into the file; each
//! section names the environment variable that holds them.
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `ElytraConfigManager` for thread-safe access to the current configuration.
//! Values read per request (top-K, system prompt, mail sender) pick up changes
//! immediately; provider clients are built once at startup.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from elytra.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElytraConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format
    #[serde(default)]
    pub log_json: bool,

    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
            cors_origins: Vec::new(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the JWT secret shared with the session provider
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Lifetime of operator-issued tokens, in seconds
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_expiry: i64,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_jwt_access_expiry() -> i64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            jwt_access_expiry: default_jwt_access_expiry(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/elytra.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Provider Configuration =============

/// Chat completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmConfig {
    Gemini {
        #[serde(default = "default_gemini_key_env")]
        api_key_env: String,
        #[serde(default = "default_gemini_base")]
        api_base: String,
        #[serde(default = "default_gemini_chat_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_chat_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::Gemini {
            api_key_env: default_gemini_key_env(),
            api_base: default_gemini_base(),
            model: default_gemini_chat_model(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn api_key_env(&self) -> &str {
        match self {
            LlmConfig::Gemini { api_key_env, .. } | LlmConfig::OpenAI { api_key_env, .. } => {
                api_key_env
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_gemini_base")]
    pub api_base: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            api_base: default_gemini_base(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default = "default_pinecone_key_env")]
    pub api_key_env: String,

    /// Data-plane host of the index, e.g. `https://program-recommendations-abc123.svc.pinecone.io`
    #[serde(default)]
    pub index_host: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_pinecone_api_version")]
    pub api_version: String,
}

fn default_pinecone_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

fn default_pinecone_api_version() -> String {
    "2024-07".to_string()
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_pinecone_key_env(),
            index_host: String::new(),
            namespace: None,
            api_version: default_pinecone_api_version(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Number of nearest programs pulled from the index per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_top_k() -> usize {
    5
}

fn default_system_prompt() -> String {
    "You are Elytra, a study-abroad counselor. Recommend academic programs using only \
     the program details provided. Compare eligibility against the student's background \
     when it is known, be concise, and say so when none of the programs fit."
        .to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            system_prompt: default_system_prompt(),
        }
    }
}

// ============= Mail Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_mail_api_url")]
    pub api_url: String,

    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_mail_key_env() -> String {
    "MAIL_API_KEY".to_string()
}

fn default_mail_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_mail_from() -> String {
    "Elytra Counseling <counseling@elytra.app>".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_mail_key_env(),
            api_url: default_mail_api_url(),
            from: default_mail_from(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl Default for ElytraConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            pinecone: PineconeConfig::default(),
            rag: RagConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl ElytraConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without checking env vars or values
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate values and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_env_var(&self.auth.jwt_secret_env)?;
        self.validate_env_var(self.llm.api_key_env())?;
        self.validate_env_var(&self.embeddings.api_key_env)?;
        self.validate_env_var(&self.pinecone.api_key_env)?;

        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        if self.pinecone.index_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pinecone.index_host must be set".to_string(),
            ));
        }

        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be at least 1".to_string(),
            ));
        }

        if self.auth.jwt_access_expiry <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.jwt_access_expiry must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings that are optional at startup but disable a feature when missing
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.resolve_env(&self.mail.api_key_env).is_none() {
            warnings.push(format!(
                "{} is not set; meeting notifications will fail",
                self.mail.api_key_env
            ));
        }
        warnings
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Get the JWT secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.auth.jwt_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }

    /// Resolve a required secret by env var name
    pub fn secret(&self, env_name: &str) -> Result<String, ConfigError> {
        self.resolve_env(env_name)
            .ok_or_else(|| ConfigError::MissingEnvVar(env_name.to_string()))
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct ElytraConfigManager {
    config: Arc<ArcSwap<ElytraConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl ElytraConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = ElytraConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing).
    /// This won't have file watching capabilities.
    pub fn from_config(config: ElytraConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("elytra.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<ElytraConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = ElytraConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Editors often replace the file, so watch the parent directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let debounce_duration = Duration::from_millis(500);
            let mut last_reload = std::time::Instant::now()
                .checked_sub(debounce_duration)
                .unwrap_or_else(std::time::Instant::now);

            while rx.recv().await.is_some() {
                if last_reload.elapsed() < debounce_duration {
                    continue;
                }

                // Let the writer finish
                tokio::time::sleep(Duration::from_millis(100)).await;

                match ElytraConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = std::time::Instant::now();
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_test_env() {
        std::env::set_var("ELYTRA_TEST_JWT_SECRET", "test-secret-at-least-32-characters-long");
        std::env::set_var("ELYTRA_TEST_GEMINI_KEY", "gemini-key");
        std::env::set_var("ELYTRA_TEST_PINECONE_KEY", "pinecone-key");
    }

    fn create_test_config() -> String {
        r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"

[auth]
jwt_secret_env = "ELYTRA_TEST_JWT_SECRET"

[database]
url = ":memory:"

[llm]
type = "gemini"
api_key_env = "ELYTRA_TEST_GEMINI_KEY"
model = "gemini-1.5-flash"

[embeddings]
api_key_env = "ELYTRA_TEST_GEMINI_KEY"

[pinecone]
api_key_env = "ELYTRA_TEST_PINECONE_KEY"
index_host = "https://program-recommendations.svc.pinecone.io"

[rag]
top_k = 3
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        set_test_env();

        let config: ElytraConfig =
            toml::from_str(&create_test_config()).expect("Failed to parse config");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.embeddings.model, "text-embedding-004");
        assert!(matches!(config.llm, LlmConfig::Gemini { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: ElytraConfig = toml::from_str("").expect("empty config should parse");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.database.url, "./data/elytra.db");
        assert_eq!(config.pinecone.api_version, "2024-07");
    }

    #[test]
    fn test_openai_provider_section() {
        let content = r#"
[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
"#;
        let config: ElytraConfig = toml::from_str(content).unwrap();

        match config.llm {
            LlmConfig::OpenAI {
                api_base, model, ..
            } => {
                assert_eq!(api_base, "https://api.openai.com/v1");
                assert_eq!(model, "gpt-4o-mini");
            }
            other => panic!("expected openai provider, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_missing_env_var() {
        let content = r#"
[auth]
jwt_secret_env = "ELYTRA_TEST_SECRET_THAT_IS_NEVER_SET"
"#;
        let config: ElytraConfig = toml::from_str(content).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(name)) if name == "ELYTRA_TEST_SECRET_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn test_validation_rejects_zero_top_k() {
        set_test_env();
        let content = create_test_config().replace("top_k = 3", "top_k = 0");
        let config: ElytraConfig = toml::from_str(&content).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ElytraConfig::load("/definitely/not/here/elytra.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_manager_reload_picks_up_changes() {
        set_test_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elytra.toml");
        fs::write(&path, create_test_config()).unwrap();

        let manager = ElytraConfigManager::new(&path).expect("config should load");
        assert_eq!(manager.config().rag.top_k, 3);

        fs::write(&path, create_test_config().replace("top_k = 3", "top_k = 7")).unwrap();
        manager.reload().expect("reload should succeed");

        assert_eq!(manager.config().rag.top_k, 7);
    }
}
