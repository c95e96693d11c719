//! Init command implementation
//!
//! Scaffolds `elytra.toml`, `.env.example` and a `data/` directory.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    Success,
    /// elytra.toml found and `--force` not given
    AlreadyExists,
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    pub path: PathBuf,
    pub force: bool,
    /// `gemini` or `openai`
    pub provider: String,
    pub host: String,
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Elytra Project");

    let base_path = &config.path;
    let config_path = base_path.join("elytra.toml");
    if config_path.exists() && !config.force {
        output.warning("elytra.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else if let Err(e) = fs::create_dir_all(&data_dir) {
        output.error(&format!("Failed to create data: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("directory", "data");
    }

    let files = [
        ("config", "elytra.toml", generate_elytra_toml(&config)),
        ("env", ".env.example", generate_env_example(&config.provider)),
    ];
    for (kind, name, content) in files {
        match write_file(&base_path.join(name), &content, config.force) {
            Ok(true) => output.created(kind, name),
            Ok(false) => output.skipped(name, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", name, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    output.success("Elytra project initialized");
    output.header("Next Steps");
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.info("2. Set pinecone.index_host in elytra.toml");
    output.info("3. Start the server:");
    output.command("elytra-server");
    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

/// Returns whether the file was written.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_elytra_toml(config: &InitConfig) -> String {
    let llm_section = if config.provider == "openai" {
        r#"[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-4o-mini"
temperature = 0.7"#
    } else {
        r#"[llm]
type = "gemini"
api_key_env = "GEMINI_API_KEY"
model = "gemini-1.5-flash"
temperature = 0.7"#
    };

    format!(
        r#"# Elytra configuration
# Secrets are referenced by environment variable name, never stored here.

[server]
host = "{host}"
port = {port}
log_level = "info"
log_json = false
cors_origins = []

[auth]
jwt_secret_env = "JWT_SECRET"
jwt_access_expiry = 3600

[database]
url = "./data/elytra.db"
# turso_url_env = "TURSO_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"

{llm_section}

[embeddings]
api_key_env = "GEMINI_API_KEY"
model = "text-embedding-004"

[pinecone]
api_key_env = "PINECONE_API_KEY"
index_host = ""
# namespace = "programs"

[rag]
top_k = 5

[mail]
api_key_env = "MAIL_API_KEY"
api_url = "https://api.resend.com/emails"
from = "Elytra Counseling <counseling@elytra.app>"
"#,
        host = config.host,
        port = config.port,
        llm_section = llm_section,
    )
}

fn generate_env_example(provider: &str) -> String {
    let mut env = String::from(
        r#"# Elytra environment variables
# Copy this file to .env and fill in the values.

# Shared with the session provider that signs user tokens
JWT_SECRET=change-me-in-production-use-at-least-32-characters

# Embeddings (and Gemini completions)
GEMINI_API_KEY=

PINECONE_API_KEY=

# Meeting notifications
MAIL_API_KEY=

RUST_LOG=info,elytra=debug
"#,
    );
    if provider == "openai" {
        env.push_str("\nOPENAI_API_KEY=\n");
    }
    env.push_str("\n# TURSO_URL=libsql://your-db.turso.io\n# TURSO_AUTH_TOKEN=\n");
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::{ElytraConfig, LlmConfig};
    use tempfile::TempDir;

    fn init_config(temp_dir: &TempDir, force: bool, provider: &str) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force,
            provider: provider.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }

    #[test]
    fn test_generated_toml_parses() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let toml_text = generate_elytra_toml(&init_config(&temp_dir, false, "gemini"));
        let config: ElytraConfig = toml::from_str(&toml_text).expect("generated toml parses");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rag.top_k, 5);
        assert!(matches!(config.llm, LlmConfig::Gemini { .. }));
    }

    #[test]
    fn test_generated_toml_openai() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let toml_text = generate_elytra_toml(&init_config(&temp_dir, false, "openai"));
        let config: ElytraConfig = toml::from_str(&toml_text).expect("generated toml parses");

        match config.llm {
            LlmConfig::OpenAI { model, api_key_env, .. } => {
                assert_eq!(model, "gpt-4o-mini");
                assert_eq!(api_key_env, "OPENAI_API_KEY");
            }
            other => panic!("unexpected provider: {:?}", other),
        }
        assert!(generate_env_example("openai").contains("OPENAI_API_KEY="));
        assert!(!generate_env_example("gemini").contains("OPENAI_API_KEY="));
    }

    #[test]
    fn test_run_creates_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = run(init_config(&temp_dir, false, "gemini"), &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("elytra.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join("data").is_dir());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("elytra.toml"), "existing").expect("Failed to write");

        let result = run(init_config(&temp_dir, false, "gemini"), &Output::no_color());

        assert!(matches!(result, InitResult::AlreadyExists));
        let content = fs::read_to_string(temp_dir.path().join("elytra.toml")).unwrap();
        assert_eq!(content, "existing");
    }

    #[test]
    fn test_run_force_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("elytra.toml"), "existing").expect("Failed to write");

        let result = run(init_config(&temp_dir, true, "gemini"), &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        let content = fs::read_to_string(temp_dir.path().join("elytra.toml")).unwrap();
        assert!(content.contains("[pinecone]"));
        assert!(!content.contains("existing"));
    }

    #[test]
    fn test_write_file_skips_existing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("file.txt");

        assert!(write_file(&path, "first", false).unwrap());
        assert!(!write_file(&path, "second", false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }
}
