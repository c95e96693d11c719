//! Relational database selection
//!
//! ```rust,ignore
//! use elytra::db::DatabaseProvider;
//!
//! let db = DatabaseProvider::Memory.create_client().await?;
//! let db = DatabaseProvider::SQLite { path: "data.db".into() }.create_client().await?;
//! ```

use super::turso::TursoClient;
use crate::types::Result;
use crate::utils::toml_config::ElytraConfig;

/// Where student and program records live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// Ephemeral, lost on restart
    #[default]
    Memory,
    /// File-based SQLite
    SQLite { path: String },
    /// Remote Turso database
    #[cfg(feature = "turso")]
    Turso { url: String, auth_token: String },
}

impl DatabaseProvider {
    pub async fn create_client(&self) -> Result<TursoClient> {
        match self {
            DatabaseProvider::Memory => TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => TursoClient::new_local(path).await,
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                TursoClient::new_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Remote Turso when both its env vars resolve, otherwise the local `url`.
    pub fn from_config(config: &ElytraConfig) -> Self {
        #[cfg(feature = "turso")]
        {
            let db = &config.database;
            let url = db
                .turso_url_env
                .as_deref()
                .and_then(|name| config.resolve_env(name));
            let token = db
                .turso_token_env
                .as_deref()
                .and_then(|name| config.resolve_env(name));
            if let (Some(url), Some(auth_token)) = (url, token) {
                if !url.is_empty() && !auth_token.is_empty() {
                    return DatabaseProvider::Turso { url, auth_token };
                }
            }
        }

        let path = config.database.url.trim();
        if path.is_empty() || path == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: path.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_url_selects_memory() {
        let mut config = ElytraConfig::default();
        config.database.url = ":memory:".to_string();
        assert_eq!(DatabaseProvider::from_config(&config), DatabaseProvider::Memory);
    }

    #[test]
    fn test_file_url_selects_sqlite() {
        let mut config = ElytraConfig::default();
        config.database.url = "./data/test.db".to_string();
        assert_eq!(
            DatabaseProvider::from_config(&config),
            DatabaseProvider::SQLite {
                path: "./data/test.db".to_string()
            }
        );
    }
}
