//! Implements the eight-operation command surface from spec §6, as thin,
//! serialization-free functions over a shared [`ExecutionManager`]. This is
//! the layer a desktop shell (or, for manual exercising, the
//! `playground_server` binary) calls directly.

use std::sync::Arc;

use codezone_core::executors::go;
use codezone_core::result::Language;
use codezone_core::{ExecutionManager, ExecutionRequest, ExecutionResult, PostgresConfig};
use tracing::{info, warn};

use crate::error::CommandError;

/// Owns the shared [`ExecutionManager`] and exposes the stable command
/// surface over it. Cheap to clone (an `Arc` underneath).
#[derive(Clone)]
pub struct Commands {
    manager: Arc<ExecutionManager>,
}

impl Commands {
    pub fn new() -> Self {
        Self {
            manager: Arc::new(ExecutionManager::new()),
        }
    }

    pub fn with_manager(manager: Arc<ExecutionManager>) -> Self {
        Self { manager }
    }

    /// `Execute` — runs one request to completion.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, CommandError> {
        Ok(self.manager.execute(request).await?)
    }

    /// `GetSupportedLanguages` — the registered language tags.
    pub async fn get_supported_languages(&self) -> Vec<String> {
        self.manager
            .supported_languages()
            .await
            .iter()
            .map(Language::to_string)
            .collect()
    }

    /// `RefreshExecutor` — destroys and recreates the named executor.
    pub async fn refresh_executor(&self, language_tag: &str) -> Result<(), CommandError> {
        let language = Language::from_tag(language_tag)
            .ok_or_else(|| CommandError::Core(codezone_core::CoreError::UnsupportedLanguage(language_tag.to_string())))?;
        self.manager.refresh(language).await?;
        info!(language = %language, "executor refreshed");
        Ok(())
    }

    /// `HandleConnection` — attempts to (re)build the Postgres pool against
    /// `cfg` and reports whether it succeeded, per spec §6's
    /// `(bool connected, error)` result shape.
    pub async fn handle_connection(&self, cfg: PostgresConfig) -> (bool, Option<String>) {
        let postgres = self.manager.postgres_executor().await;
        match postgres.create_pool(cfg).await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(error = %e, "postgres connection attempt failed");
                (false, Some(e))
            }
        }
    }

    /// `SetPostgreSQLConfig` — stores configuration without necessarily
    /// connecting yet; any existing pool is torn down so the next `Execute`
    /// rebuilds against the new parameters.
    pub async fn set_postgresql_config(&self, cfg: PostgresConfig) -> Result<(), CommandError> {
        if !cfg.is_available() {
            return Err(CommandError::InvalidPostgresConfig(
                "host, database, and username must all be non-empty".to_string(),
            ));
        }
        let postgres = self.manager.postgres_executor().await;
        postgres.set_config(cfg).await;
        Ok(())
    }

    /// `GetPostgreSQLConnectionStatus` — configured and pingable within 2s.
    pub async fn get_postgresql_connection_status(&self) -> bool {
        let postgres = self.manager.postgres_executor().await;
        postgres.is_connected().await
    }

    /// `DisconnectPostgreSQL` — closes and clears the pool.
    pub async fn disconnect_postgresql(&self) -> Result<(), CommandError> {
        let postgres = self.manager.postgres_executor().await;
        postgres.cleanup().await;
        Ok(())
    }

    /// `GetGoVersion` — a short human string, or a descriptive error string
    /// (not a Rust `Result` error, since this is a read-only status query).
    pub async fn get_go_version(&self) -> String {
        match go::go_version().await {
            Ok(version) => version,
            Err(message) => message,
        }
    }

    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_supported_languages_lists_three_tags() {
        let commands = Commands::new();
        let mut langs = commands.get_supported_languages().await;
        langs.sort();
        assert_eq!(langs, vec!["go", "postgres", "typescript"]);
    }

    #[tokio::test]
    async fn refresh_unknown_language_tag_is_a_command_error() {
        let commands = Commands::new();
        let result = commands.refresh_executor("ruby").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn connection_status_is_false_before_any_config_is_set() {
        let commands = Commands::new();
        assert!(!commands.get_postgresql_connection_status().await);
    }

    #[tokio::test]
    async fn empty_config_is_rejected_by_set_postgresql_config() {
        let commands = Commands::new();
        let cfg = PostgresConfig {
            host: String::new(),
            port: 5432,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_mode: codezone_core::result::SslMode::Prefer,
        };
        assert!(commands.set_postgresql_config(cfg).await.is_err());
    }
}
