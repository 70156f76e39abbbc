//! The execution manager (component C1): a registry keyed by [`Language`]
//! that dispatches `execute` to the right backend, resolves the per-request
//! deadline, and enforces the soft "busy" concurrency signal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::executors::go::GoExecutor;
use crate::executors::postgres::PostgresExecutor;
use crate::executors::typescript::TypeScriptExecutor;
use crate::executors::Executor;
use crate::result::{ExecutionRequest, ExecutionResult, Language};

/// One entry per registered language: the executor itself plus the mutex
/// that makes "a given executor serves one call at a time" hold (spec §5).
struct Slot {
    executor: Arc<dyn Executor>,
    lock: Mutex<()>,
}

pub struct ExecutionManager {
    slots: RwLock<HashMap<Language, Slot>>,
    /// A concretely-typed handle to the same executor the Postgres slot
    /// holds as `Arc<dyn Executor>`, so the command layer can reach
    /// `set_config`/`is_connected` without a trait-object downcast.
    postgres: RwLock<Arc<PostgresExecutor>>,
    /// Registration order, kept so `shutdown` can call `cleanup` in reverse.
    registration_order: Vec<Language>,
}

impl ExecutionManager {
    /// Builds the manager with the three stock executors registered in the
    /// order TypeScript, Go, Postgres.
    pub fn new() -> Self {
        let mut slots = HashMap::new();
        slots.insert(
            Language::TypeScript,
            Slot {
                executor: Arc::new(TypeScriptExecutor::new()),
                lock: Mutex::new(()),
            },
        );
        slots.insert(
            Language::Go,
            Slot {
                executor: Arc::new(GoExecutor::new()),
                lock: Mutex::new(()),
            },
        );
        let postgres = Arc::new(PostgresExecutor::new());
        slots.insert(
            Language::Postgres,
            Slot {
                executor: postgres.clone(),
                lock: Mutex::new(()),
            },
        );

        Self {
            slots: RwLock::new(slots),
            postgres: RwLock::new(postgres),
            registration_order: vec![Language::TypeScript, Language::Go, Language::Postgres],
        }
    }

    /// The registered language tags (spec §4.1 `supportedLanguages`).
    pub async fn supported_languages(&self) -> Vec<Language> {
        self.slots.read().await.keys().copied().collect()
    }

    /// Returns the Postgres executor for callers (the command layer) that
    /// need its configuration-specific operations beyond the `Executor` trait.
    pub async fn postgres_executor(&self) -> Arc<PostgresExecutor> {
        self.postgres.read().await.clone()
    }

    /// Dispatches `request` to its language's executor, honoring the
    /// deadline-resolution rule from spec §4.1 and the busy signal from §5.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, CoreError> {
        let slots = self.slots.read().await;
        let slot = slots
            .get(&request.language)
            .ok_or_else(|| CoreError::UnsupportedLanguage(request.language.to_string()))?;

        let guard = match slot.lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Err(CoreError::Busy(request.language.to_string())),
        };

        // Availability (missing toolchain, unconfigured pool, ...) is not
        // checked here: each executor's own `execute` reports it as a
        // populated `ExecutionResult` (exit codes 150/151/160), never as a
        // command-level error (spec §7's propagation policy).
        let deadline = resolve_deadline(request.timeout, slot.executor.default_timeout());
        let result = slot.executor.execute(&request, deadline).await;
        drop(guard);
        Ok(result)
    }

    /// Destroys and recreates the named executor, clearing transient state
    /// such as a stale Postgres pool (spec §4.1 `refresh`).
    pub async fn refresh(&self, language: Language) -> Result<(), CoreError> {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(&language) {
            slot.executor.cleanup().await;
        }

        let fresh: Arc<dyn Executor> = if language == Language::Postgres {
            let fresh_postgres = Arc::new(PostgresExecutor::new());
            *self.postgres.write().await = fresh_postgres.clone();
            fresh_postgres
        } else {
            match language {
                Language::TypeScript => Arc::new(TypeScriptExecutor::new()),
                Language::Go => Arc::new(GoExecutor::new()),
                Language::Postgres => unreachable!("handled above"),
            }
        };

        slots.insert(
            language,
            Slot {
                executor: fresh,
                lock: Mutex::new(()),
            },
        );
        Ok(())
    }

    /// Invokes `cleanup` on every executor in reverse registration order
    /// (spec §4.1 `shutdown`).
    pub async fn shutdown(&self) {
        let slots = self.slots.read().await;
        for language in self.registration_order.iter().rev() {
            if let Some(slot) = slots.get(language) {
                slot.executor.cleanup().await;
            }
        }
    }
}

impl Default for ExecutionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `min(request.timeout, executor_default)` when `request.timeout` is
/// non-zero, else `executor_default` (spec §4.1, boundary B1).
fn resolve_deadline(requested: Duration, executor_default: Duration) -> Duration {
    if requested.is_zero() {
        executor_default
    } else {
        requested.min(executor_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_resolves_to_executor_default() {
        let resolved = resolve_deadline(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(resolved, Duration::from_secs(10));
    }

    #[test]
    fn nonzero_timeout_is_capped_by_executor_default() {
        let resolved = resolve_deadline(Duration::from_secs(999), Duration::from_secs(10));
        assert_eq!(resolved, Duration::from_secs(10));
    }

    #[test]
    fn nonzero_timeout_under_the_default_passes_through() {
        let resolved = resolve_deadline(Duration::from_secs(2), Duration::from_secs(10));
        assert_eq!(resolved, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn supported_languages_lists_all_three_stock_executors() {
        let manager = ExecutionManager::new();
        let mut langs = manager.supported_languages().await;
        langs.sort_by_key(Language::to_string);
        assert_eq!(langs.len(), 3);
    }

    #[tokio::test]
    async fn empty_code_never_reaches_an_executor_and_still_succeeds() {
        let manager = ExecutionManager::new();
        let request = ExecutionRequest::new("", Language::TypeScript);
        let result = manager.execute(request).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn unknown_language_is_a_command_level_error() {
        // `Language` is a closed enum so this can only be exercised through
        // `Language::from_tag` rejecting an unknown tag upstream; verified
        // directly against that parser rather than forcing an invalid enum
        // value through the manager.
        assert_eq!(Language::from_tag("ruby"), None);
    }
}
