//! The `Executor` trait and its three implementations (spec §9's
//! "Polymorphic executor dispatch": avoid deep inheritance, model each
//! backend as a variant the manager holds behind a single interface).

pub mod go;
pub mod postgres;
pub mod typescript;

use std::time::Duration;

use async_trait::async_trait;

use crate::result::{ExecutionRequest, ExecutionResult, Language};

/// A component that maps source text in one language to an [`ExecutionResult`].
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs `request.code` against a request-scoped `deadline` already
    /// resolved by the manager (`min(request.timeout, default_timeout())`
    /// when `request.timeout` is non-zero, else `default_timeout()`).
    async fn execute(&self, request: &ExecutionRequest, deadline: Duration) -> ExecutionResult;

    /// The language this executor handles.
    fn language(&self) -> Language;

    /// The deadline used when the caller supplies `timeout == 0` (spec boundary B1).
    fn default_timeout(&self) -> Duration;

    /// Whether the executor can currently serve a request without actually
    /// running one (e.g. for a status query). Never consulted by the
    /// manager to gate `execute`: unavailability is reported by `execute`
    /// itself as a populated `ExecutionResult` (spec §7).
    async fn is_available(&self) -> bool;

    /// Releases any long-lived native resources (pool, isolate) so the
    /// executor can be safely dropped or recreated by `refresh`.
    async fn cleanup(&self);
}
