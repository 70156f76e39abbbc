//! Crate-wide error types.
//!
//! Each subsystem gets its own `thiserror`-derived enum; this module holds
//! the one error type that crosses subsystem boundaries — the error a
//! caller of [`crate::manager::ExecutionManager`] can see on the *command*
//! itself, as opposed to inside a populated `ExecutionResult`.
//!
//! Almost every failure mode (timeouts,
//! compile errors, SQL errors, missing toolchains) is reported as a
//! populated [`crate::result::ExecutionResult`], never as an `Err` here.
//! `CoreError` exists only for the programmer-error case: an unknown
//! language tag, or an attempt to refresh a language that was never
//! registered.

use thiserror::Error;

/// Errors surfaced on the command itself rather than folded into a result.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller asked for a language tag the manager has no executor for.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The target executor is currently handling another request.
    #[error("executor for {0} is busy")]
    Busy(String),
}
