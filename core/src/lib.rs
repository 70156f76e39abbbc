//! # CodeZone Execution Core
//!
//! This crate is the execution subsystem of the CodeZone playground: given a
//! source snippet and a language tag, it evaluates the snippet in an
//! isolated, resource-bounded environment and returns a structured
//! [`result::ExecutionResult`]. Three languages are supported — TypeScript
//! (and its legacy alias, plain JavaScript), Go, and PostgreSQL — each with
//! its own [`executors::Executor`] implementation behind a common
//! [`manager::ExecutionManager`].
//!
//! The crate performs no UI, storage, or windowing work of its own; it is
//! meant to be driven by a thin command surface (see the sibling
//! `codezone_commands` crate) from a desktop shell.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Shared result/request schema and the duration formatter (component C5).
pub mod result;
/// Size-adaptive duration formatting, kept separate so it stays trivially testable.
pub mod duration;
/// Crate-wide error types.
pub mod error;
/// The `Executor` trait and the three language executors (C2, C3, C4).
pub mod executors;
/// The execution manager that owns and routes to the executors (C1).
pub mod manager;
/// Shared subprocess-spawning primitive used by the Go and external-JS paths.
pub mod subprocess;

pub use error::CoreError;
pub use executors::Executor;
pub use manager::ExecutionManager;
pub use result::{ExecutionRequest, ExecutionResult, Language, PostgresConfig, QueryType, SqlResult};

/// Reserved exit codes forming part of the stable command-surface contract.
///
/// These values must never be reassigned; callers (notably the desktop UI)
/// branch on them directly.
pub mod exit_codes {
    /// Success.
    pub const SUCCESS: i32 = 0;
    /// Generic runtime or compile failure.
    pub const GENERIC_FAILURE: i32 = 1;
    /// TypeScript transpile failure.
    pub const TRANSPILE_FAILURE: i32 = 2;
    /// Execution or query timeout.
    pub const TIMEOUT: i32 = 124;
    /// Go toolchain not installed.
    pub const GO_TOOLCHAIN_MISSING: i32 = 150;
    /// Postgres executor not configured.
    pub const POSTGRES_NOT_CONFIGURED: i32 = 151;
    /// Postgres connection/pool creation failed.
    pub const POSTGRES_CONNECTION_FAILED: i32 = 152;
    /// Postgres query error, or an empty query after cleaning.
    pub const POSTGRES_QUERY_ERROR: i32 = 153;
    /// No external JavaScript runtime available after the sandbox fallback fired.
    pub const JS_RUNTIME_UNAVAILABLE: i32 = 160;
}
