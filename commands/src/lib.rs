//! # CodeZone Commands
//!
//! The thin command surface a desktop shell drives (spec §6): `Execute`,
//! `GetSupportedLanguages`, `RefreshExecutor`, and the PostgreSQL
//! connection-lifecycle operations, all implemented over a shared
//! `codezone_core::ExecutionManager`. Also hosts `playground_server`, a
//! dev-only `axum` HTTP harness over the same surface (see `src/bin`).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod commands;
pub mod error;
pub mod logging;

pub use commands::Commands;
pub use error::CommandError;
