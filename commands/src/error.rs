//! Errors surfaced on the command boundary itself, as opposed to folded into
//! a populated `ExecutionResult` (spec §7: "only programmer errors surface
//! as an error on the command itself").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Core(#[from] codezone_core::CoreError),

    #[error("postgres configuration rejected: {0}")]
    InvalidPostgresConfig(String),
}
