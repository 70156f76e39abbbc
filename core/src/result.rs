//! The shared data contract between the execution core and its callers
//! (component C5, plus the request/config types referenced throughout §3).

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::duration::format_duration;

/// The closed set of languages the core can execute.
///
/// `javascript` is accepted on the wire as a legacy alias of `typescript`
/// (spec §3) but never produced by the core itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// TypeScript, transpiled then evaluated. Also accepts plain JavaScript.
    TypeScript,
    /// Go, compiled and run via the host toolchain.
    Go,
    /// PostgreSQL, executed against a pooled connection.
    Postgres,
}

impl Language {
    /// Parses a wire tag, treating `"javascript"` as an alias of `typescript`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "typescript" | "javascript" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "postgres" | "postgresql" => Some(Language::Postgres),
            _ => None,
        }
    }

    /// The canonical wire tag this language is echoed back as.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A request to execute a snippet, as received from a caller (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The UTF-8 source snippet.
    pub code: String,
    /// Which executor should run it.
    pub language: Language,
    /// Non-negative; zero means "use the executor's default".
    #[serde(default)]
    pub timeout: Duration,
    /// Optional stdin for the Go executor; ignored by TS/JS and Postgres.
    #[serde(default)]
    pub input: Option<String>,
    /// When present for a Postgres request, overrides the executor's
    /// currently bound configuration for the duration of this call.
    #[serde(default)]
    pub postgresql_conn: Option<PostgresConfig>,
}

impl ExecutionRequest {
    /// Convenience constructor for the common case of no timeout override,
    /// no stdin, and no ad-hoc Postgres config.
    pub fn new(code: impl Into<String>, language: Language) -> Self {
        Self {
            code: code.into(),
            language,
            timeout: Duration::ZERO,
            input: None,
            postgresql_conn: None,
        }
    }
}

/// Result returned to the caller for every request (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Primary textual output.
    pub output: String,
    /// Diagnostic text; empty on success save for the reserved availability codes.
    pub error: String,
    /// 0 on success; see [`crate::exit_codes`] for the reserved non-zero values.
    pub exit_code: i32,
    /// Measured wall time.
    pub duration: Duration,
    /// Size-adaptive rendering of `duration`, always a pure function of it.
    pub duration_string: String,
    /// Echoed request language.
    pub language: Language,
    /// Present only for Postgres requests that produced a structured payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_result: Option<SqlResult>,
}

impl ExecutionResult {
    /// Builds the empty-success result for spec invariant P5: an empty
    /// request never invokes a backend.
    pub fn empty(language: Language) -> Self {
        Self {
            output: String::new(),
            error: String::new(),
            exit_code: crate::exit_codes::SUCCESS,
            duration: Duration::ZERO,
            duration_string: format_duration(Duration::ZERO),
            language,
            sql_result: None,
        }
    }

    /// A successful result with the given output and duration.
    pub fn success(language: Language, output: String, elapsed: Duration) -> Self {
        Self {
            output,
            error: String::new(),
            exit_code: crate::exit_codes::SUCCESS,
            duration: elapsed,
            duration_string: format_duration(elapsed),
            language,
            sql_result: None,
        }
    }

    /// A failed result with the given diagnostic and exit code.
    pub fn failure(language: Language, error: String, exit_code: i32, elapsed: Duration) -> Self {
        debug_assert_ne!(exit_code, crate::exit_codes::SUCCESS);
        Self {
            output: String::new(),
            error,
            exit_code,
            duration: elapsed,
            duration_string: format_duration(elapsed),
            language,
            sql_result: None,
        }
    }

    /// Attaches a structured SQL payload; only meaningful for `Language::Postgres`.
    pub fn with_sql_result(mut self, sql_result: SqlResult) -> Self {
        self.sql_result = Some(sql_result);
        self
    }

    /// Stamps `duration`/`duration_string` together from a start [`Instant`]
    /// so the two fields can never drift apart (spec invariant on §3/§4.5).
    pub fn stamp(mut self, started_at: Instant) -> Self {
        let elapsed = started_at.elapsed();
        self.duration = elapsed;
        self.duration_string = format_duration(elapsed);
        self
    }
}

/// Leading-keyword classification of a cleaned SQL statement (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    With,
    Other,
}

impl QueryType {
    /// `SELECT` and `WITH` return rows; everything else returns a command tag.
    pub fn is_row_producing(&self) -> bool {
        matches!(self, QueryType::Select | QueryType::With)
    }

    /// Classifies a (already-cleaned) SQL statement by its leading keyword.
    pub fn classify(cleaned_sql: &str) -> Self {
        let first_word = cleaned_sql
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        match first_word.as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            "CREATE" => QueryType::Create,
            "DROP" => QueryType::Drop,
            "ALTER" => QueryType::Alter,
            "WITH" => QueryType::With,
            _ => QueryType::Other,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Update => "UPDATE",
            QueryType::Delete => "DELETE",
            QueryType::Create => "CREATE",
            QueryType::Drop => "DROP",
            QueryType::Alter => "ALTER",
            QueryType::With => "WITH",
            QueryType::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// The structured SQL payload carried by a Postgres [`ExecutionResult`] (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlResult {
    pub query_type: QueryType,
    /// Ordered column names; insertion order is significant.
    pub columns: Vec<String>,
    /// Ordered rows; each row's length equals `columns.len()` for row-producing statements.
    pub rows: Vec<Vec<serde_json::Value>>,
    /// For row-producing statements this equals `rows.len()`; otherwise the server's reported count.
    pub rows_affected: u64,
    /// Server-side wall time of the query alone, distinct from the outer `duration`.
    pub execution_time: Duration,
}

/// PostgreSQL connection configuration (spec §3).
///
/// Pool identity is the tuple `(host, port, database, username, ssl_mode)`;
/// [`PostgresConfig::pool_identity`] exposes it for the executor's
/// tear-down-on-change logic.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: SslMode,
}

fn default_ssl_mode() -> SslMode {
    SslMode::Prefer
}

/// TLS negotiation policy for a Postgres connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
}

impl PostgresConfig {
    /// `true` when host, database, and username are all non-empty (spec §4.4 `isAvailable`).
    pub fn is_available(&self) -> bool {
        !self.host.is_empty() && !self.database.is_empty() && !self.username.is_empty()
    }

    /// The tuple that determines whether two configs address the same pool.
    pub fn pool_identity(&self) -> (String, u16, String, String, SslMode) {
        (
            self.host.clone(),
            self.port,
            self.database.clone(),
            self.username.clone(),
            self.ssl_mode,
        )
    }
}

impl fmt::Debug for PostgresConfig {
    /// Redacts `password` so a stray `{:?}` in a log line never leaks a secret.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_is_an_alias_of_typescript() {
        assert_eq!(Language::from_tag("javascript"), Some(Language::TypeScript));
        assert_eq!(Language::from_tag("typescript"), Some(Language::TypeScript));
        assert_eq!(Language::from_tag("TypeScript"), Some(Language::TypeScript));
    }

    #[test]
    fn unknown_language_tag_is_rejected() {
        assert_eq!(Language::from_tag("ruby"), None);
    }

    #[test]
    fn empty_request_result_has_no_error_and_no_sql_result() {
        let result = ExecutionResult::empty(Language::TypeScript);
        assert_eq!(result.output, "");
        assert!(result.sql_result.is_none());
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn query_classification_is_case_insensitive_on_leading_keyword() {
        assert_eq!(QueryType::classify("select 1"), QueryType::Select);
        assert_eq!(QueryType::classify("  SELECT 1"), QueryType::Select);
        assert_eq!(QueryType::classify("with x as (select 1) select * from x"), QueryType::With);
        assert_eq!(QueryType::classify("vacuum full"), QueryType::Other);
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let cfg = PostgresConfig {
            host: "localhost".into(),
            port: 5432,
            database: "db".into(),
            username: "user".into(),
            password: "hunter2".into(),
            ssl_mode: SslMode::Prefer,
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn pool_identity_ignores_password() {
        let mut a = PostgresConfig {
            host: "localhost".into(),
            port: 5432,
            database: "db".into(),
            username: "user".into(),
            password: "a".into(),
            ssl_mode: SslMode::Prefer,
        };
        let mut b = a.clone();
        b.password = "different".into();
        assert_eq!(a.pool_identity(), b.pool_identity());
        a.port = 5433;
        assert_ne!(a.pool_identity(), b.pool_identity());
    }
}
