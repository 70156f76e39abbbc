//! The Go executor (component C3, spec §4.3): synthesize a complete program
//! from the submitted snippet, compile-and-run it with the host toolchain in
//! a scratch workspace, and report the toolchain version on demand.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tempfile::TempDir;

use crate::exit_codes;
use crate::result::{ExecutionRequest, ExecutionResult, Language};
use crate::subprocess::{run_captured, run_captured_with_deadline};

use super::Executor;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const INSTALL_HINT: &str = "Go toolchain not found on PATH. Install it from https://go.dev/dl/ and ensure `go` is on PATH.";

pub struct GoExecutor {
    toolchain_path: OnceCell<Option<std::path::PathBuf>>,
}

impl GoExecutor {
    pub fn new() -> Self {
        Self {
            toolchain_path: OnceCell::new(),
        }
    }

    fn toolchain(&self) -> Option<&std::path::Path> {
        self.toolchain_path
            .get_or_init(|| which::which("go").ok())
            .as_deref()
    }

    /// Builds a complete `package main` program from a submitted snippet
    /// (spec §4.3's three synthesis rules, tried in order).
    fn synthesize_program(snippet: &str) -> String {
        let trimmed = snippet.trim_start();

        if trimmed.starts_with("package ") {
            return snippet.to_string();
        }

        if trimmed.contains("func main(") {
            return format!("package main\n\n{snippet}");
        }

        let indented: String = snippet
            .lines()
            .map(|line| {
                if line.is_empty() {
                    line.to_string()
                } else {
                    format!("\t{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("package main\n\nimport \"fmt\"\n\nfunc main() {{\n{indented}\n}}\n")
    }

    /// Strips the scratch directory's absolute path out of compiler/runtime
    /// output so a temp path never leaks to the caller (spec §4.3).
    fn sanitize(text: &str, workspace: &TempDir) -> String {
        let prefix = format!("{}/", workspace.path().display());
        text.replace(&prefix, "")
    }
}

impl Default for GoExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for GoExecutor {
    async fn execute(&self, request: &ExecutionRequest, deadline: Duration) -> ExecutionResult {
        if request.code.is_empty() {
            return ExecutionResult::empty(Language::Go);
        }

        let Some(go_path) = self.toolchain() else {
            return ExecutionResult::failure(
                Language::Go,
                INSTALL_HINT.to_string(),
                exit_codes::GO_TOOLCHAIN_MISSING,
                Duration::ZERO,
            );
        };

        let workspace = match tempfile::Builder::new().prefix("codezone-go-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionResult::failure(
                    Language::Go,
                    format!("Failed to create scratch workspace: {e}"),
                    exit_codes::GENERIC_FAILURE,
                    Duration::ZERO,
                )
            }
        };

        let program = Self::synthesize_program(&request.code);
        let main_path = workspace.path().join("main.go");
        if let Err(e) = std::fs::write(&main_path, program) {
            return ExecutionResult::failure(
                Language::Go,
                format!("Failed to write main.go: {e}"),
                exit_codes::GENERIC_FAILURE,
                Duration::ZERO,
            );
        }

        let started = Instant::now();
        let go_str = go_path.to_string_lossy().into_owned();
        let run = run_captured_with_deadline(
            &go_str,
            &["run", "main.go"],
            workspace.path(),
            request.input.as_deref(),
            deadline,
        )
        .await;

        // `workspace` is removed when it drops at the end of this function,
        // on every exit path: success, failure, or timeout.
        match run {
            Ok(Some(captured)) if captured.status_code == Some(0) => {
                ExecutionResult::success(Language::Go, captured.stdout, started.elapsed())
            }
            Ok(Some(captured)) => ExecutionResult::failure(
                Language::Go,
                Self::sanitize(&captured.stderr, &workspace),
                captured.status_code.unwrap_or(exit_codes::GENERIC_FAILURE),
                started.elapsed(),
            ),
            Ok(None) => ExecutionResult::failure(
                Language::Go,
                "Execution timed out".to_string(),
                exit_codes::TIMEOUT,
                started.elapsed(),
            ),
            Err(e) => ExecutionResult::failure(
                Language::Go,
                format!("Failed to launch go toolchain: {e}"),
                exit_codes::GENERIC_FAILURE,
                started.elapsed(),
            ),
        }
    }

    fn language(&self) -> Language {
        Language::Go
    }

    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    async fn is_available(&self) -> bool {
        self.toolchain().is_some()
    }

    async fn cleanup(&self) {
        // The toolchain path is a `which` result, not a held resource; there
        // is nothing to release between requests.
    }
}

/// Runs `go version` and reformats it into the `go vX.Y.Z` shape the C6
/// command surface reports (spec §6, `GetGoVersion`).
pub async fn go_version() -> Result<String, String> {
    let Some(go_path) = which::which("go").ok() else {
        return Err(INSTALL_HINT.to_string());
    };
    let go_str = go_path.to_string_lossy().into_owned();
    let cwd = std::env::temp_dir();
    let captured = run_captured(&go_str, &["version"], &cwd, None)
        .await
        .map_err(|e| format!("Failed to run go version: {e}"))?;

    if captured.status_code != Some(0) {
        return Err(format!("go version exited with {:?}", captured.status_code));
    }

    // `go version go1.22.4 linux/amd64` -> `go v1.22.4`
    let raw = captured.stdout.trim();
    let version_token = raw
        .split_whitespace()
        .find(|tok| tok.len() > 2 && tok.starts_with("go") && tok.as_bytes()[2].is_ascii_digit());

    match version_token {
        Some(tok) => {
            let numeric = tok.trim_start_matches("go");
            Ok(format!("go v{numeric}"))
        }
        None => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_package_is_used_as_is() {
        let src = "package main\n\nfunc main() {}\n";
        assert_eq!(GoExecutor::synthesize_program(src), src);
    }

    #[test]
    fn bare_main_func_gets_package_prefix_only() {
        let src = "func main() {\n\tfmt.Println(\"hi\")\n}";
        let synthesized = GoExecutor::synthesize_program(src);
        assert!(synthesized.starts_with("package main\n\n"));
        assert!(synthesized.contains("func main() {"));
        assert!(!synthesized.contains("func main() {\nfunc main"));
    }

    #[test]
    fn bare_statements_are_wrapped_in_a_generated_main() {
        let src = "fmt.Println(\"hi\")";
        let synthesized = GoExecutor::synthesize_program(src);
        assert!(synthesized.starts_with("package main\n\nimport \"fmt\"\n\nfunc main() {\n"));
        assert!(synthesized.contains("\tfmt.Println(\"hi\")"));
    }

    #[test]
    fn empty_lines_are_not_indented_when_wrapping() {
        let src = "fmt.Println(\"a\")\n\nfmt.Println(\"b\")";
        let synthesized = GoExecutor::synthesize_program(src);
        assert!(synthesized.contains("\tfmt.Println(\"a\")\n\n\tfmt.Println(\"b\")"));
    }
}
