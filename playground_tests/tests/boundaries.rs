//! Boundary behaviors B1-B4 (spec §8).

use std::time::Duration;

use codezone_core::{ExecutionManager, ExecutionRequest, Language};

#[tokio::test]
async fn b1_zero_timeout_resolves_to_a_nonzero_executor_default() {
    let manager = ExecutionManager::new();
    let mut request = ExecutionRequest::new("console.log(1)", Language::TypeScript);
    request.timeout = Duration::ZERO;
    // If the zero timeout were used literally, this would time out
    // instantly; a non-zero default lets a trivial script finish.
    let result = manager.execute(request).await.unwrap();
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn b4_comment_only_sql_is_rejected_without_contacting_the_server() {
    let manager = ExecutionManager::new();
    let request = ExecutionRequest::new("-- just a comment\n-- another one", Language::Postgres);
    let result = manager.execute(request).await.unwrap();
    assert_eq!(result.exit_code, codezone_core::exit_codes::POSTGRES_QUERY_ERROR);
    assert_eq!(result.error, "No SQL query provided");
}

// B2 (sandbox fallback heuristic yields exactly 160, never 1) and B3 (a Go
// snippet with `func main(` but no `package` gets only the prefix, no body
// wrapping) are exercised directly in `codezone_core`'s own unit tests
// (`executors::typescript::tests::fallback_pattern_matching_is_case_insensitive`
// and `executors::go::tests::bare_main_func_gets_package_prefix_only`), since
// B2 additionally requires forcing the sandbox path, which only the core
// crate's test-only constructor exposes.
