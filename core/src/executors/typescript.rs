//! The TypeScript/JavaScript executor (component C2, spec §4.2).
//!
//! Pipeline: transpile with `swc` → pick a backend (external `node` if
//! present, otherwise the embedded `boa_engine` sandbox) → run with a
//! deadline → on a sandbox-only failure that looks like an unsupported
//! syntax feature, report "runtime unavailable" instead of a stack trace.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use swc_common::errors::Handler;
use swc_common::sync::Lrc;
use swc_common::{FileName, Mark, SourceMap, GLOBALS};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_codegen::text_writer::JsWriter;
use swc_ecma_codegen::{Config as CodegenConfig, Emitter};
use swc_ecma_parser::{Parser, StringInput, Syntax, TsConfig};
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::FoldWith;

use crate::exit_codes;
use crate::result::{ExecutionRequest, ExecutionResult, Language};
use crate::subprocess::run_captured_with_deadline;

use super::Executor;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages that, from the embedded sandbox and with no external runtime
/// present, are treated as "this syntax isn't supported here" rather than
/// a genuine user bug (spec §4.2 step 5, and the Open Question in §9: when
/// an external runtime *is* available this heuristic must never fire).
const FALLBACK_PATTERNS: &[&str] = &[
    "unexpected token",
    "syntaxerror",
    "referenceerror",
    "typeerror",
];

pub struct TypeScriptExecutor {
    node_available: bool,
}

impl TypeScriptExecutor {
    /// Probes for `node` once, at construction, per spec §4.2: "Availability
    /// is probed once per executor instance and cached."
    pub fn new() -> Self {
        Self {
            node_available: which::which("node").is_ok(),
        }
    }

    /// Forces the sandbox path regardless of what's on `PATH`. Used by test
    /// builds, per spec §4.2's note that "test builds force the sandbox path".
    pub fn with_forced_sandbox() -> Self {
        Self {
            node_available: false,
        }
    }

    fn transpile(source: &str) -> Result<String, Vec<String>> {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(FileName::Custom("snippet.tsx".into()).into(), source.to_string());

        let mut recorded_errors: Vec<String> = Vec::new();
        let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));

        let syntax = Syntax::Typescript(TsConfig {
            tsx: true,
            ..Default::default()
        });
        let mut parser = Parser::new(syntax, StringInput::from(&*fm), None);

        for err in parser.take_errors() {
            recorded_errors.push(err.into_diagnostic(&handler).message());
        }

        let module = match parser.parse_module() {
            Ok(module) => module,
            Err(err) => {
                recorded_errors.push(err.into_diagnostic(&handler).message());
                return Err(recorded_errors);
            }
        };
        for err in parser.take_errors() {
            recorded_errors.push(err.into_diagnostic(&handler).message());
        }
        if !recorded_errors.is_empty() {
            return Err(recorded_errors);
        }

        let program = GLOBALS.set(&Default::default(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            let program = Program::Module(module)
                .fold_with(&mut resolver(unresolved_mark, top_level_mark, true));
            program.fold_with(&mut swc_ecma_transforms_typescript::strip(unresolved_mark, top_level_mark))
        });

        let mut buf = Vec::new();
        {
            let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: CodegenConfig::default().with_target(EsVersion::EsNext),
                cm: cm.clone(),
                comments: None,
                wr: writer,
            };
            emitter
                .emit_program(&program)
                .map_err(|e| vec![e.to_string()])?;
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn run_external(&self, transpiled: &str, deadline: Duration) -> ExecutionResult {
        let file = match tempfile::Builder::new()
            .prefix("codezone-")
            .suffix(".js")
            .tempfile()
        {
            Ok(f) => f,
            Err(e) => {
                return ExecutionResult::failure(
                    Language::TypeScript,
                    format!("Failed to create temporary script file: {e}"),
                    exit_codes::GENERIC_FAILURE,
                    Duration::ZERO,
                )
            }
        };
        if let Err(e) = std::fs::write(file.path(), transpiled) {
            return ExecutionResult::failure(
                Language::TypeScript,
                format!("Failed to write temporary script file: {e}"),
                exit_codes::GENERIC_FAILURE,
                Duration::ZERO,
            );
        }

        let started = Instant::now();
        let cwd = std::env::temp_dir();
        let path_str = file.path().to_string_lossy().into_owned();
        let run = run_captured_with_deadline("node", &[path_str.as_str()], &cwd, None, deadline).await;
        // `file` is a NamedTempFile; it is removed here on every exit path
        // (success, failure, or timeout) when it drops at the end of this scope.

        match run {
            Ok(Some(captured)) if captured.status_code == Some(0) => {
                ExecutionResult::success(Language::TypeScript, captured.stdout, started.elapsed())
            }
            Ok(Some(captured)) => ExecutionResult::failure(
                Language::TypeScript,
                captured.stderr,
                captured.status_code.unwrap_or(exit_codes::GENERIC_FAILURE),
                started.elapsed(),
            ),
            Ok(None) => ExecutionResult::failure(
                Language::TypeScript,
                "Execution timed out".to_string(),
                exit_codes::TIMEOUT,
                started.elapsed(),
            ),
            Err(e) => ExecutionResult::failure(
                Language::TypeScript,
                format!("Failed to launch external runtime: {e}"),
                exit_codes::GENERIC_FAILURE,
                started.elapsed(),
            ),
        }
    }

    async fn run_embedded(&self, transpiled: String, deadline: Duration) -> ExecutionResult {
        let started = Instant::now();
        let join = tokio::task::spawn_blocking(move || evaluate_in_sandbox(&transpiled));

        match tokio::time::timeout(deadline, join).await {
            Ok(Ok(Ok(rendering))) => {
                ExecutionResult::success(Language::TypeScript, rendering.output, started.elapsed())
            }
            Ok(Ok(Err(message))) => {
                let exit_code = if !self.node_available && looks_unsupported(&message) {
                    exit_codes::JS_RUNTIME_UNAVAILABLE
                } else {
                    exit_codes::GENERIC_FAILURE
                };
                ExecutionResult::failure(Language::TypeScript, message, exit_code, started.elapsed())
            }
            Ok(Err(join_error)) => ExecutionResult::failure(
                Language::TypeScript,
                format!("Sandbox task panicked: {join_error}"),
                exit_codes::GENERIC_FAILURE,
                started.elapsed(),
            ),
            Err(_elapsed) => {
                // The blocking task is detached; the isolate it owns is
                // dropped on its own thread once `evaluate_in_sandbox` returns.
                ExecutionResult::failure(
                    Language::TypeScript,
                    "Execution timed out".to_string(),
                    exit_codes::TIMEOUT,
                    started.elapsed(),
                )
            }
        }
    }
}

impl Default for TypeScriptExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_unsupported(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    FALLBACK_PATTERNS.iter().any(|p| lower.contains(p))
}

struct SandboxRendering {
    output: String,
}

/// Runs `source` in a fresh `boa_engine` context. Must run on a plain OS
/// thread (the context is `!Send`), which is why callers always reach this
/// through `spawn_blocking`.
fn evaluate_in_sandbox(source: &str) -> Result<SandboxRendering, String> {
    use boa_engine::object::ObjectInitializer;
    use boa_engine::property::Attribute;
    use boa_engine::{js_string, Context, JsResult, JsValue, NativeFunction, Source};

    // Wraps the sink so it can be passed as `NativeFunction` captures, which
    // must implement `Trace`; the `Arc<Mutex<_>>` holds plain strings, not
    // GC-managed values, so there is nothing for the collector to trace.
    #[derive(Clone)]
    struct SinkHandle(Arc<Mutex<Vec<String>>>);

    impl boa_engine::Finalize for SinkHandle {}
    unsafe impl boa_engine::Trace for SinkHandle {
        boa_engine::empty_trace!();
    }

    impl std::ops::Deref for SinkHandle {
        type Target = Mutex<Vec<String>>;
        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    let outputs: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let mut context = Context::default();

    let make_sink = |sink: Arc<Mutex<Vec<String>>>| {
        let sink = SinkHandle(sink);
        NativeFunction::from_copy_closure_with_captures(
            move |_this, args, captured_sink, _ctx| -> JsResult<JsValue> {
                let joined = args
                    .iter()
                    .map(|a| a.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                captured_sink.lock().unwrap().push(joined);
                Ok(JsValue::undefined())
            },
            sink,
        )
    };

    let console = ObjectInitializer::new(&mut context)
        .function(make_sink(outputs.clone()), js_string!("log"), 0)
        .function(make_sink(outputs.clone()), js_string!("warn"), 0)
        .function(make_sink(outputs.clone()), js_string!("info"), 0)
        .function(make_sink(errors.clone()), js_string!("error"), 0)
        .build();

    context
        .register_global_property(js_string!("console"), console, Attribute::all())
        .map_err(|e| e.to_string())?;

    let eval_result = context.eval(Source::from_bytes(source));

    let mut lines = outputs.lock().unwrap().clone();
    let error_lines = errors.lock().unwrap().clone();

    match eval_result {
        Ok(value) => {
            if !value.is_undefined() && !value.is_null() {
                lines.push(value.display().to_string());
            }
            if !error_lines.is_empty() {
                // Errors logged via console.error don't fail the call; they
                // are folded in after stdout-equivalent output, matching the
                // spec's "within each stream insertion order is preserved".
                lines.extend(error_lines);
            }
            Ok(SandboxRendering {
                output: lines.join("\n"),
            })
        }
        Err(err) => Err(err.to_string()),
    }
}

#[async_trait]
impl Executor for TypeScriptExecutor {
    async fn execute(&self, request: &ExecutionRequest, deadline: Duration) -> ExecutionResult {
        if request.code.is_empty() {
            return ExecutionResult::empty(Language::TypeScript);
        }

        let transpiled = match Self::transpile(&request.code) {
            Ok(code) => code,
            Err(errors) => {
                return ExecutionResult::failure(
                    Language::TypeScript,
                    errors.join("\n"),
                    exit_codes::TRANSPILE_FAILURE,
                    Duration::ZERO,
                )
            }
        };

        if self.node_available {
            self.run_external(&transpiled, deadline).await
        } else {
            self.run_embedded(transpiled, deadline).await
        }
    }

    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn cleanup(&self) {
        // No long-lived native resources: isolates are per-call and scratch
        // files are `tempfile::NamedTempFile`s that clean themselves up.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_code_short_circuits_without_transpiling() {
        let executor = TypeScriptExecutor::with_forced_sandbox();
        let request = ExecutionRequest::new("", Language::TypeScript);
        let result = executor.execute(&request, Duration::from_secs(5)).await;
        assert_eq!(result.output, "");
        assert_eq!(result.exit_code, exit_codes::SUCCESS);
    }

    #[tokio::test]
    async fn console_log_is_captured_in_sandbox() {
        let executor = TypeScriptExecutor::with_forced_sandbox();
        let request = ExecutionRequest::new(r#"console.log("Hello, World!");"#, Language::TypeScript);
        let result = executor.execute(&request, Duration::from_secs(5)).await;
        assert_eq!(result.exit_code, exit_codes::SUCCESS);
        assert!(result.output.contains("Hello, World!"));
    }

    #[tokio::test]
    async fn final_expression_value_is_appended() {
        let executor = TypeScriptExecutor::with_forced_sandbox();
        let request = ExecutionRequest::new("2 + 2", Language::TypeScript);
        let result = executor.execute(&request, Duration::from_secs(5)).await;
        assert_eq!(result.exit_code, exit_codes::SUCCESS);
        assert!(result.output.contains('4'));
    }

    #[tokio::test]
    async fn malformed_typescript_fails_transpile_with_code_2() {
        let executor = TypeScriptExecutor::with_forced_sandbox();
        let request = ExecutionRequest::new("const x: = ;;;", Language::TypeScript);
        let result = executor.execute(&request, Duration::from_secs(5)).await;
        assert_eq!(result.exit_code, exit_codes::TRANSPILE_FAILURE);
        assert!(!result.error.is_empty());
    }

    #[test]
    fn fallback_pattern_matching_is_case_insensitive() {
        assert!(looks_unsupported("Uncaught ReferenceError: foo is not defined"));
        assert!(looks_unsupported("UNEXPECTED TOKEN '}'"));
        assert!(!looks_unsupported("division by zero"));
    }
}
