//! # playground-run
//!
//! A small command-line driver for the execution core: reads a snippet from
//! a file (or stdin) and runs it through the named language's executor,
//! printing the resulting `ExecutionResult` as pretty JSON.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueHint};
use codezone_core::{ExecutionManager, ExecutionRequest, Language};

#[derive(Parser)]
#[clap(
    name = "playground-run",
    version,
    author = "ckir",
    about = "Runs a source snippet through the CodeZone execution core."
)]
struct Cli {
    /// Language to run the snippet as.
    #[clap(value_parser = ["typescript", "javascript", "go", "postgres"])]
    language: String,

    /// Path to the snippet; reads stdin when omitted.
    #[clap(value_hint = ValueHint::FilePath)]
    path: Option<PathBuf>,

    /// Timeout in seconds; 0 uses the executor's default.
    #[clap(long, default_value_t = 0)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let language = match Language::from_tag(&args.language) {
        Some(l) => l,
        None => {
            eprintln!("Error: unsupported language '{}'.", args.language);
            std::process::exit(1);
        }
    };

    let code = match read_source(args.path.as_deref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: failed to read snippet: {e}");
            std::process::exit(1);
        }
    };

    let mut request = ExecutionRequest::new(code, language);
    request.timeout = Duration::from_secs(args.timeout_secs);

    let manager = ExecutionManager::new();
    match manager.execute(request).await {
        Ok(result) => {
            let rendered = serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string());
            println!("{rendered}");
            std::process::exit(result.exit_code);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn read_source(path: Option<&std::path::Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
