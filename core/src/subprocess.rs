//! A single "spawn a subprocess" primitive shared by the Go executor and the
//! TS/JS executor's external-runtime path (Design Notes, spec §9).
//!
//! Both callers need the same shape: run a command against a working
//! directory, optionally feed it stdin, capture stdout and stderr
//! separately, and hide the console window it would otherwise flash open on
//! non-Unix hosts. Centralizing that here keeps the platform-conditional
//! code in exactly one place.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// The captured result of running a subprocess to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// The child's exit status, or `None` if it was killed by signal.
    pub status_code: Option<i32>,
}

/// Runs `program args...` in `cwd`, writing `stdin` (if any) and waiting for
/// the child to exit. Does not itself enforce a deadline — callers race this
/// future against a timeout with `tokio::select!` / `tokio::time::timeout`
/// and are responsible for killing the [`tokio::process::Child`] on timeout;
/// see [`spawn_with_deadline`] for the common case.
pub async fn run_captured(
    program: &str,
    args: &[&str],
    cwd: &Path,
    stdin: Option<&str>,
) -> std::io::Result<CapturedOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    hide_window(&mut command);

    let mut child = command.spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the handle closes stdin so the child sees EOF.
        }
    } else {
        // Drop the unused stdin handle so the child sees EOF immediately.
        child.stdin.take();
    }

    let output = child.wait_with_output().await?;
    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status_code: output.status.code(),
    })
}

/// Runs `program` with a deadline: returns `Ok(None)` if the deadline elapses
/// first, after killing the child so nothing is left running.
pub async fn run_captured_with_deadline(
    program: &str,
    args: &[&str],
    cwd: &Path,
    stdin: Option<&str>,
    deadline: std::time::Duration,
) -> std::io::Result<Option<CapturedOutput>> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    hide_window(&mut command);

    let mut child = command.spawn()?;
    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
        }
    } else {
        child.stdin.take();
    }

    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(result) => {
            let output = result?;
            Ok(Some(CapturedOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                status_code: output.status.code(),
            }))
        }
        Err(_elapsed) => Ok(None),
    }
}

/// On Windows, suppress the console window the child would otherwise pop
/// open. A no-op everywhere else.
#[cfg(windows)]
fn hide_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_captured("echo", &["hello"], dir.path(), None)
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.status_code, Some(0));
    }

    #[tokio::test]
    async fn deadline_kills_long_running_child() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_captured_with_deadline(
            "sleep",
            &["5"],
            dir.path(),
            None,
            std::time::Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }
}
