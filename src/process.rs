//! Child-process helpers shared by the probe, venv setup and forwarding.
//!
//! Two flavours:
//! * [`run_captured`]: stdout/stderr collected (setup steps, probes).
//! * [`run_inherited`]: stdio passed straight through (the synthesis call,
//!   so the library's own progress and errors reach the terminal verbatim).
//!
//! Both accept an optional timeout.  Each call drives the child on a
//! current-thread tokio runtime and bounds the wait with
//! [`tokio::time::timeout`]; a child that overruns is killed.

use std::{
    future::Future,
    io,
    process::{Command, ExitStatus, Stdio},
    time::Duration,
};

use tokio::runtime::Runtime;

use crate::error::{LauncherError, LauncherResult};

/// Result of a captured run.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim()
        } else {
            err
        }
    }
}

/// Program name used in messages.
pub fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// One-line rendering of `cmd` for logs and retry hints.
pub fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|a| {
            let s = a.to_string_lossy();
            if s.contains(char::is_whitespace) || s.is_empty() {
                format!("\"{s}\"")
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn runtime() -> LauncherResult<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread().enable_all().build()?)
}

/// Await `fut`, giving up after `limit` when one is set.
async fn bounded<T>(
    program: &str,
    limit: Option<Duration>,
    fut: impl Future<Output = io::Result<T>>,
) -> LauncherResult<T> {
    let Some(limit) = limit else {
        return Ok(fut.await?);
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            log::warn!("{program}: timed out after {}s, terminating", limit.as_secs());
            Err(LauncherError::Timeout {
                program: program.to_string(),
                timeout: limit,
            })
        }
    }
}

/// Run `cmd` with captured output.  A non-zero exit is *not* an error here;
/// callers inspect [`Captured::success`].
pub fn run_captured(cmd: Command, timeout: Option<Duration>) -> LauncherResult<Captured> {
    let program = program_name(&cmd);
    log::debug!("exec: {}", render(&cmd));

    let mut cmd = tokio::process::Command::from(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    runtime()?.block_on(async {
        let child = cmd.spawn()?;
        // On timeout the output future is dropped with the child inside it,
        // and `kill_on_drop` terminates the process.
        let output = bounded(&program, timeout, child.wait_with_output()).await?;
        Ok::<_, LauncherError>(Captured {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    })
}

/// Run `cmd` with the parent's stdio.  Non-zero exit becomes
/// [`LauncherError::SynthesisFailed`].
pub fn run_inherited(cmd: Command, timeout: Option<Duration>) -> LauncherResult<()> {
    let program = program_name(&cmd);
    log::debug!("exec: {}", render(&cmd));

    let mut cmd = tokio::process::Command::from(cmd);
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let status = runtime()?.block_on(async {
        let mut child = cmd.spawn()?;
        let waited = bounded(&program, timeout, child.wait()).await;
        if let Err(LauncherError::Timeout { .. }) = &waited {
            if let Err(e) = child.kill().await {
                log::debug!("{program}: kill after timeout failed: {e}");
            }
        }
        waited
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(LauncherError::SynthesisFailed {
            program,
            status: status.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn test_captured_output() {
        let out = run_captured(sh("echo hello; echo oops >&2"), None).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.diagnostics(), "oops");
    }

    #[test]
    fn test_captured_nonzero_is_not_error() {
        let out = run_captured(sh("echo fine; exit 3"), None).unwrap();
        assert!(!out.success());
        assert_eq!(out.status.code(), Some(3));
        assert_eq!(out.diagnostics(), "fine");
    }

    #[test]
    fn test_captured_timeout_kills_child() {
        let start = Instant::now();
        let err = run_captured(sh("sleep 5"), Some(Duration::from_millis(300))).unwrap_err();
        assert!(matches!(err, LauncherError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_inherited_failure_maps_to_synthesis_failed() {
        let err = run_inherited(sh("exit 2"), None).unwrap_err();
        match err {
            LauncherError::SynthesisFailed { program, .. } => assert_eq!(program, "sh"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inherited_timeout_kills_child() {
        let start = Instant::now();
        let err = run_inherited(sh("sleep 5"), Some(Duration::from_millis(300))).unwrap_err();
        match err {
            LauncherError::Timeout { program, timeout } => {
                assert_eq!(program, "sh");
                assert_eq!(timeout, Duration::from_millis(300));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_inherited_success_within_timeout() {
        run_inherited(sh("true"), Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn test_spawn_failure_is_io() {
        let err = run_captured(Command::new("no-such-binary-for-tts-launcher"), None).unwrap_err();
        assert!(matches!(err, LauncherError::Io(_)));
    }

    #[test]
    fn test_render_quotes_spaces() {
        let mut cmd = Command::new("tts");
        cmd.args(["--text", "Hello world", "--out_path", "a.wav"]);
        assert_eq!(render(&cmd), "tts --text \"Hello world\" --out_path a.wav");
    }
}
