//! Subprocess execution with a hard time limit.

use crate::error::EncodeError;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Non-zero exit maps to [`EncodeError::Failed`] with the captured stderr,
/// a kill maps to [`EncodeError::Timeout`].
pub fn run_with_timeout(
    mut command: Command,
    tool: &str,
    timeout: Duration,
) -> Result<ToolOutput, EncodeError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| EncodeError::Spawn {
        tool: tool.to_string(),
        source,
    })?;

    // Pipes are drained on their own threads so a chatty tool can't block on a full pipe
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::Timeout {
                    tool: tool.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                return Err(EncodeError::Spawn {
                    tool: tool.to_string(),
                    source,
                });
            }
        }
    };

    let output = ToolOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
    };

    if !status.success() {
        return Err(EncodeError::Failed {
            tool: tool.to_string(),
            status: status.to_string(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_successful_command() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 2048 1024"]);

        let output = run_with_timeout(command, "sh", Duration::from_secs(10)).unwrap();

        assert_eq!(output.stdout.trim(), "2048 1024");
    }

    #[test]
    fn non_zero_exit_is_failure_with_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo broken pipeline >&2; exit 3"]);

        let error = run_with_timeout(command, "sh", Duration::from_secs(10)).unwrap_err();

        match error {
            EncodeError::Failed { stderr, .. } => assert_eq!(stderr, "broken pipeline"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn slow_command_is_killed_at_deadline() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let started = Instant::now();
        let error = run_with_timeout(command, "sleep", Duration::from_millis(100)).unwrap_err();

        assert!(error.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let command = Command::new("/nonexistent/bin/cwebp-12345");

        let error = run_with_timeout(command, "cwebp", Duration::from_secs(1)).unwrap_err();

        assert!(matches!(error, EncodeError::Spawn { .. }));
    }
}
