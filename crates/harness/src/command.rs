//! Subprocess execution with wall-clock timeout enforcement.
//!
//! Every external tool (encoders and the VMAF scorer) is driven through this
//! module. A timed-out subprocess is killed and reaped so no orphan is left
//! behind; `kill_on_drop` covers the capture path, where the child is dropped
//! together with its timed-out wait future.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Error type for subprocess execution
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be found
    #[error("Executable not found: {0}")]
    NotFound(String),

    /// The process exited with a non-zero status
    #[error("Command \"{cmd}\" failed with exit code: {code}")]
    Failed { cmd: String, code: i32 },

    /// The process was terminated by a signal
    #[error("Command \"{cmd}\" was terminated by signal")]
    Terminated { cmd: String },

    /// The process exceeded its allotted wall-clock time
    #[error("Command \"{cmd}\" timed out after {secs} secs")]
    TimedOut { cmd: String, secs: u64 },

    /// IO error spawning or waiting on the process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn render(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn spawn_error(err: std::io::Error, program: &str) -> CommandError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CommandError::NotFound(program.to_string())
    } else {
        CommandError::Io(err)
    }
}

fn status_result(
    status: std::process::ExitStatus,
    cmd_line: String,
) -> Result<(), CommandError> {
    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(CommandError::Failed {
                cmd: cmd_line,
                code,
            }),
            None => Err(CommandError::Terminated { cmd: cmd_line }),
        }
    }
}

/// Run a command to completion, discarding its output.
///
/// When `verbose` is set the child inherits stdout/stderr so tool output is
/// visible; otherwise both are routed to null. `timeout` bounds the wall-clock
/// run time; on expiry the child is killed and reaped.
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    verbose: bool,
) -> Result<(), CommandError> {
    let cmd_line = render(program, args);
    log::debug!("Running command \"{}\"", cmd_line);

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    if verbose {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let mut child = command.spawn().map_err(|e| spawn_error(e, program))?;

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(CommandError::TimedOut {
                    cmd: cmd_line,
                    secs: limit.as_secs(),
                });
            }
        },
        None => child.wait().await?,
    };

    status_result(status, cmd_line)
}

/// Run a command to completion and return its trimmed output.
///
/// Stdout is preferred; stderr is returned when stdout is empty (some tools
/// report on stderr only). The same timeout semantics as [`run_command`]
/// apply: dropping the wait future on expiry kills the child.
pub async fn run_command_capture(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    verbose: bool,
) -> Result<String, CommandError> {
    let cmd_line = render(program, args);
    log::debug!("Running command \"{}\"", cmd_line);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| spawn_error(e, program))?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| CommandError::TimedOut {
                cmd: cmd_line.clone(),
                secs: limit.as_secs(),
            })??,
        None => child.wait_with_output().await?,
    };

    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    }

    if verbose && !text.is_empty() {
        println!("{}", text);
    }

    status_result(output.status, cmd_line)?;
    Ok(text)
}
