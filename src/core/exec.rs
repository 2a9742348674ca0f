//! External tool invocation
//!
//! Every mutation and query in this crate goes through another program's
//! CLI. This module is the single place that spawns those programs, captures
//! their output, and maps a non-zero exit into [`Error::Command`] with the
//! tool name, stderr, and exit code attached.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error};

use crate::core::error::{Error, Result};

/// Runs a tool and returns its captured output regardless of exit status.
///
/// # Errors
///
/// Returns `Err` only if the process cannot be spawned (missing binary,
/// permission problem).
pub async fn run(tool: &str, args: &[&str]) -> Result<std::process::Output> {
    debug!("exec: {tool} {}", args.join(" "));

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            error!("Failed to spawn {tool}: {e}");
            Error::Command {
                tool: tool.to_string(),
                stderr: e.to_string(),
                exit_code: None,
            }
        })?;

    Ok(output)
}

/// Runs a tool and returns stdout as UTF-8 text, failing on non-zero exit.
///
/// # Errors
///
/// Returns [`Error::Command`] if the tool cannot be spawned or exits
/// non-zero; stderr is carried in the error.
pub async fn run_checked(tool: &str, args: &[&str]) -> Result<String> {
    let output = run(tool, args).await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("{tool} exited with {:?}: {stderr}", output.status.code());
        Err(Error::Command {
            tool: tool.to_string(),
            stderr,
            exit_code: output.status.code(),
        })
    }
}

/// Runs a tool and reports only whether it exited zero.
///
/// Used for status-style queries (`rpm -q`, `systemctl is-active`) where a
/// non-zero exit is an answer, not a failure.
///
/// # Errors
///
/// Returns `Err` only if the process cannot be spawned.
pub async fn run_succeeds(tool: &str, args: &[&str]) -> Result<bool> {
    let output = run(tool, args).await?;
    Ok(output.status.success())
}
