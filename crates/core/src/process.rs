// Subprocess plumbing shared by the compiler wrappers

use crate::error::ToolchainError;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Run a command to completion under a wall-clock limit.
///
/// `what` names the tool for diagnostics. A spawn failure with
/// `NotFound` is a configuration problem (the binary is not where the
/// config says); everything else is an execution failure. On timeout
/// the child is killed via `kill_on_drop`.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    what: &str,
) -> Result<Output, ToolchainError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolchainError::Configuration(format!("{} not found: {}", what, e))
        } else {
            ToolchainError::Execution(format!("failed to spawn {}: {}", what, e))
        }
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(ToolchainError::Execution(format!(
            "failed to wait for {}: {}",
            what, e
        ))),
        Err(_) => Err(ToolchainError::Execution(format!(
            "{} timed out after {}s",
            what,
            timeout.as_secs_f64()
        ))),
    }
}

/// Validate a caller-supplied input file before touching any compiler.
pub(crate) fn ensure_input_file(path: &Path, extension: &str) -> Result<(), ToolchainError> {
    if !path.exists() {
        return Err(ToolchainError::Input(format!(
            "input file not found: {}",
            path.display()
        )));
    }
    if path.extension().and_then(|e| e.to_str()) != Some(extension) {
        return Err(ToolchainError::Input(format!(
            "input file must have a .{} extension, got: {}",
            extension,
            path.display()
        )));
    }
    Ok(())
}

/// Merge captured stdout and stderr into one diagnostic string,
/// preserving the tool's output verbatim.
pub(crate) fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.into_owned(),
        (true, false) => stderr.into_owned(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}
