use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Result of a finished toolchain process with stdout and stderr folded
/// into one string.
#[derive(Debug)]
pub struct Captured {
    pub success: bool,
    pub code: Option<i32>,
    pub output: String,
}

impl Captured {
    /// Output suitable for an error message; falls back to the exit code
    /// when the tool printed nothing.
    pub fn describe(&self) -> String {
        if self.output.is_empty() {
            match self.code {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            self.output.clone()
        }
    }
}

/// Runs `program` to completion, optionally feeding `stdin`.
///
/// There is no timeout: a hung toolchain holds the request until the
/// supervisor gives up on it.
pub async fn run_captured(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    stdin: Option<&str>,
) -> std::io::Result<Captured> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            match pipe.write_all(input.as_bytes()).await {
                // the tool exited without reading; its status says why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
            // closing stdin lets `--password-stdin` readers finish
            drop(pipe);
        }
    }

    let output = child.wait_with_output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    debug!(program, status = %output.status, "command finished");

    let combined = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Captured {
        success: output.status.success(),
        code: output.status.code(),
        output: combined,
    })
}
