//! Subprocess execution.
//!
//! Every external tool the pipeline drives (git, bundler, jake) is started
//! through this module:
//! - the working directory is always passed explicitly
//! - the environment is cleared and replaced by the pipeline [`Environment`]
//! - success is decided by the exit status alone
//!
//! There is no timeout: a subprocess that never exits blocks the build.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::env::Environment;

/// Errors starting or waiting on a subprocess.
///
/// A non-zero exit is not an error at this level; see [`ProcessOutput::success`].
#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to start '{program}'")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("failed waiting for '{program}'")]
  Wait {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// Exit status and combined output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
  pub status: ExitStatus,
  pub output: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.status.success()
  }

  pub fn code(&self) -> Option<i32> {
    self.status.code()
  }
}

fn command<S: AsRef<str>>(program: &str, args: &[S], env: &Environment, cwd: &Path) -> Command {
  let mut command = Command::new(program);
  command.args(args.iter().map(AsRef::as_ref)).current_dir(cwd).stdin(Stdio::null());
  env.apply_to(&mut command);
  command
}

/// Render a command line for log output.
pub fn display_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
  std::iter::once(program)
    .chain(args.iter().map(AsRef::as_ref))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Run a command to completion, capturing its output.
///
/// The returned output is stdout followed by stderr, trimmed.
pub async fn run<S: AsRef<str>>(
  program: &str,
  args: &[S],
  env: &Environment,
  cwd: &Path,
) -> Result<ProcessOutput, ProcessError> {
  debug!(cmd = %display_command(program, args), cwd = %cwd.display(), "running");

  let output = command(program, args, env, cwd)
    .output()
    .await
    .map_err(|source| ProcessError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
  combined.push_str(&String::from_utf8_lossy(&output.stderr));
  let combined = combined.trim().to_string();

  if !output.status.success() {
    debug!(code = ?output.status.code(), output = %combined, "command failed");
  }

  Ok(ProcessOutput {
    status: output.status,
    output: combined,
  })
}

/// Run a command, streaming stdout and stderr line by line as it runs.
///
/// Each line is logged as it arrives and collected into the returned output
/// in arrival order.
pub async fn pipe<S: AsRef<str>>(
  program: &str,
  args: &[S],
  env: &Environment,
  cwd: &Path,
) -> Result<ProcessOutput, ProcessError> {
  debug!(cmd = %display_command(program, args), cwd = %cwd.display(), "piping");

  let mut child = command(program, args, env, cwd)
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|source| ProcessError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let (tx, mut rx) = mpsc::unbounded_channel();
  if let Some(stdout) = child.stdout.take() {
    tokio::spawn(forward_lines(stdout, tx.clone()));
  }
  if let Some(stderr) = child.stderr.take() {
    tokio::spawn(forward_lines(stderr, tx.clone()));
  }
  drop(tx);

  let mut lines = Vec::new();
  while let Some(line) = rx.recv().await {
    info!("       {}", line);
    lines.push(line);
  }

  let status = child.wait().await.map_err(|source| ProcessError::Wait {
    program: program.to_string(),
    source,
  })?;

  Ok(ProcessOutput {
    status,
    output: lines.join("\n"),
  })
}

/// Forward each line of `reader` until end of stream.
///
/// Lines are decoded lossily so a stray non-UTF-8 byte never stops the
/// reader; the child would otherwise die on a closed pipe.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf).await {
      Ok(0) => break,
      Ok(_) => {
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if tx.send(line).is_err() {
          break;
        }
      }
      Err(e) => {
        debug!(error = %e, "stopped reading subprocess output");
        break;
      }
    }
  }
}
