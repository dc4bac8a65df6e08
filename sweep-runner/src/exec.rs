use crate::SweepError;
use crate::SweepResult;
use async_trait::async_trait;
use std::io;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::time::timeout;
use tokio::time::Instant;
use tracing::trace;
use tracing::warn;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ExecOutput {
  /// Standard error, split into lines.
  pub lines: Vec<String>,
  /// `None` if the child was killed by a signal or never finished.
  pub exit_code: Option<i32>,
  pub timed_out: bool,
}

impl ExecOutput {
  pub fn succeeded(&self) -> bool {
    self.exit_code == Some(0) && !self.timed_out
  }
}

/// Runs one command to completion. The sweep awaits each call before starting the next, so implementations never see overlapping calls.
#[async_trait]
pub trait Executor: Send + Sync {
  async fn execute(&self, command: &str) -> SweepResult<ExecOutput>;
}

/// Kills the whole process group of a running command when dropped, so launchers and executables the shell started die with it.
struct ProcessGroupGuard {
  pgid: Option<u32>,
}

impl ProcessGroupGuard {
  fn disarm(&mut self) {
    self.pgid = None;
  }

  #[cfg(unix)]
  fn kill(&mut self) {
    if let Some(pgid) = self.pgid.take() {
      // The group leader is the shell, spawned with its own group id equal to its pid.
      if unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) } != 0 {
        let err = io::Error::last_os_error();
        // ESRCH: every member has already exited.
        if err.raw_os_error() != Some(libc::ESRCH) {
          warn!(pgid, error = %err, "failed to kill process group");
        };
      };
    };
  }

  #[cfg(not(unix))]
  fn kill(&mut self) {
    self.pgid = None;
  }
}

impl Drop for ProcessGroupGuard {
  fn drop(&mut self) {
    self.kill();
  }
}

/// Runs commands through `sh -c`, passing stdout through and capturing stderr.
///
/// Each command gets its own process group. If the timeout elapses or the returned future is dropped (e.g. the sweep is cancelled), the whole group is killed, including any launcher or executable the shell has not exec'd into.
pub struct ShellExecutor {
  timeout: Option<Duration>,
}

impl ShellExecutor {
  pub fn new(timeout: Option<Duration>) -> Self {
    Self { timeout }
  }
}

#[async_trait]
impl Executor for ShellExecutor {
  async fn execute(&self, command: &str) -> SweepResult<ExecOutput> {
    let mut cmd = std::process::Command::new("sh");
    cmd
      .arg("-c")
      .arg(command)
      .stdin(Stdio::null())
      .stdout(Stdio::inherit())
      .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);
    let mut child = Command::from(cmd)
      .kill_on_drop(true)
      .spawn()
      .map_err(SweepError::Spawn)?;
    // Declared after `child` so it drops first.
    let mut group = ProcessGroupGuard { pgid: child.id() };
    let stderr = child
      .stderr
      .take()
      .ok_or_else(|| SweepError::Spawn(io::Error::new(io::ErrorKind::Other, "no stderr pipe")))?;

    let started = Instant::now();
    let mut lines = Vec::new();
    let run = async {
      let mut reader = BufReader::new(stderr);
      let mut buf = Vec::new();
      loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
          break;
        };
        // The executable's output is not guaranteed to be valid UTF-8.
        let line = String::from_utf8_lossy(&buf).trim_end_matches(['\n', '\r']).to_string();
        trace!(line = %line, "stderr");
        lines.push(line);
      }
      child.wait().await
    };

    let status: Option<io::Result<ExitStatus>> = match self.timeout {
      Some(limit) => timeout(limit, run).await.ok(),
      None => Some(run.await),
    };
    let exit_code = match status {
      Some(Ok(status)) => {
        group.disarm();
        status.code()
      }
      Some(Err(err)) => {
        warn!(error = %err, "lost track of child process");
        group.kill();
        None
      }
      None => {
        warn!(
          timeout = ?self.timeout,
          "command timed out, killing it"
        );
        group.kill();
        if let Err(err) = child.kill().await {
          warn!(error = %err, "failed to kill timed out command");
        };
        return Ok(ExecOutput {
          lines,
          exit_code: None,
          timed_out: true,
        });
      }
    };
    trace!(
      exec_secs = started.elapsed().as_secs_f64(),
      exit_code = ?exit_code,
      "command exited"
    );
    Ok(ExecOutput {
      lines,
      exit_code,
      timed_out: false,
    })
  }
}
