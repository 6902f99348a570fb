//! CLI command execution helpers
//!
//! This module wraps the `wnb` binary for one-shot invocations (argument errors)
//! and for long-running sessions that are interrupted with SIGINT.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// CLI command builder
pub struct WnbCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
}

impl WnbCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_wnb")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args<S: AsRef<str>>(&mut self, args: &[S]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.as_ref().to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env("NO_COLOR", "1");
        command
    }

    /// Execute to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.exit_code == 0 {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }

    /// Start a long-running session with stdout captured line by line
    pub fn spawn(&self) -> Result<RunningWnb> {
        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to spawn command")?;

        let stdout = child.stdout.take().context("stdout not captured")?;
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(RunningWnb { child, lines })
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    /// Check if stdout or stderr contains text
    pub fn mentions(&self, text: &str) -> bool {
        self.stdout.contains(text) || self.stderr.contains(text)
    }
}

/// A running `wnb` process
pub struct RunningWnb {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl RunningWnb {
    /// Wait until a stdout line contains `text`
    pub fn wait_for_line(&self, text: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline
                .checked_duration_since(Instant::now())
                .with_context(|| format!("Timed out waiting for {text:?}"))?;
            let line = self
                .lines
                .recv_timeout(left)
                .with_context(|| format!("Timed out waiting for {text:?}"))?;
            if line.contains(text) {
                return Ok(line);
            }
        }
    }

    /// Send SIGINT, as Ctrl-C would
    pub fn interrupt(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT)?;
        Ok(())
    }

    /// Wait for the process to exit
    pub fn wait_exit(&mut self, timeout: Duration) -> Result<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = self.child.kill();
                anyhow::bail!("Process did not exit within {:?}", timeout);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Drop for RunningWnb {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Poll until `check` holds
pub fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    check()
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// wnb!(dir, "folder").assert_failure()?;
/// ```
#[macro_export]
macro_rules! wnb {
    ($dir:expr $(, $arg:expr)*) => {{
        let mut cmd = $crate::common::cli::WnbCommand::new($dir);
        let args: Vec<String> = vec![$($arg.to_string()),*];
        cmd.args(&args);
        cmd
    }};
}
