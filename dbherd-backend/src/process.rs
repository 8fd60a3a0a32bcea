use crate::prelude::*;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Process side effects of the adapters, kept behind a trait so adapters can
/// be driven without spawning anything.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Spawns a long running daemon and returns without waiting for it.
    async fn start_daemon(&self, command: &str) -> Result<(), Error>;

    /// Runs a stop command. Callers treat failures as best effort.
    async fn stop_daemon(&self, command: &str) -> Result<(), Error>;

    /// Runs a command to completion and captures its output.
    async fn run(&self, command: &str) -> Result<CommandOutput, Error>;
}

/// Runs everything through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellController;

impl ShellController {
    fn shell(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl ProcessController for ShellController {
    async fn start_daemon(&self, command: &str) -> Result<(), Error> {
        let child = Self::shell(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::process(command, e.to_string()))?;
        debug!("spawned pid {:?}: {}", child.id(), command);
        Ok(())
    }

    async fn stop_daemon(&self, command: &str) -> Result<(), Error> {
        let output = self.run(command).await?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::process(
                command,
                format!("exit status {:?}: {}", output.status, output.stderr.trim()),
            ))
        }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, Error> {
        let output = Self::shell(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::process(command, e.to_string()))?;
        trace!("`{}` exited with {:?}", command, output.status);
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(any(test, feature = "testing"))]
mockall::mock! {
    pub Controller {}
    #[async_trait]
    impl ProcessController for Controller {
        async fn start_daemon(&self, command: &str) -> Result<(), Error>;
        async fn stop_daemon(&self, command: &str) -> Result<(), Error>;
        async fn run(&self, command: &str) -> Result<CommandOutput, Error>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_captures_stdout_and_status() {
        let out = ShellController.run("echo 42").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "42");

        let out = ShellController.run("exit 3").await.unwrap();
        assert_eq!(out.status, Some(3));
    }

    #[tokio::test]
    async fn failed_stop_is_a_process_error() {
        let err = ShellController.stop_daemon("exit 1").await.unwrap_err();
        assert!(err.is_process());
        assert!(ShellController.stop_daemon("true").await.is_ok());
    }
}
