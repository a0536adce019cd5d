use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};

/// Helper notebook server running next to the GUI. Stopped on drop.
pub struct NotebookServer {
    child: Child,
    command: String,
}

impl NotebookServer {
    /// Spawn `command[0] command[1..]` with `dir` as working directory.
    pub fn spawn(command: &[String], dir: &Path) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("notebook command is empty");
        };
        let child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("starting '{program}'"))?;
        let command = command.join(" ");
        log::info!("Started notebook server '{command}' (pid {}) in {}", child.id(), dir.display());
        Ok(Self { child, command })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Whether the process is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill and reap the process.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::warn!("Failed to kill notebook server: {e}");
        }
        match self.child.wait() {
            Ok(status) => log::info!("Notebook server exited ({status})"),
            Err(e) => log::warn!("Failed to reap notebook server: {e}"),
        }
    }
}

impl Drop for NotebookServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = vec!["sleep".to_string(), "30".to_string()];
        let mut server = NotebookServer::spawn(&cmd, dir.path()).unwrap();
        assert!(server.is_running());
        assert_eq!(server.command(), "sleep 30");
        server.stop();
        assert!(!server.is_running());
    }

    #[test]
    fn empty_or_missing_command_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NotebookServer::spawn(&[], dir.path()).is_err());
        let cmd = vec!["katil-no-such-program".to_string()];
        assert!(NotebookServer::spawn(&cmd, dir.path()).is_err());
    }
}
