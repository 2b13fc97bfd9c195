//! Subprocess execution seam.
//!
//! External transfer tools and the package installer are run through
//! [`CommandExecutor`] so that callers can be tested without spawning
//! processes.

use std::io;
use std::process::{Command, Output};

/// Abstraction for running external commands.
///
/// Implementations must be shareable across download workers.
pub trait CommandExecutor: Send + Sync {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use upkern_installer::process::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("wget", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        log::trace!("running {cmd} {}", args.join(" "));
        Command::new(cmd).args(args).output()
    }
}

/// Return the trimmed stderr of a finished command, or its status when silent.
#[must_use]
pub fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        output.status.to_string()
    } else {
        stderr.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{exit_status, failure_output};

    #[test]
    fn failure_detail_prefers_stderr() {
        let output = failure_output("  404 Not Found\n");
        assert_eq!(failure_detail(&output), "404 Not Found");
    }

    #[test]
    fn failure_detail_falls_back_to_status() {
        let output = Output {
            status: exit_status(8),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(failure_detail(&output).contains('8'));
    }
}
