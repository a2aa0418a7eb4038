use crate::config::{ServerConfig, ShutdownConfig};
use crate::error::{BootgateError, Result};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

/// The long-running server process, spawned into its own process group so
/// termination signals can be delivered to the whole tree at once.
pub struct ServerProcess {
    child: Child,
    #[cfg(unix)]
    pgid: i32,
    grace_period: Duration,
    command_line: String,
}

impl ServerProcess {
    /// Spawn the server with the mode-specific flags appended.
    pub fn spawn(server: &ServerConfig, shutdown: &ShutdownConfig) -> Result<Self> {
        let argv = server.effective_command();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| BootgateError::supervise("Server command is empty"))?;

        let mut command = Command::new(program);
        command.args(args).envs(&server.env);

        // New process group with pgid = child pid
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| BootgateError::supervise("Server process exited before observation"))?;

        let command_line = argv.join(" ");
        info!("Server process started (pid {}): {}", pid, command_line);

        Ok(Self {
            child,
            #[cfg(unix)]
            pgid: pid as i32,
            grace_period: Duration::from_secs(shutdown.grace_period_secs),
            command_line,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Wait for the server to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Forward SIGTERM to the whole process group, wait up to the grace
    /// period, then escalate to SIGKILL.
    pub async fn terminate_group(&mut self) -> Result<ExitStatus> {
        info!("Forwarding SIGTERM to server process group");
        self.signal_group(TermSignal::Term)?;

        match timeout(self.grace_period, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(
                    "Server did not exit within {:?}, sending SIGKILL",
                    self.grace_period
                );
                self.signal_group(TermSignal::Kill)?;
                Ok(self.child.wait().await?)
            }
        }
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: TermSignal) -> Result<()> {
        let sig = match signal {
            TermSignal::Term => libc::SIGTERM,
            TermSignal::Kill => libc::SIGKILL,
        };
        // Negative pid addresses the process group
        let rc = unsafe { libc::kill(-self.pgid, sig) };
        if rc != 0 {
            let e = std::io::Error::last_os_error();
            // ESRCH means the group is already gone, which is fine here
            if e.raw_os_error() != Some(libc::ESRCH) {
                return Err(BootgateError::supervise(format!(
                    "Failed to signal server process group: {}",
                    e
                )));
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn signal_group(&mut self, _signal: TermSignal) -> Result<()> {
        self.child
            .start_kill()
            .map_err(|e| BootgateError::supervise(format!("Failed to kill server: {}", e)))
    }
}

#[derive(Debug, Clone, Copy)]
enum TermSignal {
    Term,
    Kill,
}
