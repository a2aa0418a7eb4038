use super::types::{ShutdownReason, SupervisorState};
use super::Supervisor;
use crate::error::{BootgateError, Result};
use crate::launch::ServerProcess;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::info;

enum RunOutcome {
    /// The server exited on its own, no signal involved
    Exited(ExitStatus),
    /// A shutdown was requested while the server was running
    ShutdownRequested(ShutdownReason),
}

impl Supervisor {
    /// Run the full startup sequence and supervise the server until it
    /// exits. Returns the process exit code for the supervisor itself.
    pub async fn run(&mut self) -> Result<i32> {
        self.preflight().await?;
        self.launch_and_supervise().await
    }

    /// Spawn the server and wait for either its own exit or a shutdown
    /// request from a signal handler.
    pub(super) async fn launch_and_supervise(&mut self) -> Result<i32> {
        let shutdown_receiver =
            self.shutdown_receiver
                .take()
                .ok_or_else(|| BootgateError::Supervise {
                    message: "Shutdown receiver already taken".to_string(),
                })?;

        // Handlers must be registered before the child exists; a signal
        // landing in the spawn window has to reach the shutdown channel
        self.setup_signal_handlers().await;

        let mut process = ServerProcess::spawn(&self.config.server, &self.config.shutdown)?;
        self.set_state(SupervisorState::Running).await;

        let outcome = tokio::select! {
            status = process.wait() => RunOutcome::Exited(status?),
            reason = shutdown_receiver => {
                let reason = reason.map_err(|_| BootgateError::Supervise {
                    message: "Shutdown channel closed unexpectedly".to_string(),
                })?;
                RunOutcome::ShutdownRequested(reason)
            }
        };

        self.set_state(SupervisorState::ShuttingDown).await;
        self.cancellation_token.cancel();

        match outcome {
            RunOutcome::Exited(status) => {
                // No signal was involved, so the child's real exit code
                // propagates
                let code = status.code().unwrap_or(1);
                info!("Server exited on its own with code {}", code);
                Ok(code)
            }
            RunOutcome::ShutdownRequested(reason) => {
                info!("Shutdown initiated: {:?}", reason);
                self.shutdown(process).await
            }
        }
    }

    /// Set up signal handlers for graceful shutdown
    async fn setup_signal_handlers(&self) {
        // Handle SIGTERM (container stop) and SIGQUIT - Unix only
        #[cfg(unix)]
        for (kind, name) in [
            (signal::unix::SignalKind::terminate(), "SIGTERM"),
            (signal::unix::SignalKind::quit(), "SIGQUIT"),
        ] {
            let trigger = Arc::clone(&self.shutdown_trigger);
            tokio::spawn(async move {
                if let Some(()) = signal::unix::signal(kind)
                    .expect("Failed to register signal handler")
                    .recv()
                    .await
                {
                    info!("Received {} signal", name);
                    send_shutdown(&trigger, ShutdownReason::Signal(name.to_string())).await;
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let trigger = Arc::clone(&self.shutdown_trigger);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_shutdown(&trigger, ShutdownReason::Signal("SIGINT".to_string())).await;
            }
        });
    }
}

async fn send_shutdown(
    trigger: &Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    reason: ShutdownReason,
) {
    if let Some(sender) = trigger.lock().await.take() {
        let _ = sender.send(reason);
    }
}
