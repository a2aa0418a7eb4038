use super::types::{ShutdownReason, SupervisorState};
use crate::config::BootgateConfig;
use crate::error::Result;
use crate::gate::ReadinessGate;
use crate::prepare::PreparationPhase;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One-shot startup state machine run before the long-lived server process
/// takes over: readiness gate, preparation phase, supervised launch.
pub struct Supervisor {
    pub(super) config: BootgateConfig,

    // Lifecycle management
    pub(super) state: Arc<Mutex<SupervisorState>>,
    pub(super) shutdown_trigger: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl Supervisor {
    pub fn new(config: BootgateConfig) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            state: Arc::new(Mutex::new(SupervisorState::WaitingForDependency)),
            shutdown_trigger: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Readiness gate plus preparation phase, without launching the server.
    /// Runs the full sequence up to the point where launch would happen.
    pub async fn preflight(&mut self) -> Result<()> {
        self.set_state(SupervisorState::WaitingForDependency).await;

        let gate = ReadinessGate::from_config(&self.config.dependency);
        info!(
            "Waiting for dependency {} to become reachable",
            gate.target().addr()
        );
        gate.wait_ready().await?;

        self.set_state(SupervisorState::Preparing).await;
        PreparationPhase::new(self.config.prepare.clone()).run().await?;

        Ok(())
    }

    /// Request a shutdown from outside the signal handlers. Has no effect
    /// once a shutdown is already in flight.
    pub async fn request_shutdown(&self, reason: ShutdownReason) {
        if let Some(sender) = self.shutdown_trigger.lock().await.take() {
            let _ = sender.send(reason);
        }
    }
}
