use super::types::SupervisorState;
use super::Supervisor;
use tracing::debug;

impl Supervisor {
    /// Update supervisor state
    pub(super) async fn set_state(&self, state: SupervisorState) {
        let mut current = self.state.lock().await;
        *current = state;
        debug!("Supervisor state changed to: {:?}", state);
    }

    /// Get the current supervisor state
    pub async fn state(&self) -> SupervisorState {
        *self.state.lock().await
    }
}
