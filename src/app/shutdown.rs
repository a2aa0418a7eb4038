use super::Supervisor;
use crate::error::Result;
use crate::launch::ServerProcess;
use tracing::{debug, info};

impl Supervisor {
    /// Perform graceful shutdown of the supervised server.
    ///
    /// The child's real exit status is discarded on this path: a
    /// signal-triggered stop is treated as graceful and always exits 0.
    pub(super) async fn shutdown(&mut self, mut process: ServerProcess) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let status = process.terminate_group().await?;
        debug!("Server exit status on shutdown: {:?}", status.code());

        info!("Graceful shutdown completed");
        Ok(0)
    }
}
