use crate::config::{FailurePolicy, PrepareStep};
use crate::error::{BootgateError, Result};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Runs the configured setup commands in order before the server launches.
///
/// Steps are expected to be idempotent. A step with the `abort` policy stops
/// the whole sequence on failure; a `continue` step is best-effort.
pub struct PreparationPhase {
    steps: Vec<PrepareStep>,
}

impl PreparationPhase {
    pub fn new(steps: Vec<PrepareStep>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run all steps in order. Returns at the first fatal failure without
    /// attempting later steps.
    pub async fn run(&self) -> Result<()> {
        if self.steps.is_empty() {
            info!("No preparation steps configured");
            return Ok(());
        }

        for step in &self.steps {
            self.run_step(step).await?;
        }

        info!("All preparation steps completed");
        Ok(())
    }

    async fn run_step(&self, step: &PrepareStep) -> Result<()> {
        let (program, args) = match step.command.split_first() {
            Some(split) => split,
            None => {
                // Rejected by config validation; treated as a fatal step here
                return Err(BootgateError::Prepare {
                    step: step.name.clone(),
                    code: None,
                });
            }
        };

        info!(
            "Running preparation step '{}': {}",
            step.name,
            step.command.join(" ")
        );

        let outcome = Command::new(program).args(args).status().await;

        let code = match outcome {
            Ok(status) if status.success() => {
                info!("Preparation step '{}' completed", step.name);
                return Ok(());
            }
            Ok(status) => status.code(),
            Err(e) => {
                warn!("Preparation step '{}' failed to start: {}", step.name, e);
                None
            }
        };

        match step.on_failure {
            FailurePolicy::Abort => {
                error!(
                    "Preparation step '{}' failed (exit code {:?}), aborting startup",
                    step.name, code
                );
                Err(BootgateError::Prepare {
                    step: step.name.clone(),
                    code,
                })
            }
            FailurePolicy::Continue => {
                warn!(
                    "Preparation step '{}' failed (exit code {:?}), continuing",
                    step.name, code
                );
                Ok(())
            }
        }
    }
}
