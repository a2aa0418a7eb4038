pub mod app;
pub mod config;
pub mod error;
pub mod gate;
pub mod launch;
pub mod prepare;

pub use app::{ShutdownReason, Supervisor, SupervisorState};
pub use config::{
    BootgateConfig, DependencyConfig, FailurePolicy, LaunchMode, PrepareStep, ServerConfig,
    ShutdownConfig,
};
pub use error::{BootgateError, Result};
pub use gate::{DependencyTarget, ReadinessGate};
pub use launch::ServerProcess;
pub use prepare::PreparationPhase;
