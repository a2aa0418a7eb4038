mod runtime;
mod shutdown;
mod state;
mod supervisor;
mod types;

#[cfg(test)]
mod tests;

pub use supervisor::Supervisor;
pub use types::{ShutdownReason, SupervisorState};
