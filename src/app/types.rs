/// Supervisor lifecycle states, held only in memory and reset on every start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    WaitingForDependency,
    Preparing,
    Running,
    ShuttingDown,
}

/// Why the supervisor began shutting down
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}
