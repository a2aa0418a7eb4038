use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootgateError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Dependency {host}:{port} not reachable after {attempts} attempts")]
    Gate {
        host: String,
        port: u16,
        attempts: u32,
    },

    #[error("Preparation step '{step}' failed{}", exit_code_suffix(.code))]
    Prepare { step: String, code: Option<i32> },

    #[error("Supervise error: {message}")]
    Supervise { message: String },
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {}", c),
        None => " (terminated by signal)".to_string(),
    }
}

impl BootgateError {
    pub fn supervise<S: Into<String>>(message: S) -> Self {
        Self::Supervise {
            message: message.into(),
        }
    }

    /// Process exit code this error maps to. A fatal preparation step
    /// propagates the step's own exit code when it has one.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Prepare { code: Some(c), .. } if *c != 0 => *c,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BootgateError>;
