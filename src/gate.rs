use crate::config::DependencyConfig;
use crate::error::{BootgateError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Endpoint the gate polls. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTarget {
    pub host: String,
    pub port: u16,
}

impl DependencyTarget {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Blocks startup until a TCP connection to the dependency succeeds.
///
/// Connection errors and per-attempt timeouts both mean "not ready yet";
/// no distinction is made between a refused connection and an unresolvable
/// host. With `max_attempts` unset the gate polls forever.
pub struct ReadinessGate {
    target: DependencyTarget,
    poll_interval: Duration,
    connect_timeout: Duration,
    max_attempts: Option<u32>,
}

impl ReadinessGate {
    pub fn new(
        target: DependencyTarget,
        poll_interval: Duration,
        connect_timeout: Duration,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            target,
            poll_interval,
            connect_timeout,
            max_attempts,
        }
    }

    pub fn from_config(config: &DependencyConfig) -> Self {
        Self::new(
            DependencyTarget {
                host: config.host.clone(),
                port: config.port,
            },
            Duration::from_secs(config.poll_interval_secs),
            Duration::from_secs(config.connect_timeout_secs),
            config.max_attempts,
        )
    }

    pub fn target(&self) -> &DependencyTarget {
        &self.target
    }

    /// Poll until the dependency accepts a TCP connection. Returns the
    /// number of attempts made, counting the successful one.
    pub async fn wait_ready(&self) -> Result<u32> {
        let addr = self.target.addr();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            match timeout(self.connect_timeout, TcpStream::connect(addr.as_str())).await {
                Ok(Ok(_stream)) => {
                    info!("Dependency {} is ready (attempt {})", addr, attempts);
                    return Ok(attempts);
                }
                Ok(Err(e)) => {
                    info!("Waiting for dependency {} (attempt {}): {}", addr, attempts, e);
                }
                Err(_) => {
                    info!(
                        "Waiting for dependency {} (attempt {}): connect timed out",
                        addr, attempts
                    );
                }
            }

            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(BootgateError::Gate {
                        host: self.target.host.clone(),
                        port: self.target.port,
                        attempts,
                    });
                }
            }

            debug!("Sleeping {:?} before next attempt", self.poll_interval);
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    fn gate_for(port: u16, interval_ms: u64, max_attempts: Option<u32>) -> ReadinessGate {
        ReadinessGate::new(
            DependencyTarget {
                host: "127.0.0.1".to_string(),
                port,
            },
            Duration::from_millis(interval_ms),
            Duration::from_secs(1),
            max_attempts,
        )
    }

    #[tokio::test]
    async fn test_gate_opens_immediately_when_listener_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let gate = gate_for(port, 10, Some(5));
        let attempts = gate.wait_ready().await.unwrap();
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_gate_retries_until_listener_appears() {
        // Reserve a port, release it, then rebind after a delay
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            // Hold the listener long enough for the gate to connect
            sleep(Duration::from_secs(2)).await;
            drop(listener);
        });

        let gate = gate_for(port, 20, None);
        let attempts = gate.wait_ready().await.unwrap();
        assert!(attempts > 1, "expected at least one failed attempt");

        handle.abort();
    }

    #[tokio::test]
    async fn test_gate_gives_up_after_max_attempts() {
        // Reserved then dropped, so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gate = gate_for(port, 20, Some(3));
        let start = Instant::now();
        let err = gate.wait_ready().await.unwrap_err();

        match err {
            BootgateError::Gate { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {}", other),
        }
        // Attempts are separated by at least the poll interval
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
