// ABOUTME: Redis liveness check through the redis-cli binary.
// ABOUTME: A missing binary is reported separately so callers can fall back.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of running `redis-cli ping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingOutcome {
    /// The server answered `PONG`.
    Pong,
    /// The server (or the CLI) answered something else.
    Unexpected(String),
    /// The CLI could not be executed.
    CliUnavailable(String),
    /// The CLI did not finish in time.
    TimedOut,
}

/// Runs `redis-cli -h <host> -p <port> ping`.
#[derive(Debug, Clone)]
pub struct RedisCli {
    program: String,
    timeout: Duration,
}

impl RedisCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub async fn ping(&self, host: &str, port: u16) -> PingOutcome {
        let port = port.to_string();
        let output = Command::new(&self.program)
            .args(["-h", host, "-p", port.as_str(), "ping"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Err(_elapsed) => PingOutcome::TimedOut,
            Ok(Err(e)) => PingOutcome::CliUnavailable(format!("{}: {}", self.program, e)),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if output.status.success() && stdout == "PONG" {
                    PingOutcome::Pong
                } else if stdout.is_empty() {
                    PingOutcome::Unexpected(String::from_utf8_lossy(&output.stderr).trim().to_string())
                } else {
                    PingOutcome::Unexpected(stdout)
                }
            }
        }
    }
}

impl Default for RedisCli {
    fn default() -> Self {
        Self::new("redis-cli", Duration::from_secs(3))
    }
}
