use std::net::IpAddr;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::LookupError;

use super::PtrResolver;

/// Reverse DNS through the system `dig` binary.
pub struct DigResolver {
    program: String,
}

impl DigResolver {
    pub fn new() -> Self {
        Self {
            program: "dig".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DigResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PtrResolver for DigResolver {
    async fn resolve_ptr(&self, client: IpAddr) -> Result<Option<String>, LookupError> {
        let output = Command::new(&self.program)
            .args(["+short", "-x", &client.to_string()])
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(LookupError::Backend(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        Ok(parse_dig_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// First hostname in `dig +short` output, `None` for an empty answer.
fn parse_dig_output(stdout: &str) -> Option<String> {
    let hostname = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;

    if hostname == "." || hostname.starts_with(";;") {
        return None;
    }

    Some(hostname.to_string())
}
