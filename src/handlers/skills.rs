//! Custom skills: music, smart home, study tools
//!
//! Each skill is a user-configured shell command template; `{query}` in
//! the template is replaced with the cleaned query. Unconfigured skills
//! answer politely instead of erroring, so routing to them is never a
//! batch failure.

use async_trait::async_trait;

use crate::dispatch::Handler;
use crate::{Error, Result};

/// A configurable command-template skill
pub struct CommandSkill {
    name: String,
    command: Option<String>,
}

impl CommandSkill {
    /// Create a skill backed by an optional command template
    #[must_use]
    pub fn new(name: impl Into<String>, command: Option<String>) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
}

#[async_trait]
impl Handler for CommandSkill {
    async fn handle(&self, query: &str) -> Result<String> {
        let Some(template) = &self.command else {
            return Ok(format!("The {} skill isn't set up yet.", self.name));
        };

        let command = template.replace("{query}", query);
        tracing::debug!(skill = %self.name, command = %command, "running skill command");

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await
            .map_err(|e| Error::Handler(format!("{} skill failed to start: {e}", self.name)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Handler(format!(
                "{} skill exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            Ok(format!("Done with the {} skill.", self.name))
        } else {
            Ok(stdout.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_skill_answers_politely() {
        let skill = CommandSkill::new("music", None);
        let reply = skill.handle("play lofi").await.unwrap();
        assert!(reply.contains("music"));
        assert!(reply.contains("isn't set up"));
    }

    #[tokio::test]
    async fn configured_skill_substitutes_query() {
        let skill = CommandSkill::new("echoes", Some("printf '%s' '{query}'".to_string()));
        let reply = skill.handle("play lofi").await.unwrap();
        assert_eq!(reply, "play lofi");
    }

    #[tokio::test]
    async fn failing_command_becomes_handler_error() {
        let skill = CommandSkill::new("broken", Some("exit 3".to_string()));
        let err = skill.handle("x").await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
