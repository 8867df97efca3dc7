//! SYSTEM_COMMANDS: app and system-level actions
//!
//! Supports "open/launch/start <application>" by resolving the executable
//! on PATH and spawning it detached. Anything else is refused with a
//! per-command error rather than guessed at.

use async_trait::async_trait;

use crate::dispatch::Handler;
use crate::{Error, Result};

/// Verbs understood as launch requests
const LAUNCH_VERBS: [&str; 3] = ["open", "launch", "start"];

/// System command handler
pub struct SystemCommandHandler;

impl SystemCommandHandler {
    /// Create the system command handler
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn launch(app: &str) -> Result<String> {
        // "Open VS Code" -> try "vs-code", "vscode", "code" style candidates
        let lowered = app.trim().to_lowercase();
        let candidates = [
            lowered.replace(' ', "-"),
            lowered.replace(' ', ""),
            lowered
                .split_whitespace()
                .last()
                .unwrap_or(&lowered)
                .to_string(),
        ];

        for candidate in &candidates {
            if let Ok(path) = which::which(candidate) {
                std::process::Command::new(&path)
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .spawn()
                    .map_err(|e| Error::Handler(format!("failed to launch {candidate}: {e}")))?;
                tracing::info!(app = %candidate, path = %path.display(), "application launched");
                return Ok(format!("Opening {}.", app.trim()));
            }
        }

        Err(Error::Handler(format!("no executable found for {app}")))
    }
}

impl Default for SystemCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for SystemCommandHandler {
    async fn handle(&self, query: &str) -> Result<String> {
        let lowered = query.trim().to_lowercase();
        for verb in LAUNCH_VERBS {
            if let Some(rest) = lowered.strip_prefix(verb) {
                let app = rest.trim();
                if app.is_empty() {
                    return Err(Error::Handler("nothing to open".to_string()));
                }
                return Self::launch(app);
            }
        }

        Err(Error::Handler(format!(
            "unsupported system command: {query}"
        )))
    }
}
