//! Persisted listening gate
//!
//! A single durable tri-state flag shared across cooperating processes.
//! The capture loop re-reads it before every disposition decision; `orion
//! gate arm|stop|status` mutates it from a separate process. Writes are
//! atomic (temp file + rename) so a concurrent reader never observes a torn
//! value, and the temp file is synced before the rename so a crash after
//! `write` returns cannot lose the update.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// State of the listening gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Not listening; only a wake phrase is accepted
    #[default]
    Off,
    /// Explicitly armed, waiting for a wake phrase
    ///
    /// The capture loop treats this exactly like [`GateState::Off`]; the
    /// distinct value lets cooperating processes tell "deliberately armed"
    /// apart from "stopped".
    Armed,
    /// Listening; every transcription is surrendered to the consumer
    Active,
}

impl GateState {
    /// Whether the gate surrenders transcriptions to the consumer
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Active)
    }

    fn as_token(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Armed => "armed",
            Self::Active => "active",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "armed" => Some(Self::Armed),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// File-backed listening gate with atomic read/write semantics
#[derive(Debug, Clone)]
pub struct ListeningGate {
    path: PathBuf,
}

impl ListeningGate {
    /// Create a gate backed by the given file path
    ///
    /// The file does not need to exist yet; a missing file reads as
    /// [`GateState::Off`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current gate state
    ///
    /// Never fails: a missing file is `Off`, and unreadable or unrecognized
    /// content is retried once then degrades to `Off` with a warning. Callers
    /// must re-read before each decision rather than caching the value: an
    /// external writer may change it at any time.
    #[must_use]
    pub fn read(&self) -> GateState {
        match self.try_read() {
            Some(state) => state,
            None => {
                // A concurrent rename can surface as a transient miss; one
                // immediate re-read resolves it.
                self.try_read().unwrap_or_else(|| {
                    tracing::warn!(path = %self.path.display(), "gate unreadable, defaulting to off");
                    GateState::Off
                })
            }
        }
    }

    fn try_read(&self) -> Option<GateState> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => GateState::from_token(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(GateState::Off),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "gate read failed");
                None
            }
        }
    }

    /// Durably write a new gate state
    ///
    /// The value is written to a temp file in the same directory, synced,
    /// then renamed over the gate file, so concurrent readers see either the
    /// old or the new value and never a partial write.
    ///
    /// # Errors
    ///
    /// Returns error if the gate file cannot be written
    pub fn write(&self, state: GateState) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Gate(format!("temp file: {e}")))?;
        writeln!(tmp, "{}", state.as_token())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Gate(format!("persist: {}", e.error)))?;

        tracing::debug!(state = %state, path = %self.path.display(), "gate written");
        Ok(())
    }

    /// Arm the gate: wait for a wake phrase
    ///
    /// # Errors
    ///
    /// Returns error if the gate file cannot be written
    pub fn arm(&self) -> Result<()> {
        self.write(GateState::Armed)
    }

    /// Open the gate: surrender all transcriptions
    ///
    /// # Errors
    ///
    /// Returns error if the gate file cannot be written
    pub fn activate(&self) -> Result<()> {
        self.write(GateState::Active)
    }

    /// Unconditionally force the gate off
    ///
    /// Callable at any time from any process.
    ///
    /// # Errors
    ///
    /// Returns error if the gate file cannot be written
    pub fn stop(&self) -> Result<()> {
        self.write(GateState::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_in(dir: &tempfile::TempDir) -> ListeningGate {
        ListeningGate::new(dir.path().join("gate"))
    }

    #[test]
    fn missing_file_reads_off() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(gate_in(&dir).read(), GateState::Off);
    }

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate_in(&dir);

        gate.activate().unwrap();
        assert_eq!(gate.read(), GateState::Active);

        gate.arm().unwrap();
        assert_eq!(gate.read(), GateState::Armed);

        gate.stop().unwrap();
        assert_eq!(gate.read(), GateState::Off);
    }

    #[test]
    fn garbage_content_reads_off() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate_in(&dir);
        std::fs::write(gate.path(), "not-a-state\n").unwrap();
        assert_eq!(gate.read(), GateState::Off);
    }

    #[test]
    fn token_parsing_is_case_insensitive() {
        assert_eq!(GateState::from_token(" ACTIVE \n"), Some(GateState::Active));
        assert_eq!(GateState::from_token("Armed"), Some(GateState::Armed));
        assert_eq!(GateState::from_token(""), None);
    }
}
