//! Error types for the Orion assistant core

use thiserror::Error;

/// Result type alias for Orion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Listening-gate persistence error
    #[error("gate error: {0}")]
    Gate(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Routing classifier error
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Module handler error
    #[error("handler error: {0}")]
    Handler(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
