//! Configuration management
//!
//! Settings come from an optional TOML file (defaults apply when absent)
//! plus environment variables for secrets. The gate file and chat history
//! live under the platform data directory unless overridden.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::{Error, Result};

/// Default classifier/chat endpoint (OpenAI-compatible)
const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Phrases that open the listening gate
    pub wake_phrases: Vec<String>,

    /// Path to the persisted listening-gate file
    pub gate_path: PathBuf,

    /// Data directory (chat history, caches)
    pub data_dir: PathBuf,

    /// Voice pipeline settings
    pub voice: VoiceConfig,

    /// Routing classifier settings
    pub classifier: LlmConfig,

    /// Conversational model settings
    pub chat: LlmConfig,

    /// Per-handler deadline in seconds
    pub handler_timeout_secs: u64,

    /// Custom skill command templates
    pub skills: SkillsConfig,

    /// API keys from the environment
    pub keys: ApiKeys,
}

/// Voice pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// STT provider: "whisper" or "deepgram"
    pub stt_provider: String,
    /// STT model identifier
    pub stt_model: String,
    /// TTS provider: "openai" or "elevenlabs"
    pub tts_provider: String,
    /// TTS model identifier
    pub tts_model: String,
    /// TTS voice identifier
    pub tts_voice: String,
    /// TTS speed multiplier
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_provider: "whisper".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_provider: "openai".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// One chat-completions model endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: "gemma2-9b-it".to_string(),
            temperature: 1.0,
        }
    }
}

/// Custom skill command templates; `{query}` is substituted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// CUSTOM_SKILL_MUSIC command
    pub music: Option<String>,
    /// CUSTOM_SKILL_HOME command
    pub home: Option<String>,
    /// CUSTOM_SKILL_STUDY command
    pub study: Option<String>,
}

/// API keys, loaded from the environment only
#[derive(Debug, Clone)]
pub struct ApiKeys {
    /// `GROQ_API_KEY` - classifier and chat
    pub groq: Option<SecretString>,
    /// `OPENAI_API_KEY` - Whisper STT and OpenAI TTS
    pub openai: Option<SecretString>,
    /// `DEEPGRAM_API_KEY` - Deepgram STT
    pub deepgram: Option<SecretString>,
    /// `ELEVENLABS_API_KEY` - ElevenLabs TTS
    pub elevenlabs: Option<SecretString>,
}

impl ApiKeys {
    fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().map(SecretString::from);
        Self {
            groq: read("GROQ_API_KEY"),
            openai: read("OPENAI_API_KEY"),
            deepgram: read("DEEPGRAM_API_KEY"),
            elevenlabs: read("ELEVENLABS_API_KEY"),
        }
    }

    /// Require a key by config name
    ///
    /// # Errors
    ///
    /// Returns error if the key is not set
    pub fn require(&self, name: &str) -> Result<SecretString> {
        let key = match name {
            "groq" => &self.groq,
            "openai" => &self.openai,
            "deepgram" => &self.deepgram,
            "elevenlabs" => &self.elevenlabs,
            _ => &None,
        };
        key.clone().ok_or_else(|| {
            Error::Config(format!(
                "{} API key not set (export {}_API_KEY)",
                name,
                name.to_uppercase()
            ))
        })
    }
}

/// On-disk layout of the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    wake_phrases: Option<Vec<String>>,
    gate_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    voice: VoiceConfig,
    classifier: Option<LlmConfig>,
    chat: Option<LlmConfig>,
    handler_timeout_secs: Option<u64>,
    skills: SkillsConfig,
}

/// Default settings for the conversational model
fn default_chat_llm() -> LlmConfig {
    LlmConfig {
        model: "llama-3.3-70b-versatile".to_string(),
        temperature: 0.84,
        ..LlmConfig::default()
    }
}

impl Config {
    /// Load configuration, optionally from an explicit file path
    ///
    /// Without a path, `orion.toml` in the platform config directory is
    /// used when present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if an existing config file cannot be read or parsed
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let dirs = directories::ProjectDirs::from("dev", "orion", "orion");

        let config_path = path.map_or_else(
            || dirs.as_ref().map(|d| d.config_dir().join("orion.toml")),
            |p| Some(p.to_path_buf()),
        );

        let file: FileConfig = match &config_path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                let parsed = toml::from_str(&content)?;
                tracing::debug!(path = %p.display(), "config file loaded");
                parsed
            }
            Some(p) if path.is_some() => {
                return Err(Error::Config(format!("config file not found: {}", p.display())));
            }
            _ => FileConfig::default(),
        };

        let data_dir = file.data_dir.unwrap_or_else(|| {
            dirs.as_ref()
                .map_or_else(|| PathBuf::from("."), |d| d.data_dir().to_path_buf())
        });
        std::fs::create_dir_all(&data_dir).ok();

        let gate_path = file
            .gate_path
            .unwrap_or_else(|| data_dir.join("listening-gate"));

        Ok(Self {
            wake_phrases: file
                .wake_phrases
                .unwrap_or_else(|| vec!["orion".to_string(), "hey orion".to_string()]),
            gate_path,
            data_dir,
            voice: file.voice,
            classifier: file.classifier.unwrap_or_default(),
            chat: file.chat.unwrap_or_else(default_chat_llm),
            handler_timeout_secs: file.handler_timeout_secs.unwrap_or(30),
            skills: file.skills,
            keys: ApiKeys::from_env(),
        })
    }

    /// Path of the chat history file
    #[must_use]
    pub fn chat_history_path(&self) -> PathBuf {
        self.data_dir.join("chat-history.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_parses_partial_toml() {
        let parsed: FileConfig = toml::from_str(
            r#"
            wake_phrases = ["jarvis"]

            [voice]
            stt_provider = "deepgram"
            stt_model = "nova-2"

            [skills]
            music = "mpc {query}"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.wake_phrases.unwrap(), vec!["jarvis"]);
        assert_eq!(parsed.voice.stt_provider, "deepgram");
        // Unspecified fields keep their defaults
        assert_eq!(parsed.voice.tts_provider, "openai");
        assert_eq!(parsed.skills.music.unwrap(), "mpc {query}");
        assert!(parsed.skills.home.is_none());
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let parsed: FileConfig = toml::from_str("").unwrap();
        assert!(parsed.wake_phrases.is_none());
        assert!(parsed.classifier.is_none());
        assert_eq!(parsed.voice.stt_model, "whisper-1");
    }

    #[test]
    fn chat_defaults_differ_from_classifier_defaults() {
        let chat = default_chat_llm();
        assert_eq!(chat.model, "llama-3.3-70b-versatile");
        assert_eq!(chat.base_url, DEFAULT_LLM_BASE_URL);
    }
}
