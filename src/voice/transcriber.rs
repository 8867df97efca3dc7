//! Speech-to-text transcription
//!
//! Cloud transcription over WAV uploads, with the result folded into a
//! [`RecognitionOutcome`] so the capture loop never has to branch on
//! provider-specific errors.

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// What one capture attempt recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Transcribed speech
    Text(String),
    /// Audio contained no recognizable speech
    NoMatch,
    /// The transcription backend failed (network, API, decoding)
    BackendError(String),
}

#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug)]
enum SttProvider {
    Whisper,
    Deepgram,
}

/// Transcribes WAV audio to text
pub struct Transcriber {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
}

impl Transcriber {
    /// Create a transcriber backed by `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn whisper(api_key: SecretString, model: impl Into<String>) -> Result<Self> {
        Self::build(api_key, model.into(), SttProvider::Whisper)
    }

    /// Create a transcriber backed by Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn deepgram(api_key: SecretString, model: impl Into<String>) -> Result<Self> {
        Self::build(api_key, model.into(), SttProvider::Deepgram)
    }

    fn build(api_key: SecretString, model: String, provider: SttProvider) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!(
                "API key required for {provider:?} transcription"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider,
        })
    }

    /// Transcribe one utterance, folding failures into the outcome
    ///
    /// Empty or whitespace-only transcripts become [`RecognitionOutcome::NoMatch`];
    /// transport and API failures become [`RecognitionOutcome::BackendError`].
    pub async fn recognize(&self, wav: &[u8]) -> RecognitionOutcome {
        match self.transcribe(wav).await {
            Ok(text) if text.trim().is_empty() => RecognitionOutcome::NoMatch,
            Ok(text) => RecognitionOutcome::Text(text.trim().to_string()),
            Err(e) => RecognitionOutcome::BackendError(e.to_string()),
        }
    }

    /// Raw transcription
    ///
    /// # Errors
    ///
    /// Returns error if the request or response decoding fails
    pub async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(wav).await,
            SttProvider::Deepgram => self.transcribe_deepgram(wav).await,
        }
    }

    async fn transcribe_whisper(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::debug!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    async fn transcribe_deepgram(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(wav.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;
        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::debug!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}
