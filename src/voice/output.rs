//! Speech output session
//!
//! Owns the audio-output device while speaking. `speak` blocks until
//! playback completes or is cancelled; `stop` is safe to call from any
//! other task or thread and takes effect within the sink's polling
//! granularity, not the sentence length. Backend failures are logged and
//! fold back to "session ended"; they never reach the caller.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Granularity (ms) at which cancellation and completion are observed
const POLL_INTERVAL_MS: u64 = 50;

/// Synthesizes text into playable mono f32 samples
///
/// The offline/cloud split lives behind this trait: any backend that can
/// produce samples satisfies the same session contract.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize one reply
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>>;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    OpenAi,
    ElevenLabs,
}

/// Cloud TTS over the `OpenAI` or ElevenLabs APIs
pub struct CloudSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl CloudSynthesizer {
    /// Create an `OpenAI` TTS synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn openai(
        api_key: SecretString,
        voice: impl Into<String>,
        speed: f32,
        model: impl Into<String>,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: voice.into(),
            speed,
            model: model.into(),
            provider: TtsProvider::OpenAi,
        })
    }

    /// Create an ElevenLabs synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn elevenlabs(
        api_key: SecretString,
        voice_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: voice_id.into(),
            speed: 1.0,
            model: model.into(),
            provider: TtsProvider::ElevenLabs,
        })
    }

    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "speed": self.speed,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice);
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model,
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Synthesizer for CloudSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        let mp3 = match self.provider {
            TtsProvider::OpenAi => self.synthesize_openai(text).await?,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await?,
        };
        decode_mp3(&mp3)
    }
}

/// Shared cancel/pause flags observed by the active sink
#[derive(Debug, Default)]
pub struct PlaybackControl {
    cancel: AtomicBool,
    paused: AtomicBool,
}

impl PlaybackControl {
    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Whether playback is currently suspended
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}

/// Plays decoded samples, honoring the playback control flags
///
/// `play` blocks its thread; the session always runs it on a blocking
/// task. Implementations must observe cancellation within a bounded
/// interval and must not deadlock against concurrent `stop` calls.
pub trait AudioSink: Send + Sync {
    /// Play samples to completion, pause-aware and cancellable
    ///
    /// # Errors
    ///
    /// Returns error if the output backend fails
    fn play(&self, samples: Vec<f32>, control: Arc<PlaybackControl>) -> Result<()>;
}

/// Speaker output via cpal
pub struct CpalSink {
    config: StreamConfig,
}

impl CpalSink {
    /// Probe the default output device for a usable configuration
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "speaker output initialized"
        );

        Ok(Self { config })
    }
}

impl AudioSink for CpalSink {
    fn play(&self, samples: Vec<f32>, control: Arc<PlaybackControl>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;
        let total = samples.len();

        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);
        let cb_control = Arc::clone(&control);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        // Paused: emit silence without consuming the buffer
                        if cb_control.is_paused() {
                            frame.fill(0.0);
                            continue;
                        }

                        let pos = cb_position.load(Ordering::Relaxed);
                        let sample = if pos < total {
                            cb_position.store(pos + 1, Ordering::Relaxed);
                            samples[pos]
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        frame.fill(sample);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "speaker stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Poll for completion; the timeout only advances while unpaused so
        // a long pause cannot be mistaken for a stalled device.
        let expected_ms = (total as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let mut elapsed_ms: u64 = 0;
        let completed = loop {
            if finished.load(Ordering::Relaxed) {
                break true;
            }
            if control.is_cancelled() {
                tracing::debug!("playback cancelled");
                break false;
            }
            if elapsed_ms > expected_ms + 500 {
                tracing::warn!("playback did not finish in time, abandoning");
                break false;
            }
            std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            if !control.is_paused() {
                elapsed_ms += POLL_INTERVAL_MS;
            }
        };

        if completed {
            // Let the device drain the last buffer
            std::thread::sleep(Duration::from_millis(100));
        }

        drop(stream);
        tracing::debug!(samples = total, completed, "playback ended");
        Ok(())
    }
}

struct SessionInner {
    active: AtomicBool,
    control: Arc<PlaybackControl>,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
}

/// Tracks and drives in-progress speech synthesis
///
/// Cheap to clone; all clones observe the same session state, so the
/// capture loop can check `is_active` and request `stop` while the
/// control loop is blocked inside `speak`.
#[derive(Clone)]
pub struct SpeechOutputSession {
    inner: Arc<SessionInner>,
}

impl SpeechOutputSession {
    /// Create a session over a synthesizer and an output sink
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                active: AtomicBool::new(false),
                control: Arc::new(PlaybackControl::default()),
                synthesizer,
                sink,
            }),
        }
    }

    /// Whether playback is currently in progress
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Speak a reply, blocking until playback completes or is cancelled
    ///
    /// Backend failures are logged and swallowed: the session always ends
    /// inactive with its cancel flag cleared, whatever happened.
    pub async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        if let Err(e) = self.speak_inner(text).await {
            tracing::error!(error = %e, "speech output failed");
        }

        self.inner.control.clear();
        self.inner.active.store(false, Ordering::SeqCst);
    }

    async fn speak_inner(&self, text: &str) -> Result<()> {
        tracing::debug!(chars = text.len(), "synthesizing reply");
        let samples = self.inner.synthesizer.synthesize(text).await?;

        self.inner.active.store(true, Ordering::SeqCst);

        let sink = Arc::clone(&self.inner.sink);
        let control = Arc::clone(&self.inner.control);
        tokio::task::spawn_blocking(move || sink.play(samples, control))
            .await
            .map_err(|e| Error::Tts(format!("playback task failed: {e}")))?
    }

    /// Request immediate cancellation of in-flight playback
    ///
    /// No-op while inactive; calling it repeatedly is safe.
    pub fn stop(&self) {
        if self.is_active() {
            self.inner.control.request_cancel();
            tracing::debug!("speech output cancellation requested");
        }
    }

    /// Suspend in-flight playback without discarding the buffer
    ///
    /// No-op while inactive.
    pub fn pause(&self) {
        if self.is_active() {
            self.inner.control.set_paused(true);
        }
    }

    /// Continue suspended playback
    ///
    /// No-op if playback is not paused.
    pub fn resume(&self) {
        self.inner.control.set_paused(false);
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Tts(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_clear_resets_both_flags() {
        let control = PlaybackControl::default();
        control.request_cancel();
        control.set_paused(true);
        assert!(control.is_cancelled());
        assert!(control.is_paused());

        control.clear();
        assert!(!control.is_cancelled());
        assert!(!control.is_paused());
    }
}
