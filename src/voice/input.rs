//! Speech-input boundary
//!
//! One call, one recognition attempt. The microphone implementation
//! assembles capture, segmentation, and transcription; tests script the
//! trait directly. cpal streams are not `Send`, so the trait is
//! `?Send` and the capture loop runs on a thread of its own (the same
//! arrangement the daemon uses for its voice loop).

use std::time::Duration;

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::segmenter::UtteranceSegmenter;
use super::transcriber::{RecognitionOutcome, Transcriber};
use crate::Result;

/// How often the microphone buffer is drained into the segmenter
const CAPTURE_POLL: Duration = Duration::from_millis(100);

/// Produces one recognized utterance per call
#[async_trait(?Send)]
pub trait SpeechInput {
    /// Capture until one utterance completes, then recognize it
    ///
    /// Suspends as long as nobody is speaking. Recognition failures are
    /// folded into the outcome; this never errors.
    async fn capture_one(&mut self) -> RecognitionOutcome;
}

/// Microphone-backed speech input
pub struct MicrophoneInput {
    capture: AudioCapture,
    segmenter: UtteranceSegmenter,
    transcriber: Transcriber,
}

impl MicrophoneInput {
    /// Open the default microphone
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened
    pub fn new(transcriber: Transcriber) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            segmenter: UtteranceSegmenter::new(),
            transcriber,
        })
    }
}

#[async_trait(?Send)]
impl SpeechInput for MicrophoneInput {
    async fn capture_one(&mut self) -> RecognitionOutcome {
        if let Err(e) = self.capture.start() {
            return RecognitionOutcome::BackendError(e.to_string());
        }

        let segment = loop {
            tokio::time::sleep(CAPTURE_POLL).await;
            let chunk = self.capture.take_buffer();
            if let Some(segment) = self.segmenter.push(&chunk) {
                break segment;
            }
        };

        let wav = match samples_to_wav(&segment, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return RecognitionOutcome::BackendError(e.to_string()),
        };

        self.transcriber.recognize(&wav).await
    }
}
