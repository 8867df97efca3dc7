//! Background capture loop
//!
//! The turn-taking heart of the assistant. Runs continuously and
//! independently of the control loop; for every recognition outcome it
//! re-reads the persisted listening gate, arbitrates barge-in against the
//! speech-output session, and decides disposition: wake trigger, enqueue,
//! or discard.

use tokio::sync::mpsc;

use super::input::SpeechInput;
use super::output::SpeechOutputSession;
use super::transcriber::RecognitionOutcome;
use crate::gate::{GateState, ListeningGate};
use crate::queue::{Utterance, UtteranceSender};

/// Sentinel pushed when audio contained no recognizable speech
pub const NO_MATCH_SENTINEL: &str = "Sorry, I didn't catch that.";

/// Continuously captures, recognizes, and routes utterances
pub struct CaptureLoop<S> {
    input: S,
    gate: ListeningGate,
    output: SpeechOutputSession,
    queue: UtteranceSender,
    wake_phrases: Vec<String>,
}

impl<S: SpeechInput> CaptureLoop<S> {
    /// Create a capture loop
    ///
    /// Wake phrases are matched case-insensitively against the whole
    /// trimmed transcription (ignoring trailing punctuation the STT
    /// backend likes to add).
    #[must_use]
    pub fn new(
        input: S,
        gate: ListeningGate,
        output: SpeechOutputSession,
        queue: UtteranceSender,
        wake_phrases: Vec<String>,
    ) -> Self {
        let wake_phrases = wake_phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            input,
            gate,
            output,
            queue,
            wake_phrases,
        }
    }

    /// Run until a stop request arrives
    ///
    /// Stopping is cooperative: the current capture attempt is abandoned
    /// and the loop exits within one cycle, releasing the microphone when
    /// the input backend drops.
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self, shutdown: &mut mpsc::Receiver<()>) {
        tracing::info!(wake_phrases = ?self.wake_phrases, "capture loop started");

        loop {
            let outcome = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("capture loop stop requested");
                    break;
                }
                outcome = self.input.capture_one() => outcome,
            };
            self.dispose(outcome);
        }
    }

    /// Decide what happens to one recognition outcome
    ///
    /// The gate is re-read on every call: an external process may have
    /// flipped it since the previous cycle.
    fn dispose(&self, outcome: RecognitionOutcome) {
        let gate = self.gate.read();

        // Recognition failures become sentinel text so the consumer can
        // react, but only genuine speech counts for wake-up and barge-in.
        let (text, genuine) = match outcome {
            RecognitionOutcome::Text(t) => {
                let trimmed = t.trim().to_string();
                if trimmed.is_empty() {
                    (NO_MATCH_SENTINEL.to_string(), false)
                } else {
                    (trimmed, true)
                }
            }
            RecognitionOutcome::NoMatch => (NO_MATCH_SENTINEL.to_string(), false),
            RecognitionOutcome::BackendError(reason) => {
                tracing::warn!(reason = %reason, "recognition backend failed");
                (format!("Sorry, my hearing glitched: {reason}"), false)
            }
        };

        // Barge-in: the user spoke over the assistant. Cancel playback
        // first, then process the utterance normally - they interrupted
        // to say something.
        if genuine && self.output.is_active() {
            tracing::info!(text = %text, "barge-in detected, stopping speech output");
            self.output.stop();
        }

        match gate {
            GateState::Off | GateState::Armed => {
                if genuine && self.matches_wake_phrase(&text) {
                    tracing::info!(text = %text, "wake phrase recognized");
                    if let Err(e) = self.gate.activate() {
                        tracing::error!(error = %e, "failed to open listening gate");
                    }
                    // The wake utterance is consumed as the trigger only.
                } else {
                    tracing::trace!(text = %text, "discarded while gate closed");
                }
            }
            GateState::Active => {
                tracing::debug!(text = %text, "utterance accepted");
                self.queue.send(Utterance::new(text));
            }
        }
    }

    fn matches_wake_phrase(&self, text: &str) -> bool {
        let normalized = text
            .trim()
            .trim_end_matches(['.', ',', '!', '?'])
            .to_lowercase();
        self.wake_phrases.iter().any(|p| *p == normalized)
    }
}
