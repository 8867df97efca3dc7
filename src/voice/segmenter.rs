//! Energy-based utterance segmentation
//!
//! Splits the raw capture stream into whole utterances: speech starts
//! when RMS energy crosses the threshold, and ends after enough trailing
//! silence. Wake-phrase matching happens on the transcribed *text* in the
//! capture loop, not here.

/// Minimum RMS energy considered speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length for a usable utterance (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    Idle,
    Speech,
}

/// Accumulates capture chunks into complete utterances
pub struct UtteranceSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl UtteranceSegmenter {
    /// Create an idle segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples; returns a complete utterance when one ends
    ///
    /// Too-short bursts (door slams, coughs) are discarded once the
    /// trailing silence confirms they never became speech.
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let is_speech = rms_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!("speech started");
                }
                None
            }
            SegmenterState::Speech => {
                self.buffer.extend_from_slice(samples);
                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    // Trailing silence does not count toward the minimum
                    let speech_len = self.buffer.len().saturating_sub(self.silence_counter);
                    let utterance = std::mem::take(&mut self.buffer);
                    self.reset();

                    if speech_len > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = utterance.len(), "utterance segment complete");
                        return Some(utterance);
                    }
                    tracing::trace!(samples = speech_len, "segment too short, discarded");
                }
                None
            }
        }
    }

    /// Drop any partial segment and return to idle
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.silence_counter = 0;
    }
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS energy of a sample chunk
#[allow(clippy::cast_precision_loss)]
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
