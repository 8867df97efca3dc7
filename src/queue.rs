//! Utterance hand-off queue
//!
//! Ordered, unbounded, multi-producer/single-consumer channel carrying
//! accepted transcriptions from the capture worker to the control loop.
//! The producer may run on a different scheduling context than the
//! consumer; enqueue never blocks and reliably wakes a blocked `recv`.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// An accepted transcription in flight to the consumer
///
/// Immutable once created; ownership transfers on enqueue and the value is
/// consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Transcribed text (or a recognition-failure sentinel)
    pub text: String,
    /// When the capture worker accepted the utterance
    pub captured_at: DateTime<Utc>,
}

impl Utterance {
    /// Create an utterance stamped with the current time
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Utc::now(),
        }
    }
}

/// Producer half of the utterance queue
#[derive(Debug, Clone)]
pub struct UtteranceSender {
    tx: mpsc::UnboundedSender<Utterance>,
}

impl UtteranceSender {
    /// Enqueue an utterance for the consumer
    ///
    /// Never blocks. A closed queue (consumer gone) is logged rather than
    /// dropped silently.
    pub fn send(&self, utterance: Utterance) {
        if let Err(e) = self.tx.send(utterance) {
            tracing::warn!(text = %e.0.text, "utterance dropped: consumer is gone");
        }
    }
}

/// Consumer half of the utterance queue
#[derive(Debug)]
pub struct UtteranceReceiver {
    rx: mpsc::UnboundedReceiver<Utterance>,
}

impl UtteranceReceiver {
    /// Dequeue the next utterance, suspending until one arrives
    ///
    /// Returns `None` once every producer has been dropped.
    pub async fn recv(&mut self) -> Option<Utterance> {
        self.rx.recv().await
    }
}

/// Create a connected utterance queue
#[must_use]
pub fn channel() -> (UtteranceSender, UtteranceReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UtteranceSender { tx }, UtteranceReceiver { rx })
}
