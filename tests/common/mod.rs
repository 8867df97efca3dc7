//! Shared test doubles
//!
//! Fakes for the audio and recognition boundaries so turn-taking can be
//! exercised without microphones, speakers, or network access.

// Not every test binary uses every fake.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use orion_assistant::voice::{
    AudioSink, PlaybackControl, RecognitionOutcome, SpeechInput, SpeechOutputSession, Synthesizer,
};
use orion_assistant::{GateState, ListeningGate, Result};

/// Synthesizer returning a fixed buffer of silence-ish samples
pub struct FakeSynthesizer;

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1; 2400])
    }
}

/// Synthesizer that always fails, for backend-failure tests
pub struct FailingSynthesizer;

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<f32>> {
        Err(orion_assistant::Error::Tts("backend exploded".to_string()))
    }
}

/// Sink that "plays" in small sleep steps, honoring cancel and pause
pub struct FakeSink {
    steps: usize,
    step: Duration,
    pub plays: AtomicUsize,
}

impl FakeSink {
    /// A sink that finishes quickly on its own
    pub fn quick() -> Self {
        Self::with_steps(2)
    }

    /// A sink that plays long enough for tests to interrupt it
    pub fn slow() -> Self {
        Self::with_steps(500)
    }

    fn with_steps(steps: usize) -> Self {
        Self {
            steps,
            step: Duration::from_millis(10),
            plays: AtomicUsize::new(0),
        }
    }
}

impl AudioSink for FakeSink {
    fn play(&self, _samples: Vec<f32>, control: Arc<PlaybackControl>) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.steps {
            if control.is_cancelled() {
                return Ok(());
            }
            if !control.is_paused() {
                std::thread::sleep(self.step);
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }
}

/// Speech input that replays a script, then idles forever
pub struct ScriptedInput {
    script: VecDeque<RecognitionOutcome>,
}

impl ScriptedInput {
    pub fn new(script: Vec<RecognitionOutcome>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| RecognitionOutcome::Text((*t).to_string()))
                .collect(),
        )
    }
}

#[async_trait(?Send)]
impl SpeechInput for ScriptedInput {
    async fn capture_one(&mut self) -> RecognitionOutcome {
        match self.script.pop_front() {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

/// A gate file in a fresh temp dir, pre-set to the given state
pub fn gate_with_state(dir: &tempfile::TempDir, state: GateState) -> ListeningGate {
    let gate = ListeningGate::new(dir.path().join("gate"));
    gate.write(state).expect("failed to seed gate state");
    gate
}

/// Session over fakes; `slow` controls how long playback takes
pub fn fake_session(slow: bool) -> (SpeechOutputSession, Arc<FakeSink>) {
    let sink = Arc::new(if slow {
        FakeSink::slow()
    } else {
        FakeSink::quick()
    });
    let session = SpeechOutputSession::new(
        Arc::new(FakeSynthesizer),
        Arc::clone(&sink) as Arc<dyn AudioSink>,
    );
    (session, sink)
}

/// Poll until the condition holds or the deadline passes
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
