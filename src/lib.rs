//! Orion Assistant - voice-driven assistant core
//!
//! This library provides the turn-taking and command-dispatch engine for
//! a voice assistant:
//! - Background audio capture with wake-phrase gating and barge-in
//! - Routing of classifier output into typed module commands
//! - Two-pass dispatch with per-handler isolation
//! - Speech output with bounded cancellation
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  Capture worker                       │
//! │  Microphone → Segmenter → STT → Gate/Barge-in check   │
//! └──────────────────────┬────────────────────────────────┘
//!                        │ UtteranceQueue
//! ┌──────────────────────▼────────────────────────────────┐
//! │                  Control loop                         │
//! │  Classifier → RoutingParser → Dispatcher → Handlers   │
//! └──────────────────────┬────────────────────────────────┘
//!                        │ reply
//! ┌──────────────────────▼────────────────────────────────┐
//! │              SpeechOutputSession                      │
//! │  TTS → Speaker (stop / pause / resume / barge-in)     │
//! └───────────────────────────────────────────────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod queue;
pub mod routing;
pub mod runtime;
pub mod voice;

pub use classifier::{ChatCompletionsClassifier, Classifier};
pub use config::Config;
pub use dispatch::{DispatchOutcome, DispatchResult, Dispatcher, Handler, Outcome};
pub use error::{Error, Result};
pub use gate::{GateState, ListeningGate};
pub use queue::{Utterance, UtteranceReceiver, UtteranceSender};
pub use routing::{Module, RoutingCommand, parse_routing};
pub use runtime::Runtime;
pub use voice::{
    AudioSink, CaptureLoop, CloudSynthesizer, CpalSink, MicrophoneInput, RecognitionOutcome,
    SpeechInput, SpeechOutputSession, Synthesizer, Transcriber,
};
