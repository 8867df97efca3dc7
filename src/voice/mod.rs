//! Voice processing
//!
//! Microphone capture, utterance segmentation, transcription, the
//! background capture loop, and the speech-output session. The capture
//! loop and output session contain the turn-taking logic (wake-word
//! gating, barge-in); everything else is plumbing around the audio
//! devices and the cloud STT/TTS backends.

mod capture;
mod input;
mod listener;
mod output;
mod segmenter;
mod transcriber;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use input::{MicrophoneInput, SpeechInput};
pub use listener::{CaptureLoop, NO_MATCH_SENTINEL};
pub use output::{
    AudioSink, CloudSynthesizer, CpalSink, PlaybackControl, SpeechOutputSession, Synthesizer,
};
pub use segmenter::UtteranceSegmenter;
pub use transcriber::{RecognitionOutcome, Transcriber};
