//! Turn-taking integration tests
//!
//! Exercise the capture loop and speech-output session against scripted
//! fakes - no audio hardware or network involved.

use std::time::Duration;

use orion_assistant::voice::{CaptureLoop, RecognitionOutcome, SpeechOutputSession};
use orion_assistant::{GateState, queue};

mod common;

use common::{ScriptedInput, fake_session, gate_with_state, wait_until};

/// Run a capture loop over a script, stopping it after `run_for`
///
/// Returns the receiver alongside a live producer handle. The loop owns
/// its own clone of the sender and drops it on exit; without this retained
/// handle the channel would close when `run` returns, making `recv()` on an
/// empty queue resolve to `None` immediately instead of staying pending.
async fn run_capture(
    input: ScriptedInput,
    gate: &orion_assistant::ListeningGate,
    session: SpeechOutputSession,
    wake_phrases: &[&str],
    run_for: Duration,
) -> (queue::UtteranceReceiver, queue::UtteranceSender) {
    let (sender, receiver) = queue::channel();
    let capture = CaptureLoop::new(
        input,
        gate.clone(),
        session,
        sender.clone(),
        wake_phrases.iter().map(|p| (*p).to_string()).collect(),
    );

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        tokio::time::sleep(run_for).await;
        let _ = shutdown_tx.send(()).await;
    });

    capture.run(&mut shutdown_rx).await;
    (receiver, sender)
}

#[tokio::test]
async fn gate_off_only_wake_phrase_opens() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Off);
    let (session, _) = fake_session(false);

    let input = ScriptedInput::texts(&["hello", "orion"]);
    let (mut receiver, _producer) = run_capture(
        input,
        &gate,
        session,
        &["orion"],
        Duration::from_millis(150),
    )
    .await;

    // "hello" discarded, "orion" consumed as the wake trigger only
    assert_eq!(gate.read(), GateState::Active);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), receiver.recv())
            .await
            .is_err(),
        "queue must stay empty"
    );
}

#[tokio::test]
async fn gate_active_enqueues_everything_including_wake_phrase() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Active);
    let (session, _) = fake_session(false);

    let input = ScriptedInput::texts(&["what time is it", "orion"]);
    let (mut receiver, _producer) = run_capture(
        input,
        &gate,
        session,
        &["orion"],
        Duration::from_millis(150),
    )
    .await;

    assert_eq!(receiver.recv().await.unwrap().text, "what time is it");
    // No special-cased re-arming: the wake phrase is an ordinary utterance now
    assert_eq!(receiver.recv().await.unwrap().text, "orion");
}

#[tokio::test]
async fn armed_gate_behaves_like_off_for_wake_matching() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Armed);
    let (session, _) = fake_session(false);

    let input = ScriptedInput::texts(&["not the phrase", "Hey Orion!"]);
    let (_receiver, _producer) = run_capture(
        input,
        &gate,
        session,
        &["hey orion"],
        Duration::from_millis(150),
    )
    .await;

    assert_eq!(gate.read(), GateState::Active);
}

#[tokio::test]
async fn recognition_failures_become_sentinels_while_active() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Active);
    let (session, _) = fake_session(false);

    let input = ScriptedInput::new(vec![
        RecognitionOutcome::NoMatch,
        RecognitionOutcome::BackendError("socket closed".to_string()),
    ]);
    let (mut receiver, _producer) = run_capture(input, &gate, session, &["orion"], Duration::from_millis(150))
        .await;

    assert_eq!(
        receiver.recv().await.unwrap().text,
        "Sorry, I didn't catch that."
    );
    assert!(receiver.recv().await.unwrap().text.contains("socket closed"));
}

#[tokio::test]
async fn recognition_failures_are_discarded_while_off() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Off);
    let (session, _) = fake_session(false);

    let input = ScriptedInput::new(vec![RecognitionOutcome::NoMatch]);
    let (mut receiver, _producer) = run_capture(input, &gate, session, &["orion"], Duration::from_millis(150))
        .await;

    assert_eq!(gate.read(), GateState::Off);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), receiver.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn barge_in_cancels_playback_and_still_processes_utterance() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Active);
    let (session, _sink) = fake_session(true);

    // Assistant starts talking
    let speaker = {
        let session = session.clone();
        tokio::spawn(async move { session.speak("a very long reply").await })
    };
    assert!(
        wait_until(Duration::from_secs(1), || session.is_active()).await,
        "playback never became active"
    );

    // User talks over it
    let input = ScriptedInput::texts(&["never mind, stop"]);
    let (mut receiver, _producer) = run_capture(
        input,
        &gate,
        session.clone(),
        &["orion"],
        Duration::from_millis(300),
    )
    .await;

    // Playback cancelled within the bounded window, utterance kept
    assert!(wait_until(Duration::from_millis(500), || !session.is_active()).await);
    assert_eq!(receiver.recv().await.unwrap().text, "never mind, stop");

    speaker.await.unwrap();
}

#[tokio::test]
async fn sentinel_does_not_trigger_barge_in() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_with_state(&dir, GateState::Active);
    let (session, _sink) = fake_session(true);

    let speaker = {
        let session = session.clone();
        tokio::spawn(async move { session.speak("talking").await })
    };
    assert!(wait_until(Duration::from_secs(1), || session.is_active()).await);

    let input = ScriptedInput::new(vec![RecognitionOutcome::NoMatch]);
    let (_receiver, _producer) = run_capture(
        input,
        &gate,
        session.clone(),
        &["orion"],
        Duration::from_millis(100),
    )
    .await;

    // NoMatch is not user speech: playback continues
    assert!(session.is_active());

    session.stop();
    speaker.await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent_when_inactive() {
    let (session, _) = fake_session(false);

    assert!(!session.is_active());
    session.stop();
    session.stop();
    assert!(!session.is_active());
}

#[tokio::test]
async fn pause_and_resume_are_noops_when_inactive() {
    let (session, _) = fake_session(false);

    session.pause();
    session.resume();
    assert!(!session.is_active());
}

#[tokio::test]
async fn stop_cancels_within_bounded_window() {
    let (session, _sink) = fake_session(true);

    let speaker = {
        let session = session.clone();
        tokio::spawn(async move { session.speak("several sentences of reply").await })
    };
    assert!(wait_until(Duration::from_secs(1), || session.is_active()).await);

    let before = tokio::time::Instant::now();
    session.stop();
    assert!(
        wait_until(Duration::from_millis(500), || !session.is_active()).await,
        "cancellation exceeded the bounded window"
    );
    assert!(before.elapsed() < Duration::from_secs(1));

    speaker.await.unwrap();
}

#[tokio::test]
async fn playback_backend_failure_leaves_session_inactive() {
    use common::{FailingSynthesizer, FakeSink};
    use std::sync::Arc;

    let session = SpeechOutputSession::new(
        Arc::new(FailingSynthesizer),
        Arc::new(FakeSink::quick()) as Arc<dyn orion_assistant::AudioSink>,
    );

    // Never panics, never propagates, ends inactive
    session.speak("does not matter").await;
    assert!(!session.is_active());
}

#[tokio::test]
async fn empty_reply_is_not_spoken() {
    let (session, sink) = fake_session(false);

    session.speak("   ").await;
    assert_eq!(sink.plays.load(std::sync::atomic::Ordering::SeqCst), 0);
}
