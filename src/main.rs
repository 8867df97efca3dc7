use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orion_assistant::dispatch::Dispatcher;
use orion_assistant::handlers::{
    ChatHandler, CommandSkill, LocationHandler, RealtimeClient, SearchHandler, SystemCommandHandler,
    TimeHandler, WeatherHandler,
};
use orion_assistant::voice::{
    AudioSink, CaptureLoop, CloudSynthesizer, CpalSink, MicrophoneInput, SpeechOutputSession,
    Synthesizer, Transcriber,
};
use orion_assistant::{
    ChatCompletionsClassifier, Config, Error, ListeningGate, Module, Result, Runtime, queue,
};

/// Orion - voice-driven assistant
#[derive(Parser)]
#[command(name = "orion", version, about)]
struct Cli {
    /// Path to a config file (defaults to the platform config dir)
    #[arg(short, long, env = "ORION_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the assistant (default)
    Run,
    /// Control the persisted listening gate
    Gate {
        #[command(subcommand)]
        action: GateAction,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is Orion's text to speech test.")]
        text: String,
    },
}

#[derive(Subcommand)]
enum GateAction {
    /// Arm the gate: wait for a wake phrase
    Arm,
    /// Force the gate off
    Stop,
    /// Print the current gate state
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,orion_assistant=info",
        1 => "info,orion_assistant=debug",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_assistant(config).await,
        Command::Gate { action } => gate_command(&config, &action),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker(),
        Command::TestTts { text } => test_tts(&config, &text).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

/// Wire up and run the full assistant
async fn run_assistant(config: Config) -> Result<()> {
    let gate = ListeningGate::new(config.gate_path.clone());
    let output = SpeechOutputSession::new(build_synthesizer(&config)?, Arc::new(CpalSink::new()?));

    let (sender, receiver) = queue::channel();

    let classifier = Arc::new(ChatCompletionsClassifier::new(
        config.classifier.base_url.clone(),
        config.keys.require("groq")?,
        config.classifier.model.clone(),
        config.classifier.temperature,
    )?);

    let runtime = Runtime::new(
        receiver,
        classifier,
        build_dispatcher(&config)?,
        output.clone(),
    );
    let mut consumer = tokio::spawn(runtime.run());

    let input = MicrophoneInput::new(build_transcriber(&config)?)?;
    let capture = CaptureLoop::new(
        input,
        gate.clone(),
        output,
        sender,
        config.wake_phrases.clone(),
    );

    // Ctrl-C requests a cooperative capture-loop stop
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    tracing::info!(gate = %gate.read(), "assistant started");

    // The capture loop holds the (non-Send) microphone stream, so it runs
    // on this task while the consumer runs concurrently.
    let capture_ended_first = tokio::select! {
        () = capture.run(&mut shutdown_rx) => true,
        _ = &mut consumer => false,
    };

    if capture_ended_first {
        // Capture loop gone -> queue senders dropped -> consumer drains out
        let _ = tokio::time::timeout(Duration::from_secs(5), consumer).await;
    }

    tracing::info!("assistant stopped");
    Ok(())
}

/// Build the dispatcher with every module handler registered
fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let realtime = Arc::new(RealtimeClient::new());

    let groq = config.keys.require("groq")?;
    let chat = ChatHandler::new(
        config.chat.base_url.clone(),
        groq,
        config.chat.model.clone(),
        config.chat.temperature,
        config.chat_history_path(),
    )?;

    let mut dispatcher =
        Dispatcher::with_timeout(Duration::from_secs(config.handler_timeout_secs));
    dispatcher.register(Module::Chatbot, Arc::new(chat));
    dispatcher.register(
        Module::Weather,
        Arc::new(WeatherHandler::new(Arc::clone(&realtime))),
    );
    dispatcher.register(
        Module::Time,
        Arc::new(TimeHandler::new(Arc::clone(&realtime))),
    );
    dispatcher.register(Module::Location, Arc::new(LocationHandler::new(realtime)));
    dispatcher.register(Module::Search, Arc::new(SearchHandler::new()?));
    dispatcher.register(Module::SystemCommands, Arc::new(SystemCommandHandler::new()));
    dispatcher.register(
        Module::SkillMusic,
        Arc::new(CommandSkill::new("music", config.skills.music.clone())),
    );
    dispatcher.register(
        Module::SkillHome,
        Arc::new(CommandSkill::new("home", config.skills.home.clone())),
    );
    dispatcher.register(
        Module::SkillStudy,
        Arc::new(CommandSkill::new("study", config.skills.study.clone())),
    );

    Ok(dispatcher)
}

/// Build the configured STT backend
fn build_transcriber(config: &Config) -> Result<Transcriber> {
    match config.voice.stt_provider.as_str() {
        "whisper" => Transcriber::whisper(
            config.keys.require("openai")?,
            config.voice.stt_model.clone(),
        ),
        "deepgram" => Transcriber::deepgram(
            config.keys.require("deepgram")?,
            config.voice.stt_model.clone(),
        ),
        other => Err(Error::Config(format!("unknown STT provider: {other}"))),
    }
}

/// Build the configured TTS backend
fn build_synthesizer(config: &Config) -> Result<Arc<dyn Synthesizer>> {
    let synthesizer: Arc<dyn Synthesizer> = match config.voice.tts_provider.as_str() {
        "openai" => Arc::new(CloudSynthesizer::openai(
            config.keys.require("openai")?,
            config.voice.tts_voice.clone(),
            config.voice.tts_speed,
            config.voice.tts_model.clone(),
        )?),
        "elevenlabs" => Arc::new(CloudSynthesizer::elevenlabs(
            config.keys.require("elevenlabs")?,
            config.voice.tts_voice.clone(),
            config.voice.tts_model.clone(),
        )?),
        other => return Err(Error::Config(format!("unknown TTS provider: {other}"))),
    };
    Ok(synthesizer)
}

/// Inspect or mutate the shared listening gate
fn gate_command(config: &Config, action: &GateAction) -> Result<()> {
    let gate = ListeningGate::new(config.gate_path.clone());
    match action {
        GateAction::Arm => {
            gate.arm()?;
            println!("gate armed");
        }
        GateAction::Stop => {
            gate.stop()?;
            println!("gate off");
        }
        GateAction::Status => println!("{}", gate.read()),
    }
    Ok(())
}

/// Capture from the microphone for a few seconds and report levels
async fn test_mic(duration: u64) -> Result<()> {
    use orion_assistant::voice::AudioCapture;

    let mut capture = AudioCapture::new()?;
    capture.start()?;
    println!("recording for {duration}s...");
    tokio::time::sleep(Duration::from_secs(duration)).await;

    let samples = capture.take_buffer();
    capture.stop();

    #[allow(clippy::cast_precision_loss)]
    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    };
    println!("captured {} samples, RMS level {rms:.4}", samples.len());
    Ok(())
}

/// Play a short test tone
fn test_speaker() -> Result<()> {
    let sink = CpalSink::new()?;
    let samples: Vec<f32> = (0..24000)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / 24000.0;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    println!("playing test tone...");
    sink.play(samples, Arc::new(orion_assistant::voice::PlaybackControl::default()))?;
    Ok(())
}

/// Synthesize and speak one line
async fn test_tts(config: &Config, text: &str) -> Result<()> {
    let output = SpeechOutputSession::new(build_synthesizer(config)?, Arc::new(CpalSink::new()?));
    println!("speaking: {text}");
    output.speak(text).await;
    Ok(())
}
