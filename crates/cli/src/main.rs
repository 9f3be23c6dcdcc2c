#![deny(warnings)]

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use virtusphere_avatar_core::chat::{
    ChatClient, ChatError, ChatReply, LocalChatClient, RagChatClient,
};
use virtusphere_avatar_core::config::{
    parse_speech_command, resolve_api_key, resolve_chat_endpoint, resolve_optional_string,
    AnimationConfig, AvatarConfig, BlinkInterval, ChatConfig, Env, FrameRate, SpeechBackend,
    SpeechRate, StdEnv, DEFAULT_BLINK_MAX_MS, DEFAULT_BLINK_MIN_MS, DEFAULT_EVENT_DETAILS,
    DEFAULT_FPS, DEFAULT_GRACE_MS, DEFAULT_SPEECH_RATE, ENV_API_KEY, ENV_SPEECH_COMMAND,
};
use virtusphere_avatar_core::emotion::Emotion;
use virtusphere_avatar_core::morph::MorphTable;
use virtusphere_avatar_core::playback::{AvatarDriver, DriverConfig, PlaybackState};
use virtusphere_avatar_core::speech::{engine_for, SpeechEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SpeechMode {
    /// Time speech from the text length without producing audio.
    Simulated,
    /// Run an external TTS program.
    Command,
    /// No speech; the avatar keeps its idle motion only.
    Disabled,
}

#[derive(Parser, Debug)]
#[command(name = "virtusphere-avatar")]
#[command(about = "Headless lip-sync driver for the Virtusphere event assistant avatar")]
struct Args {
    #[arg(long, value_enum, default_value_t = SpeechMode::Simulated)]
    speech: SpeechMode,

    /// TTS command line, e.g. "espeak-ng -s {rate} -p {pitch}".
    #[arg(long)]
    speech_command: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SPEECH_RATE)]
    speech_rate: f64,

    /// Speak every line with this emotion instead of the classified one.
    #[arg(long)]
    emotion: Option<String>,

    /// Chat backend base URL; without it input lines are echoed.
    #[arg(long)]
    chat_url: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_EVENT_DETAILS)]
    event_details: String,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,

    #[arg(long, default_value_t = DEFAULT_GRACE_MS)]
    grace_ms: u64,

    #[arg(long, default_value_t = DEFAULT_BLINK_MIN_MS)]
    blink_min_ms: u64,

    #[arg(long, default_value_t = DEFAULT_BLINK_MAX_MS)]
    blink_max_ms: u64,

    /// Print a JSON frame every tick rather than only on state changes.
    #[arg(long, default_value_t = false)]
    emit_frames: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

struct RunOptions {
    forced_emotion: Option<Emotion>,
    emit_frames: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let options = RunOptions {
        forced_emotion: args.emotion.as_deref().map(Emotion::from_label),
        emit_frames: args.emit_frames,
    };
    let cfg = build_config(args, &env)?;

    tracing::info!(
        speech = ?cfg.speech,
        chat = cfg.chat.as_ref().map(|c| c.endpoint.url().as_str()).unwrap_or("<local echo>"),
        fps = cfg.frame_rate.fps(),
        "config loaded"
    );

    run(cfg, options).await
}

async fn run(cfg: AvatarConfig, options: RunOptions) -> anyhow::Result<()> {
    let chat: Arc<dyn ChatClient> = match &cfg.chat {
        Some(chat_cfg) => {
            Arc::new(RagChatClient::new(chat_cfg).context("failed to build chat client")?)
        }
        None => Arc::new(LocalChatClient::new()),
    };

    let mut driver = AvatarDriver::new(
        MorphTable::full_face(),
        engine_for(&cfg.speech),
        DriverConfig::from_app(&cfg),
        Instant::now(),
    );
    let started = Instant::now();

    let (reply_tx, mut reply_rx) = mpsc::channel::<Result<ChatReply, ChatError>>(8);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut in_flight = 0usize;

    let mut ticker = tokio::time::interval(cfg.frame_rate.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_state = driver.state();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                driver.tick(now);
                let state = driver.state();
                if options.emit_frames || state != last_state {
                    emit_frame(&driver, now.duration_since(started).as_millis());
                }
                last_state = state;
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        in_flight += 1;
                        let chat = Arc::clone(&chat);
                        let tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let reply = chat.reply(line).await;
                            if tx.send(reply).await.is_err() {
                                tracing::debug!("reply dropped after shutdown");
                            }
                        });
                    }
                    None => stdin_open = false,
                }
            }
            Some(reply) = reply_rx.recv() => {
                in_flight = in_flight.saturating_sub(1);
                match reply {
                    Ok(reply) => {
                        let emotion = options
                            .forced_emotion
                            .unwrap_or_else(|| reply.dominant_emotion());
                        tracing::info!(%emotion, text = %reply.generated_text, "speaking");
                        driver.submit(&reply.generated_text, emotion, Instant::now());
                    }
                    Err(e) => tracing::warn!(error = %e, "no reply to speak"),
                }
            }
        }

        if !stdin_open && in_flight == 0 && driver.state() != PlaybackState::Speaking {
            break;
        }
    }

    driver.shutdown();
    emit_frame(&driver, started.elapsed().as_millis());
    tracing::info!(utterances = driver.utterances(), "input closed; avatar stopped");
    Ok(())
}

fn emit_frame<S: SpeechEngine>(driver: &AvatarDriver<MorphTable, S>, t_ms: u128) {
    let face = driver.face();
    let frame = serde_json::json!({
        "t_ms": t_ms,
        "state": driver.state(),
        "emotion": driver.emotion(),
        "weights": face.snapshot(),
        "motion": face.motion(),
    });
    println!("{frame}");
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<AvatarConfig> {
    let animation = AnimationConfig {
        speech_rate: SpeechRate::new(args.speech_rate)?,
        grace_ms: args.grace_ms,
        blink: BlinkInterval::new(args.blink_min_ms, args.blink_max_ms)?,
        seed: args.seed,
        ..AnimationConfig::default()
    };

    let speech = match args.speech {
        SpeechMode::Simulated => SpeechBackend::Simulated,
        SpeechMode::Disabled => SpeechBackend::Disabled,
        SpeechMode::Command => {
            match resolve_optional_string(args.speech_command, ENV_SPEECH_COMMAND, env) {
                Some(command) => parse_speech_command(&command)?,
                None => SpeechBackend::espeak(),
            }
        }
    };

    let chat = match resolve_chat_endpoint(args.chat_url, env)? {
        Some(endpoint) => Some(ChatConfig {
            endpoint,
            api_key: resolve_api_key(args.api_key, ENV_API_KEY, env)?,
            event_details: args.event_details,
        }),
        None => None,
    };

    Ok(AvatarConfig {
        animation,
        speech,
        chat,
        frame_rate: FrameRate::new(args.fps)?,
    })
}
