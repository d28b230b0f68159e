use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use voxscribe_session::{SessionCommand, SessionController, SessionEvent};

#[derive(Parser)]
#[command(name = "voxscribe", about = "Push-to-talk speech transcription")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Capture device name override
    #[arg(short, long)]
    device: Option<String>,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = voxscribe_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;
    if let Some(device) = cli.device {
        config.audio.device_name = device;
    }

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if cli.list_devices {
        let manager = voxscribe_audio::DeviceManager::new();
        let devices = manager
            .list_input_devices()
            .context("failed to enumerate input devices")?;
        println!("Input devices:");
        for (name, _) in &devices {
            println!("  {name}");
        }
        return Ok(());
    }

    tracing::info!("voxscribe starting");

    let backend = voxscribe_asr::create_backend(&config.asr)
        .with_context(|| format!("failed to create ASR backend '{}'", config.asr.backend))?;
    tracing::info!("ASR backend '{}' active", backend.name());

    let mut controller = SessionController::new(
        Box::new(voxscribe_audio::CpalSource::new()),
        backend,
        config.audio.clone(),
        config.asr.transcribe_options(),
        config.asr.streaming,
    );
    let mut events = controller
        .take_event_receiver()
        .context("event receiver already taken")?;
    let (cmd_tx, task) = controller.spawn();

    // Event printer; partial lines are overwritten in place.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::StateChanged(state) => {
                    tracing::info!("session state: {state}");
                }
                SessionEvent::Tick {
                    elapsed_secs,
                    remaining_secs,
                } => {
                    eprint!("\rrecording {elapsed_secs:>5.1}s ({remaining_secs:.0}s left) ");
                }
                SessionEvent::Partial(text) => {
                    eprint!("\r{text}");
                }
                SessionEvent::CeilingReached => {
                    eprintln!("\nrecording limit reached, processing...");
                }
                SessionEvent::TooShort => {
                    eprintln!("\nrecording too short, nothing to transcribe");
                }
                SessionEvent::Finished(t) => {
                    if t.language.is_empty() {
                        println!("\n{}", t.text);
                    } else {
                        println!("\n[{}] {}", t.language, t.text);
                    }
                }
                SessionEvent::Failed(msg) => {
                    eprintln!("\ntranscription failed: {msg}");
                }
                SessionEvent::Cancelled => {
                    eprintln!("\nrecording cancelled");
                }
            }
        }
    });

    println!("Enter: start/stop recording, c+Enter: cancel, q+Enter: quit");

    let mut recording = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("stdin read failed")? {
        match line.trim() {
            "q" => break,
            "c" => {
                recording = false;
                cmd_tx
                    .send(SessionCommand::Cancel)
                    .context("session controller stopped")?;
            }
            _ => {
                let cmd = if recording {
                    SessionCommand::Stop
                } else {
                    SessionCommand::Start
                };
                recording = !recording;
                cmd_tx.send(cmd).context("session controller stopped")?;
            }
        }
    }

    tracing::info!("shutting down");
    drop(cmd_tx);
    task.await.context("session task panicked")?;
    printer.abort();

    Ok(())
}
