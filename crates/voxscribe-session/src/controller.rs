use crate::events::SessionEvent;
use crate::state::RecordingState;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voxscribe_asr::AsrBackend;
use voxscribe_audio::{
    encode_wav, resample, rms, CaptureConstraints, CaptureStream, SampleAggregator, SampleSource,
};
use voxscribe_core::{AudioConfig, TranscribeOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
    Cancel,
}

/// Drives one recording session at a time: capture, aggregate, convert,
/// upload, announce. Commands go in on an unbounded channel, events
/// come out on another, and the live input level is published on a
/// `watch` channel so slow frontends only ever see the latest value.
pub struct SessionController {
    source: Box<dyn SampleSource>,
    backend: Box<dyn AsrBackend>,
    audio: AudioConfig,
    opts: TranscribeOptions,
    streaming: bool,
    state: RecordingState,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    level_tx: watch::Sender<f32>,
}

impl SessionController {
    pub fn new(
        source: Box<dyn SampleSource>,
        backend: Box<dyn AsrBackend>,
        audio: AudioConfig,
        opts: TranscribeOptions,
        streaming: bool,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (level_tx, _) = watch::channel(0.0);
        Self {
            source,
            backend,
            audio,
            opts,
            streaming,
            state: RecordingState::Idle,
            event_tx,
            event_rx: Some(event_rx),
            level_tx,
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.event_rx.take()
    }

    pub fn level_receiver(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    /// Move the controller onto the runtime. The returned sender is the
    /// only way to talk to it; dropping the sender shuts it down.
    pub fn spawn(self) -> (mpsc::UnboundedSender<SessionCommand>, tokio::task::JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(cmd_rx));
        (cmd_tx, handle)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        loop {
            match commands.recv().await {
                Some(SessionCommand::Start) => self.run_session(&mut commands).await,
                Some(cmd) => {
                    tracing::debug!(?cmd, "no active session, ignoring");
                }
                None => break,
            }
        }
        tracing::debug!("session controller stopped");
    }

    fn set_state(&mut self, next: RecordingState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "illegal state transition");
            return;
        }
        self.state = next;
        let _ = self.event_tx.send(SessionEvent::StateChanged(next));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn run_session(&mut self, commands: &mut mpsc::UnboundedReceiver<SessionCommand>) {
        let constraints = CaptureConstraints {
            device_name: self.audio.device_name.clone(),
            sample_rate: self.audio.sample_rate,
        };
        let mut stream = match self.source.open(&constraints) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("failed to open capture stream: {e}");
                self.emit(SessionEvent::Failed(e.to_string()));
                return;
            }
        };
        tracing::info!(sample_rate = stream.sample_rate, "recording started");
        self.set_state(RecordingState::Recording);

        let mut aggregator = SampleAggregator::new(stream.sample_rate);
        let ceiling = self.audio.max_recording_secs as f64;
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                block = stream.blocks.recv() => {
                    match block {
                        Some(block) => {
                            let _ = self.level_tx.send(rms(&block.samples));
                            aggregator.push(block);
                            if aggregator.duration_secs() >= ceiling {
                                tracing::info!("recording ceiling reached, stopping");
                                self.emit(SessionEvent::CeilingReached);
                                break;
                            }
                        }
                        None => {
                            // Device went away; keep what was captured.
                            tracing::warn!("capture stream ended unexpectedly");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let elapsed = aggregator.duration_secs();
                    self.emit(SessionEvent::Tick {
                        elapsed_secs: elapsed,
                        remaining_secs: (ceiling - elapsed).max(0.0),
                    });
                }
                cmd = commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Stop) => break,
                        Some(SessionCommand::Cancel) | None => {
                            stream.handle.close();
                            let _ = self.level_tx.send(0.0);
                            self.set_state(RecordingState::Cancelled);
                            self.emit(SessionEvent::Cancelled);
                            self.set_state(RecordingState::Idle);
                            return;
                        }
                        Some(SessionCommand::Start) => {
                            tracing::warn!("already recording, ignoring start");
                        }
                    }
                }
            }
        }

        self.finalize(&mut stream, aggregator).await;
    }

    /// Common stop path for manual stops, the ceiling and device loss:
    /// release the microphone, keep in-flight blocks, convert, upload.
    async fn finalize(&mut self, stream: &mut CaptureStream, mut aggregator: SampleAggregator) {
        stream.handle.close();
        while let Ok(block) = stream.blocks.try_recv() {
            aggregator.push(block);
        }
        let _ = self.level_tx.send(0.0);
        self.set_state(RecordingState::Processing);

        let Some(buffer) = aggregator.flatten() else {
            tracing::info!("nothing captured, skipping upload");
            self.emit(SessionEvent::TooShort);
            self.set_state(RecordingState::Idle);
            return;
        };
        tracing::info!(
            frames = buffer.frames(),
            secs = buffer.duration_secs(),
            "processing recording"
        );

        let result = match resample(&buffer, self.audio.target_sample_rate, self.audio.time_scale)
        {
            Ok(converted) => {
                let wav = encode_wav(&converted);
                self.transcribe(&wav).await
            }
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(transcription) => {
                self.set_state(RecordingState::Done);
                self.emit(SessionEvent::Finished(transcription));
            }
            Err(msg) => {
                tracing::error!("session failed: {msg}");
                self.set_state(RecordingState::Failed);
                self.emit(SessionEvent::Failed(msg));
            }
        }
        self.set_state(RecordingState::Idle);
    }

    async fn transcribe(&self, wav: &[u8]) -> Result<voxscribe_core::Transcription, String> {
        if self.streaming && self.backend.supports_streaming() {
            let (partial_tx, mut partial_rx) = mpsc::unbounded_channel();
            let event_tx = self.event_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(text) = partial_rx.recv().await {
                    let _ = event_tx.send(SessionEvent::Partial(text));
                }
            });
            let result = self
                .backend
                .transcribe_streaming(wav, &self.opts, partial_tx)
                .await;
            let _ = forwarder.await;
            result.map_err(|e| e.to_string())
        } else {
            self.backend
                .transcribe(wav, &self.opts)
                .await
                .map_err(|e| e.to_string())
        }
    }
}
