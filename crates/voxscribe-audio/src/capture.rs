use crate::device::DeviceManager;
use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voxscribe_core::{AudioBlock, DeviceError, BLOCK_FRAMES};

// ── CaptureHandle ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Ok,
    Error,
}

/// Shared control surface for an open capture stream. `close` is
/// idempotent; the capture thread drops the hardware stream once it
/// observes the flag, on every exit path.
#[derive(Clone)]
pub struct CaptureHandle {
    closed: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl CaptureHandle {
    pub fn new() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            status: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> StreamStatus {
        match self.status.load(Ordering::Relaxed) {
            1 => StreamStatus::Error,
            _ => StreamStatus::Ok,
        }
    }

    pub fn set_status(&self, s: StreamStatus) {
        let v = match s {
            StreamStatus::Ok => 0,
            StreamStatus::Error => 1,
        };
        self.status.store(v, Ordering::Relaxed);
    }
}

impl Default for CaptureHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ── SampleSource ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Device name, or "default".
    pub device_name: String,
    /// Requested rate; the device may silently pick its own.
    pub sample_rate: u32,
}

/// An open microphone stream: fixed-size blocks arrive on `blocks`
/// until the handle is closed or the device fails.
pub struct CaptureStream {
    pub sample_rate: u32,
    pub blocks: mpsc::UnboundedReceiver<AudioBlock>,
    pub handle: CaptureHandle,
}

pub trait SampleSource: Send + Sync {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<CaptureStream, DeviceError>;
}

// ── CpalSource ────────────────────────────────────────────────

/// Microphone source backed by cpal. The cpal stream is not `Send`, so
/// a dedicated thread owns it: the real-time callback pushes samples
/// into an SPSC ring and the thread drains the ring into 128-frame
/// blocks.
pub struct CpalSource;

impl CpalSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for CpalSource {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<CaptureStream, DeviceError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let handle = CaptureHandle::new();
        let thread_handle = handle.clone();
        let constraints = constraints.clone();

        std::thread::Builder::new()
            .name("voxscribe-capture".to_string())
            .spawn(move || capture_thread(constraints, thread_handle, ready_tx))
            .map_err(|e| DeviceError::HostUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok((sample_rate, blocks))) => Ok(CaptureStream {
                sample_rate,
                blocks,
                handle,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DeviceError::HostUnavailable(
                "capture thread exited before the stream opened".to_string(),
            )),
        }
    }
}

type ReadyResult = Result<(u32, mpsc::UnboundedReceiver<AudioBlock>), DeviceError>;

fn capture_thread(
    constraints: CaptureConstraints,
    handle: CaptureHandle,
    ready_tx: std::sync::mpsc::Sender<ReadyResult>,
) {
    let (stream, sample_rate, mut samples) = match open_stream(&constraints, &handle) {
        Ok(v) => v,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let (block_tx, block_rx) = mpsc::unbounded_channel();
    if ready_tx.send(Ok((sample_rate, block_rx))).is_err() {
        return; // opener went away; stream drops here
    }

    let mut scratch = vec![0.0f32; BLOCK_FRAMES];
    let mut filled = 0usize;
    while !handle.is_closed() && handle.status() == StreamStatus::Ok {
        filled += samples.pop_slice(&mut scratch[filled..]);
        if filled == BLOCK_FRAMES {
            filled = 0;
            let block = AudioBlock {
                samples: scratch.clone(),
            };
            if block_tx.send(block).is_err() {
                break; // receiver dropped
            }
        } else {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    // Dropping the stream releases the microphone.
    drop(stream);
    handle.close();
    tracing::debug!("capture thread stopped");
}

fn open_stream(
    constraints: &CaptureConstraints,
    handle: &CaptureHandle,
) -> Result<(cpal::Stream, u32, HeapCons<f32>), DeviceError> {
    let manager = DeviceManager::new();
    let device = manager.get_input_device(&constraints.device_name)?;
    let config = select_config(&device, constraints.sample_rate)?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    // ~1 second of headroom between the callback and the drain loop.
    let rb = HeapRb::<f32>::new(sample_rate as usize);
    let (mut producer, consumer) = rb.split();

    let err_handle = handle.clone();
    let stream = device
        .build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if channels == 1 {
                    // Overflow is silently dropped
                    producer.push_slice(data);
                } else {
                    for frame in data.chunks_exact(channels) {
                        let mono = frame.iter().sum::<f32>() / channels as f32;
                        let _ = producer.try_push(mono);
                    }
                }
            },
            move |err: cpal::StreamError| {
                tracing::error!("capture stream error: {}", err);
                err_handle.set_status(StreamStatus::Error);
            },
            None,
        )
        .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| DeviceError::Unreadable(e.to_string()))?;

    Ok((stream, sample_rate, consumer))
}

/// Prefer an f32 config at the requested rate; fall back to the device
/// default (the actual rate is reported back either way).
fn select_config(
    device: &cpal::Device,
    requested_rate: u32,
) -> Result<cpal::SupportedStreamConfig, DeviceError> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| DeviceError::Unreadable(e.to_string()))?;

    for range in supported {
        if range.sample_format() == cpal::SampleFormat::F32
            && range.min_sample_rate().0 <= requested_rate
            && range.max_sample_rate().0 >= requested_rate
        {
            return Ok(range.with_sample_rate(cpal::SampleRate(requested_rate)));
        }
    }

    device
        .default_input_config()
        .map_err(|e| DeviceError::Unreadable(e.to_string()))
}

fn map_build_error(err: cpal::BuildStreamError) -> DeviceError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            DeviceError::Unreadable("device no longer available".to_string())
        }
        other => {
            let msg = other.to_string();
            if msg.to_lowercase().contains("permission") {
                DeviceError::PermissionDenied(msg)
            } else {
                DeviceError::StreamBuild(msg)
            }
        }
    }
}
