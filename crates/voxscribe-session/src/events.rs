use crate::state::RecordingState;
use voxscribe_core::Transcription;

/// Everything a frontend needs to render a session. Delivered on an
/// unbounded channel; the live level meter is a separate `watch`
/// channel because it conflates rather than queues.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(RecordingState),
    /// Once per second while recording, measured from captured audio.
    Tick {
        elapsed_secs: f64,
        remaining_secs: f64,
    },
    /// Accumulated text so far, streaming backends only.
    Partial(String),
    /// The recording ceiling forced a stop; processing follows.
    CeilingReached,
    /// Nothing was captured; the session ends without an upload.
    TooShort,
    Finished(Transcription),
    Failed(String),
    Cancelled,
}
