use std::fmt;

/// Lifecycle of one recording session. `Done`, `Failed` and `Cancelled`
/// are announced and immediately give way to `Idle`; there is no
/// lingering terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Processing,
    Done,
    Cancelled,
    Failed,
}

impl RecordingState {
    /// Whether moving to `next` is a legal step of the lifecycle.
    /// `Recording -> Processing` covers both a manual stop and the
    /// recording ceiling; `Processing -> Idle` is the too-short outcome.
    pub fn can_transition_to(self, next: RecordingState) -> bool {
        use RecordingState::*;
        matches!(
            (self, next),
            (Idle, Recording)
                | (Recording, Processing)
                | (Recording, Cancelled)
                | (Processing, Done)
                | (Processing, Failed)
                | (Processing, Idle)
                | (Done, Idle)
                | (Failed, Idle)
                | (Cancelled, Idle)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Processing)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Processing => "processing",
            RecordingState::Done => "done",
            RecordingState::Cancelled => "cancelled",
            RecordingState::Failed => "failed",
        };
        f.write_str(s)
    }
}
