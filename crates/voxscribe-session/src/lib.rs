pub mod controller;
pub mod events;
pub mod state;

pub use controller::{SessionCommand, SessionController};
pub use events::SessionEvent;
pub use state::RecordingState;
