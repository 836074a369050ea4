//! Playback engine for the lehra practice player: a musical timeline, the
//! transport clock built on it, tempo-band asset selection, riyaz mode and the
//! coordinator that ties them to audio outputs and the beat display.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod practice;
pub mod selector;
pub mod session;
pub mod sink;
pub mod state;
pub mod timeline;

#[cfg(test)]
mod test_support;

pub use clock::{ClockEvent, ClockState, TickOutcome, TransportClock};
pub use coordinator::PlaybackCoordinator;
pub use error::EngineError;
pub use practice::{PracticeController, PracticeState};
pub use selector::{fetch, AssetSelector, Completion, LoadCompletion, LoadRequest, RequestId};
pub use session::{Command, CommandError, Session};
pub use sink::{RecordingSink, TracingSink, VisualSink};
pub use state::PlaybackState;
pub use timeline::{Fired, ScheduleError, Timeline, TimerToken};
