//! Playback state tracking and readiness gating

pub mod position;
pub mod probe;
pub mod session;
pub mod signal;
pub mod ticker;

pub use position::PositionStore;
pub use probe::{ProbeHandle, ReadinessProbe, ReadinessState};
pub use session::{
    Delivery, PlayState, PlaybackSession, SessionEnv, SessionOptions, SessionSinks, SessionState,
};
pub use signal::{GenerationSource, PlayerEventSink, SessionSignal, SessionToken};
pub use ticker::Ticker;
