// FPV telemetry client
//
// Data flow:
//   StreamSession -> SnapshotHub -> Selector -> MotionEngine -> frames
//
// The session owns the WebSocket and reconnects on its own. The hub keeps the
// latest snapshot and fans it out synchronously. Selectors project one value
// per snapshot, and each motion engine smooths its instrument toward that value
// on a fixed tick.

pub mod cli;
pub mod config;
pub mod hub;
pub mod motion;
pub mod readout;
pub mod selector;
pub mod session;
pub mod track;
pub mod types;

pub use config::{ClientConfig, ConfigError, DEFAULT_RECONNECT_DELAY};
pub use hub::{SnapshotHub, SnapshotListener, Subscription};
pub use motion::{
    AttitudeFrame, AttitudeIndicator, HeadingFrame, HeadingTape, Instrument, MotionEngine,
};
pub use selector::Selector;
pub use session::StreamSession;
pub use track::{FlightTrack, HomePosition, TrackClient, TrackPoint};
pub use types::{
    ConnectionStatus, DataStatus, Snapshot, TelemetryError, TelemetryResult, STALE_THRESHOLD_MS,
};
