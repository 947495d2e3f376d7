// Common types for the telemetry client
//
// A `Snapshot` is one JSON frame from the ground station. Every sub-record is
// optional and carries its own `<name>_ts` sibling timestamp; a missing
// sub-record means "no update", never "zero".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attitude age (relative to the snapshot's own `ts`) at which data is considered stale
pub const STALE_THRESHOLD_MS: i64 = 2000;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur in the telemetry client
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// GPS fix (G-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    /// Degrees
    pub lat: f64,
    /// Degrees
    pub lon: f64,
    /// m/s
    pub ground_speed: u8,
    /// Meters
    pub altitude: f64,
    /// 0 = no fix, 1 = dead reckoning, 2 = 2D, 3 = 3D
    pub fix: u8,
    pub sats: u8,
}

/// Vehicle attitude in degrees (A-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeData {
    pub pitch: f64,
    pub roll: f64,
    pub heading: f64,
}

/// Battery, link and arming state (S-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    /// Volts
    pub vbat: f64,
    pub mah_drawn: u16,
    pub rssi: u8,
    /// m/s
    pub airspeed: u8,
    pub armed: bool,
    pub failsafe: bool,
    pub flight_mode: u8,
}

/// Home position (O-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OriginData {
    pub lat: f64,
    pub lon: f64,
    /// Meters
    pub alt: f64,
    pub osd_on: bool,
    pub fix: u8,
}

/// Navigation controller state (N-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavData {
    pub gps_mode: u8,
    pub nav_mode: u8,
    pub nav_action: u8,
    pub waypoint_num: u8,
    pub nav_error: u8,
    pub flags: u8,
}

/// Low-rate extras (X-frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    pub hdop: f64,
    pub hw_status: u8,
    pub x_counter: u8,
    pub disarm_reason: u8,
}

/// Throughput counters describing the stream itself (not timestamped)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamStats {
    pub uptime_sec: f64,
    pub total: u64,
    pub fps: f64,
    pub crc_errors: u64,
    pub decode_errors: u64,
}

/// One partially-populated telemetry update
///
/// Timestamps are milliseconds on the same epoch as `ts`. Snapshots are
/// immutable once published; the hub shares them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ts: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attitude: Option<AttitudeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attitude_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<NavData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<ExtraData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_ts: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StreamStats>,
}

impl Snapshot {
    /// An empty snapshot carrying only its timestamp
    pub fn at(ts: i64) -> Self {
        Self {
            ts,
            gps: None,
            gps_ts: None,
            attitude: None,
            attitude_ts: None,
            status: None,
            status_ts: None,
            origin: None,
            origin_ts: None,
            nav: None,
            nav_ts: None,
            extra: None,
            extra_ts: None,
            stats: None,
        }
    }

    /// Parse a single stream frame
    pub fn from_json(text: &str) -> TelemetryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a frame delivered as bytes
    pub fn from_slice(bytes: &[u8]) -> TelemetryResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Age of the attitude sub-record relative to `ts`, if one was ever observed
    pub fn attitude_age_ms(&self) -> Option<i64> {
        self.attitude_ts.map(|at| self.ts - at)
    }

    /// Freshness classification of this snapshot
    pub fn data_status(&self) -> DataStatus {
        DataStatus::classify(self.ts, self.attitude_ts)
    }
}

/// Connection lifecycle of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// A connection attempt is in flight
    #[default]
    Connecting,

    /// The stream is open
    Connected,

    /// The stream closed or failed; a reconnect may be pending
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// Freshness of the flight controller data, derived from each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    /// Attitude updated within the stale threshold
    Receiving,

    /// Attitude exists but is older than the stale threshold
    Stale,

    /// No attitude timestamp observed
    #[default]
    None,
}

impl DataStatus {
    pub fn classify(ts: i64, attitude_ts: Option<i64>) -> Self {
        match attitude_ts {
            Some(at) if ts - at < STALE_THRESHOLD_MS => Self::Receiving,
            Some(_) => Self::Stale,
            None => Self::None,
        }
    }
}

impl std::fmt::Display for DataStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Receiving => write!(f, "FC RECEIVING"),
            Self::Stale => write!(f, "FC STALE"),
            Self::None => write!(f, "NO FC DATA"),
        }
    }
}
