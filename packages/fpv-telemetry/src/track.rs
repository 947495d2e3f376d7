// Flight track: prior positions from the ground station plus live GPS fixes
//
// `TrackClient` talks to the track history resource; `FlightTrack` follows the
// hub and appends every snapshot that carries a non-zero GPS latitude.

use crate::config::ClientConfig;
use crate::hub::{SnapshotHub, Subscription};
use crate::types::{Snapshot, TelemetryError, TelemetryResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// A (latitude, longitude) pair in degrees
pub type TrackPoint = (f64, f64);

/// Launch position reported by the flight controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomePosition {
    pub lat: f64,
    pub lon: f64,
    /// Meters
    pub alt: f64,
    pub fix: u8,
}

/// HTTP client for the track history resource
#[derive(Debug, Clone)]
pub struct TrackClient {
    http_client: reqwest::Client,
    url: String,
}

impl TrackClient {
    pub fn new(url: impl Into<String>) -> TelemetryResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> TelemetryResult<Self> {
        let url = config
            .track_url()
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;
        Self::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch recorded track points, oldest first
    pub async fn fetch(&self) -> TelemetryResult<Vec<TrackPoint>> {
        debug!("Fetching track history from {}", self.url);

        let response = self.http_client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        // An empty log is served as `null`
        let points: Option<Vec<TrackPoint>> = response.json().await?;
        let points = points.unwrap_or_default();

        debug!("Fetched {} track points", points.len());
        Ok(points)
    }

    /// Delete the recorded track on the ground station
    pub async fn clear(&self) -> TelemetryResult<()> {
        let response = self.http_client.delete(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        info!("Cleared track history at {}", self.url);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TrackState {
    points: Vec<TrackPoint>,
    home: Option<HomePosition>,
}

impl TrackState {
    fn apply(&mut self, snapshot: &Snapshot) {
        if let Some(gps) = snapshot.gps {
            if gps.lat != 0.0 {
                self.points.push((gps.lat, gps.lon));
            }
        }

        if let Some(origin) = snapshot.origin {
            if origin.lat != 0.0 && origin.fix > 0 {
                self.home = Some(HomePosition {
                    lat: origin.lat,
                    lon: origin.lon,
                    alt: origin.alt,
                    fix: origin.fix,
                });
            }
        }
    }
}

/// In-memory flight path fed by the hub
///
/// Dropping it unsubscribes from the hub.
pub struct FlightTrack {
    state: Arc<RwLock<TrackState>>,
    subscription: Subscription,
}

impl FlightTrack {
    /// Follow `hub`, starting from `history`
    pub fn follow(hub: &SnapshotHub, history: Vec<TrackPoint>) -> Self {
        let state = Arc::new(RwLock::new(TrackState {
            points: history,
            home: None,
        }));

        let sink = Arc::clone(&state);
        let subscription = hub.subscribe(move |snapshot: &Arc<Snapshot>| {
            sink.write().apply(snapshot);
        });

        Self {
            state,
            subscription,
        }
    }

    pub fn points(&self) -> Vec<TrackPoint> {
        self.state.read().points.clone()
    }

    pub fn last(&self) -> Option<TrackPoint> {
        self.state.read().points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.state.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().points.is_empty()
    }

    pub fn home(&self) -> Option<HomePosition> {
        self.state.read().home
    }

    /// Forget local points; the home position is kept
    pub fn clear(&self) {
        self.state.write().points.clear();
    }
}

impl Drop for FlightTrack {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GpsData, OriginData};

    fn gps_snapshot(ts: i64, lat: f64, lon: f64) -> Snapshot {
        let mut snapshot = Snapshot::at(ts);
        snapshot.gps = Some(GpsData {
            lat,
            lon,
            ground_speed: 0,
            altitude: 0.0,
            fix: 3,
            sats: 9,
        });
        snapshot.gps_ts = Some(ts);
        snapshot
    }

    #[test]
    fn test_appends_live_positions_after_history() {
        let hub = SnapshotHub::new();
        let track = FlightTrack::follow(&hub, vec![(51.0, -1.0)]);

        hub.publish(gps_snapshot(1, 51.1, -1.1));
        hub.publish(Snapshot::at(2));
        hub.publish(gps_snapshot(3, 51.2, -1.2));

        assert_eq!(track.points(), vec![(51.0, -1.0), (51.1, -1.1), (51.2, -1.2)]);
        assert_eq!(track.last(), Some((51.2, -1.2)));
    }

    #[test]
    fn test_ignores_zero_latitude() {
        let hub = SnapshotHub::new();
        let track = FlightTrack::follow(&hub, Vec::new());

        hub.publish(gps_snapshot(1, 0.0, 12.0));
        assert!(track.is_empty());
    }

    #[test]
    fn test_home_requires_fix() {
        let hub = SnapshotHub::new();
        let track = FlightTrack::follow(&hub, Vec::new());

        let mut snapshot = Snapshot::at(1);
        snapshot.origin = Some(OriginData {
            lat: 51.5,
            lon: -0.1278,
            alt: 50.0,
            osd_on: true,
            fix: 0,
        });
        hub.publish(snapshot.clone());
        assert_eq!(track.home(), None);

        snapshot.origin = snapshot.origin.map(|o| OriginData { fix: 1, ..o });
        hub.publish(snapshot);
        let home = track.home().unwrap();
        assert_eq!(home.lat, 51.5);
        assert_eq!(home.alt, 50.0);

        track.clear();
        assert!(track.is_empty());
        assert!(track.home().is_some());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = SnapshotHub::new();
        let track = FlightTrack::follow(&hub, Vec::new());
        assert_eq!(hub.subscriber_count(), 1);
        drop(track);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
