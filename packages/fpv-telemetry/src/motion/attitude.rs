// Attitude indicator: smoothed pitch and roll plus the horizon geometry

use super::engine::Instrument;
use super::smoothing::{LinearSmoother, SMOOTHING_FACTOR};
use crate::types::Snapshot;
use serde::{Deserialize, Serialize};

/// Pitch ladder extent in degrees (both directions)
pub const PITCH_LADDER_LIMIT: i32 = 60;

/// Spacing between pitch ladder rungs in degrees
pub const PITCH_LADDER_STEP: usize = 5;

/// Angles of the fixed roll scale
pub const ROLL_SCALE_ANGLES: [i32; 13] = [0, 10, 20, 30, 45, 60, 90, -10, -20, -30, -45, -60, -90];

/// Screen geometry of the instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub pixels_per_degree: f64,
}

impl Default for AttitudeGeometry {
    fn default() -> Self {
        // 200x200 dial
        Self {
            center_x: 100.0,
            center_y: 100.0,
            pixels_per_degree: 3.0,
        }
    }
}

/// Pitch and roll pair chased by the indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeTarget {
    pub pitch: f64,
    pub roll: f64,
}

/// Screen state for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeFrame {
    pub pitch: f64,
    pub roll: f64,
    /// Vertical translation of the horizon group
    pub horizon_offset_px: f64,
    /// Rotation of the horizon group about the center, degrees
    pub horizon_rotation_deg: f64,
    /// Rotation of the roll pointer about the center, degrees
    pub roll_pointer_rotation_deg: f64,
    pub pitch_text: String,
    pub roll_text: String,
}

/// One rung of the pitch ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchRung {
    pub degrees: i32,
    /// Vertical position in the un-rotated horizon group
    pub y: f64,
    pub major: bool,
    /// Drawn on both sides of major rungs
    pub label: Option<u32>,
}

/// One tick on the fixed roll arc
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollTick {
    pub degrees: i32,
    /// Longer and bolder
    pub major: bool,
}

/// Smoothed pitch/roll instrument
#[derive(Debug, Clone)]
pub struct AttitudeIndicator {
    pitch: LinearSmoother,
    roll: LinearSmoother,
    geometry: AttitudeGeometry,
}

impl AttitudeIndicator {
    pub fn new(geometry: AttitudeGeometry, alpha: f64) -> Self {
        Self {
            pitch: LinearSmoother::new(alpha),
            roll: LinearSmoother::new(alpha),
            geometry,
        }
    }

    pub fn geometry(&self) -> &AttitudeGeometry {
        &self.geometry
    }

    pub fn current(&self) -> AttitudeTarget {
        AttitudeTarget {
            pitch: self.pitch.current(),
            roll: self.roll.current(),
        }
    }

    /// Static rungs from -60 to +60 degrees; the zero rung is the horizon line
    pub fn pitch_ladder(&self) -> Vec<PitchRung> {
        (-PITCH_LADDER_LIMIT..=PITCH_LADDER_LIMIT)
            .step_by(PITCH_LADDER_STEP)
            .filter(|deg| *deg != 0)
            .map(|deg| {
                let major = deg % 10 == 0;
                PitchRung {
                    degrees: deg,
                    y: self.geometry.center_y - f64::from(deg) * self.geometry.pixels_per_degree,
                    major,
                    label: major.then(|| deg.unsigned_abs()),
                }
            })
            .collect()
    }

    fn frame(&self) -> AttitudeFrame {
        let pitch = self.pitch.current();
        let roll = self.roll.current();

        AttitudeFrame {
            pitch,
            roll,
            horizon_offset_px: pitch * self.geometry.pixels_per_degree,
            horizon_rotation_deg: -roll,
            roll_pointer_rotation_deg: -roll,
            pitch_text: format!("{:.1}\u{00B0}", pitch),
            roll_text: format!("{:.1}\u{00B0}", roll),
        }
    }
}

impl Default for AttitudeIndicator {
    fn default() -> Self {
        Self::new(AttitudeGeometry::default(), SMOOTHING_FACTOR)
    }
}

impl Instrument for AttitudeIndicator {
    type Target = AttitudeTarget;
    type Frame = AttitudeFrame;

    fn name(&self) -> &'static str {
        "attitude"
    }

    fn set_target(&mut self, target: AttitudeTarget) {
        self.pitch.set_target(target.pitch);
        self.roll.set_target(target.roll);
    }

    fn step(&mut self) -> AttitudeFrame {
        self.pitch.step();
        self.roll.step();
        self.frame()
    }

    fn project(snapshot: &Snapshot) -> Option<AttitudeTarget> {
        snapshot.attitude.map(|a| AttitudeTarget {
            pitch: a.pitch,
            roll: a.roll,
        })
    }
}

/// Fixed roll arc ticks; multiples of 30 are major
pub fn roll_scale() -> Vec<RollTick> {
    ROLL_SCALE_ANGLES
        .iter()
        .map(|&deg| RollTick {
            degrees: deg,
            major: deg % 30 == 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttitudeData;

    #[test]
    fn test_frame_geometry() {
        let mut indicator = AttitudeIndicator::new(AttitudeGeometry::default(), 1.0);
        indicator.set_target(AttitudeTarget {
            pitch: 10.0,
            roll: 15.0,
        });
        let frame = indicator.step();

        assert_eq!(frame.pitch, 10.0);
        assert_eq!(frame.horizon_offset_px, 30.0);
        assert_eq!(frame.horizon_rotation_deg, -15.0);
        assert_eq!(frame.roll_pointer_rotation_deg, -15.0);
        assert_eq!(frame.pitch_text, "10.0°");
        assert_eq!(frame.roll_text, "15.0°");
    }

    #[test]
    fn test_smoothing_per_tick() {
        let mut indicator = AttitudeIndicator::default();
        indicator.set_target(AttitudeTarget {
            pitch: -10.0,
            roll: 20.0,
        });
        let frame = indicator.step();

        assert!((frame.pitch + 3.0).abs() < 1e-9);
        assert!((frame.roll - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_ladder() {
        let indicator = AttitudeIndicator::default();
        let ladder = indicator.pitch_ladder();

        // -60..=60 step 5, minus the horizon
        assert_eq!(ladder.len(), 24);
        assert!(ladder.iter().all(|r| r.degrees != 0));
        assert_eq!(ladder.first().unwrap().degrees, -60);
        assert_eq!(ladder.last().unwrap().degrees, 60);

        let ten_up = ladder.iter().find(|r| r.degrees == 10).unwrap();
        assert!(ten_up.major);
        assert_eq!(ten_up.label, Some(10));
        assert_eq!(ten_up.y, 70.0);

        let five_down = ladder.iter().find(|r| r.degrees == -5).unwrap();
        assert!(!five_down.major);
        assert_eq!(five_down.label, None);
        assert_eq!(five_down.y, 115.0);

        let twenty_down = ladder.iter().find(|r| r.degrees == -20).unwrap();
        assert_eq!(twenty_down.label, Some(20));
    }

    #[test]
    fn test_roll_scale() {
        let ticks = roll_scale();
        assert_eq!(ticks.len(), 13);

        let majors: Vec<i32> = ticks.iter().filter(|t| t.major).map(|t| t.degrees).collect();
        assert_eq!(majors, vec![0, 30, 60, 90, -30, -60, -90]);
        assert!(ticks.iter().any(|t| t.degrees == -45 && !t.major));
    }

    #[test]
    fn test_project() {
        let mut snapshot = Snapshot::at(1);
        assert_eq!(AttitudeIndicator::project(&snapshot), None);

        snapshot.attitude = Some(AttitudeData {
            pitch: 4.0,
            roll: -7.0,
            heading: 180.0,
        });
        assert_eq!(
            AttitudeIndicator::project(&snapshot),
            Some(AttitudeTarget {
                pitch: 4.0,
                roll: -7.0
            })
        );
    }
}
