// Heading tape: smoothed heading on a horizontally scrolling strip
//
// The tape holds two full turns of ticks so it never shows a seam while the
// heading wraps past north.

use super::engine::Instrument;
use super::smoothing::{CircularSmoother, SMOOTHING_FACTOR};
use crate::types::Snapshot;
use serde::{Deserialize, Serialize};

/// Degrees between tape ticks
pub const TAPE_TICK_STEP: usize = 10;

/// Consecutive 360-degree passes drawn on the tape
pub const TAPE_PASSES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapeGeometry {
    /// Horizontal position of the lubber line
    pub center_x: f64,
    pub pixels_per_degree: f64,
}

impl Default for TapeGeometry {
    fn default() -> Self {
        // 200px wide strip
        Self {
            center_x: 100.0,
            pixels_per_degree: 1.8,
        }
    }
}

/// Screen state for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingFrame {
    /// Smoothed heading in [0, 360)
    pub heading: f64,
    /// Horizontal translation of the tape group
    pub tape_offset_px: f64,
    /// Whole-degree readout
    pub readout: u16,
    /// Zero-padded readout, e.g. `005°`
    pub readout_text: String,
}

/// One tick mark on the tape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeTick {
    /// Position along the un-translated tape
    pub x: f64,
    /// Heading this tick stands for, 0..360
    pub degrees: u32,
    pub major: bool,
    pub label: Option<String>,
    /// N, E, S or W
    pub cardinal: bool,
}

fn cardinal(deg: u32) -> Option<&'static str> {
    match deg {
        0 => Some("N"),
        90 => Some("E"),
        180 => Some("S"),
        270 => Some("W"),
        _ => None,
    }
}

/// Smoothed heading instrument
#[derive(Debug, Clone)]
pub struct HeadingTape {
    heading: CircularSmoother,
    geometry: TapeGeometry,
}

impl HeadingTape {
    pub fn new(geometry: TapeGeometry, alpha: f64) -> Self {
        Self {
            heading: CircularSmoother::new(alpha),
            geometry,
        }
    }

    pub fn geometry(&self) -> &TapeGeometry {
        &self.geometry
    }

    pub fn current(&self) -> f64 {
        self.heading.current()
    }

    /// Ticks for 0..720 degrees
    pub fn ticks(&self) -> Vec<TapeTick> {
        (0..TAPE_PASSES)
            .flat_map(|pass| {
                (0..360u32).step_by(TAPE_TICK_STEP).map(move |deg| (pass, deg))
            })
            .map(|(pass, deg)| {
                let label = match cardinal(deg) {
                    Some(c) => Some(c.to_string()),
                    None if deg % 30 == 0 => Some(deg.to_string()),
                    None => None,
                };
                TapeTick {
                    x: f64::from(pass * 360 + deg) * self.geometry.pixels_per_degree,
                    degrees: deg,
                    major: deg % 30 == 0,
                    label,
                    cardinal: cardinal(deg).is_some(),
                }
            })
            .collect()
    }

    fn frame(&self) -> HeadingFrame {
        let heading = self.heading.current();
        let readout = (heading.round() as u16) % 360;

        HeadingFrame {
            heading,
            tape_offset_px: self.geometry.center_x - heading * self.geometry.pixels_per_degree,
            readout,
            readout_text: format!("{:03}\u{00B0}", readout),
        }
    }
}

impl Default for HeadingTape {
    fn default() -> Self {
        Self::new(TapeGeometry::default(), SMOOTHING_FACTOR)
    }
}

impl Instrument for HeadingTape {
    type Target = f64;
    type Frame = HeadingFrame;

    fn name(&self) -> &'static str {
        "heading"
    }

    fn set_target(&mut self, target: f64) {
        self.heading.set_target(target);
    }

    fn step(&mut self) -> HeadingFrame {
        self.heading.step();
        self.frame()
    }

    fn project(snapshot: &Snapshot) -> Option<f64> {
        snapshot.attitude.map(|a| a.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_offset_and_readout() {
        let mut tape = HeadingTape::new(TapeGeometry::default(), 1.0);
        tape.set_target(5.0);
        let frame = tape.step();

        assert_eq!(frame.heading, 5.0);
        assert!((frame.tape_offset_px - 91.0).abs() < 1e-9);
        assert_eq!(frame.readout, 5);
        assert_eq!(frame.readout_text, "005°");
    }

    #[test]
    fn test_readout_wraps_near_north() {
        let mut tape = HeadingTape::new(TapeGeometry::default(), 1.0);
        tape.set_target(359.7);
        let frame = tape.step();
        assert_eq!(frame.readout, 0);
        assert_eq!(frame.readout_text, "000°");
    }

    #[test]
    fn test_short_way_round() {
        let mut tape = HeadingTape::default();
        tape.set_target(10.0);
        for _ in 0..100 {
            tape.step();
        }

        tape.set_target(350.0);
        let frame = tape.step();
        assert!((frame.heading - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_ticks_cover_two_turns() {
        let tape = HeadingTape::default();
        let ticks = tape.ticks();

        assert_eq!(ticks.len(), 72);
        assert_eq!(ticks[0].x, 0.0);
        assert!((ticks[71].x - 710.0 * 1.8).abs() < 1e-9);

        let labels: Vec<&str> = ticks[..36]
            .iter()
            .filter_map(|t| t.label.as_deref())
            .collect();
        assert_eq!(
            labels,
            vec!["N", "30", "60", "E", "120", "150", "S", "210", "240", "W", "300", "330"]
        );

        // Second pass repeats the first
        assert_eq!(ticks[36].label.as_deref(), Some("N"));
        assert!(ticks[36].cardinal);
        assert_eq!(ticks[36].degrees, 0);

        let minor = ticks.iter().find(|t| t.degrees == 40).unwrap();
        assert!(!minor.major);
        assert!(minor.label.is_none());
    }
}
