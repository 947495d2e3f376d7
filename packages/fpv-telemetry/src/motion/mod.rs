// Instrument motion - smoothing of noisy, irregular targets into per-tick screen state
//
// Architecture:
// - `smoothing`: exponential filters for linear and circular quantities
// - `engine`: the recurring tick task bound to one instrument's lifetime
// - `attitude`: pitch/roll indicator (linear) with ladder and roll-scale geometry
// - `heading`: wrap-around heading tape (circular) with two-turn tick set

pub mod attitude;
pub mod engine;
pub mod heading;
pub mod smoothing;

pub use attitude::{
    roll_scale, AttitudeFrame, AttitudeGeometry, AttitudeIndicator, AttitudeTarget, PitchRung,
    RollTick,
};
pub use engine::{Instrument, MotionEngine, DEFAULT_TICK_INTERVAL, MIN_TICK_INTERVAL};
pub use heading::{HeadingFrame, HeadingTape, TapeGeometry, TapeTick};
pub use smoothing::{
    normalize_degrees, shortest_delta, CircularSmoother, LinearSmoother, SMOOTHING_FACTOR,
};
