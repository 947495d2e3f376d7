// First-order exponential smoothing for linear and circular quantities
//
// Each `step` moves `current` a fixed fraction of the way to `target`. The
// rate is per tick, so convergence in wall-clock time depends on the tick
// cadence.

/// Fraction of the remaining distance covered per tick
pub const SMOOTHING_FACTOR: f64 = 0.3;

/// Full turn in degrees
const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = 180.0;

/// Wrap an angle into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    ((angle % FULL_TURN) + FULL_TURN) % FULL_TURN
}

/// Signed delta from `current` to `target` along the shorter arc
pub fn shortest_delta(current: f64, target: f64) -> f64 {
    let mut delta = target - current;
    if delta > HALF_TURN {
        delta -= FULL_TURN;
    }
    if delta < -HALF_TURN {
        delta += FULL_TURN;
    }
    delta
}

/// Smoothed scalar such as pitch or roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSmoother {
    target: f64,
    current: f64,
    alpha: f64,
}

impl LinearSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            target: 0.0,
            current: 0.0,
            alpha,
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Advance one tick and return the new current value
    pub fn step(&mut self) -> f64 {
        self.current += (self.target - self.current) * self.alpha;
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

impl Default for LinearSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_FACTOR)
    }
}

/// Smoothed heading in degrees, always taking the shorter way around
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularSmoother {
    target: f64,
    current: f64,
    alpha: f64,
}

impl CircularSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            target: 0.0,
            current: 0.0,
            alpha,
        }
    }

    /// Start from a known heading instead of north
    pub fn starting_at(alpha: f64, heading: f64) -> Self {
        let heading = normalize_degrees(heading);
        Self {
            target: heading,
            current: heading,
            alpha,
        }
    }

    /// Targets outside [0, 360) are accepted as-is; `current` is renormalized each step
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Advance one tick and return the new current heading in [0, 360)
    pub fn step(&mut self) -> f64 {
        let delta = shortest_delta(self.current, self.target);
        self.current = normalize_degrees(self.current + delta * self.alpha);
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

impl Default for CircularSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_linear_converges() {
        let mut pitch = LinearSmoother::default();
        pitch.set_target(10.0);

        assert!((pitch.step() - 3.0).abs() < EPS);
        assert!((pitch.step() - 5.1).abs() < EPS);

        for _ in 0..100 {
            pitch.step();
        }
        assert!((pitch.current() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_target_jump_keeps_current_continuous() {
        let mut roll = LinearSmoother::default();
        roll.set_target(30.0);
        let before = roll.step();
        roll.set_target(-30.0);
        let after = roll.step();

        // One tick moves at most alpha of the gap
        assert!((after - before).abs() <= (before + 30.0).abs() * SMOOTHING_FACTOR + EPS);
    }

    #[test]
    fn test_shortest_delta_across_north() {
        assert!((shortest_delta(10.0, 350.0) + 20.0).abs() < EPS);
        assert!((shortest_delta(350.0, 10.0) - 20.0).abs() < EPS);
        assert!((shortest_delta(90.0, 270.0) - 180.0).abs() < EPS);
        assert!((shortest_delta(0.0, 45.0) - 45.0).abs() < EPS);
    }

    #[test]
    fn test_heading_moves_through_north() {
        let mut heading = CircularSmoother::starting_at(SMOOTHING_FACTOR, 10.0);
        heading.set_target(350.0);

        let first = heading.step();
        assert!((first - 4.0).abs() < EPS);

        let second = heading.step();
        // 4 - 14 * 0.3 wraps below zero
        assert!((second - 359.8).abs() < 1e-6);

        for _ in 0..200 {
            let h = heading.step();
            // Never swings through south
            assert!(h < 15.0 || h > 345.0, "heading went the long way: {}", h);
        }
        assert!((heading.current() - 350.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_stays_normalized_with_unwrapped_target() {
        let mut heading = CircularSmoother::default();
        heading.set_target(370.0);

        for _ in 0..1000 {
            let h = heading.step();
            assert!((0.0..360.0).contains(&h), "out of range: {}", h);
        }
        assert!((heading.current() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!((normalize_degrees(-90.0) - 270.0).abs() < EPS);
        assert!((normalize_degrees(725.0) - 5.0).abs() < EPS);
        assert!(normalize_degrees(-1e-20) < 360.0);
    }
}
