use std::time::Duration;

/// Fixed-timestep accumulator.
///
/// Feed it variable frame time with [`advance`](Self::advance) and run one
/// simulation tick per returned step. Backlog is capped at `max_steps` so a
/// stall drops time instead of spiralling.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedStep {
    pub fn new(rate_hz: f32, max_steps: u32) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 { rate_hz } else { 60.0 };
        Self {
            step: 1.0 / rate,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    /// Seconds per tick.
    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    #[inline]
    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f32(self.step)
    }

    /// Adds `dt` seconds and returns how many fixed ticks are due.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }

        let due = (self.accumulator / self.step).floor() as u32;
        if due > self.max_steps {
            log::debug!("fixed step: dropping {} ticks of backlog", due - self.max_steps);
            self.accumulator = 0.0;
            return self.max_steps;
        }
        self.accumulator -= due as f32 * self.step;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_partial_frames() {
        let mut f = FixedStep::new(100.0, 8);
        assert_eq!(f.advance(0.004), 0);
        assert_eq!(f.advance(0.004), 0);
        assert_eq!(f.advance(0.004), 1);
        // Leftover 2 ms carries into the next tick.
        assert_eq!(f.advance(0.009), 1);
    }

    #[test]
    fn backlog_is_capped() {
        let mut f = FixedStep::new(60.0, 4);
        assert_eq!(f.advance(10.0), 4);
        // Dropped backlog is not replayed.
        assert_eq!(f.advance(0.0), 0);
    }

    #[test]
    fn ignores_bad_dt() {
        let mut f = FixedStep::new(60.0, 4);
        assert_eq!(f.advance(-1.0), 0);
        assert_eq!(f.advance(f32::NAN), 0);
    }
}
