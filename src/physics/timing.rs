//! Timestep selection and timing statistics of an engine.

use std::collections::VecDeque;

/// How an engine picks the length of each tick. All times are in milliseconds.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct TimestepParams {
    /// Nominal ticks per second. The fixed delta is `1000 / fps`.
    pub fps: f64,
    /// Use the nominal delta every tick instead of measuring wall clock time.
    pub is_fixed: bool,
    pub delta_min: f64,
    pub delta_max: f64,
    /// Number of measured deltas the variable timestep takes the minimum of.
    pub delta_sample_size: usize,
    /// Initial time scale of the engine.
    pub time_scale: f64,
}

impl Default for TimestepParams {
    fn default() -> Self {
        Self {
            fps: 60.0,
            is_fixed: true,
            delta_min: 1000.0 / 60.0,
            delta_max: 1000.0 / 30.0,
            delta_sample_size: 60,
            time_scale: 1.0,
        }
    }
}

impl TimestepParams {
    #[inline]
    pub fn nominal_delta(&self) -> f64 {
        1000.0 / self.fps
    }
}

/// Simulation clock and statistics.
#[derive(Clone, Debug)]
pub struct Timing {
    /// Speed of simulated time relative to the deltas passed in.
    /// 0 freezes the simulation.
    pub time_scale: f64,
    pub(crate) timestamp: f64,
    pub(crate) last_delta: f64,
    pub(crate) last_elapsed: f64,
    delta: f64,
    correction: f64,
    time_prev: Option<f64>,
    time_scale_prev: f64,
    delta_history: VecDeque<f64>,
    fps: f64,
    frame_counter: u32,
    counter_timestamp: f64,
}

impl Timing {
    pub fn new(params: &TimestepParams) -> Self {
        Self {
            time_scale: params.time_scale,
            timestamp: 0.0,
            last_delta: 0.0,
            last_elapsed: 0.0,
            delta: params.nominal_delta(),
            correction: 1.0,
            time_prev: None,
            time_scale_prev: 0.0,
            delta_history: VecDeque::with_capacity(params.delta_sample_size),
            fps: params.fps,
            frame_counter: 0,
            counter_timestamp: 0.0,
        }
    }

    /// Simulated time since the engine was created.
    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Scaled length of the last tick.
    #[inline]
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    /// Wall clock time the last update took to compute.
    #[inline]
    pub fn last_elapsed(&self) -> f64 {
        self.last_elapsed
    }

    /// Delta chosen by the last call to `Engine::tick`.
    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[inline]
    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Measured ticks per second, refreshed about once a second.
    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Advance the clock by a tick of `delta`, returning the timestamp before the tick.
    pub(crate) fn advance(&mut self, delta: f64) -> f64 {
        let previous = self.timestamp;
        self.timestamp += delta * self.time_scale;
        self.last_delta = delta * self.time_scale;
        previous
    }

    /// Pick the delta and correction factor of a tick happening at wall clock `time`.
    pub(crate) fn next_step(&mut self, time: f64, params: &TimestepParams) -> (f64, f64) {
        let mut correction = 1.0;

        let delta = if params.is_fixed {
            params.nominal_delta()
        } else {
            let measured = self.time_prev.map_or(self.delta, |prev| time - prev);

            // the smallest recent delta is the most stable estimate
            if self.delta_history.len() >= params.delta_sample_size.max(1) {
                self.delta_history.pop_front();
            }
            self.delta_history.push_back(measured);
            let smallest = self
                .delta_history
                .iter()
                .copied()
                .fold(f64::MAX, f64::min);
            let delta = smallest.clamp(params.delta_min, params.delta_max);

            correction = delta / self.delta;
            delta
        };
        self.delta = delta;
        self.time_prev = Some(time);

        if self.time_scale_prev != 0.0 {
            correction *= self.time_scale / self.time_scale_prev;
        }
        if self.time_scale == 0.0 {
            correction = 0.0;
        }
        self.time_scale_prev = self.time_scale;
        self.correction = correction;

        self.frame_counter += 1;
        let since_count = time - self.counter_timestamp;
        if since_count >= 1000.0 {
            self.fps = self.frame_counter as f64 / (since_count / 1000.0);
            self.counter_timestamp = time;
            self.frame_counter = 0;
        }

        tracing::trace!(delta, correction, "timestep selected");
        (delta, correction)
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fixed_timestep() {
        let params = TimestepParams::default();
        let mut timing = Timing::new(&params);
        for time in [0.0, 3.0, 500.0] {
            let (delta, correction) = timing.next_step(time, &params);
            assert!(approx(delta, 1000.0 / 60.0));
            assert_eq!(correction, 1.0);
        }

        assert_eq!(timing.advance(10.0), 0.0);
        assert_eq!(timing.advance(10.0), 10.0);
        timing.time_scale = 0.5;
        timing.advance(10.0);
        assert!(approx(timing.timestamp(), 25.0));
        assert!(approx(timing.last_delta(), 5.0));
    }

    #[test]
    fn variable_timestep_is_clamped() {
        let params = TimestepParams {
            is_fixed: false,
            delta_sample_size: 1,
            ..Default::default()
        };
        let mut timing = Timing::new(&params);

        let (delta, _) = timing.next_step(0.0, &params);
        assert!(approx(delta, 1000.0 / 60.0));

        // too short
        let (delta, correction) = timing.next_step(5.0, &params);
        assert!(approx(delta, params.delta_min));
        assert!(approx(correction, 1.0));

        // too long
        let (delta, correction) = timing.next_step(200.0, &params);
        assert!(approx(delta, params.delta_max));
        assert!(approx(correction, 2.0));
    }

    #[test]
    fn variable_timestep_takes_window_minimum() {
        let params = TimestepParams {
            is_fixed: false,
            delta_sample_size: 3,
            delta_max: 100.0,
            ..Default::default()
        };
        let mut timing = Timing::new(&params);
        timing.next_step(0.0, &params);
        timing.next_step(25.0, &params);
        let (delta, _) = timing.next_step(75.0, &params);
        // window holds the nominal first delta, 25 and 50
        assert!(approx(delta, 1000.0 / 60.0));
        let (delta, _) = timing.next_step(105.0, &params);
        assert!(approx(delta, 25.0));
        let (delta, _) = timing.next_step(145.0, &params);
        assert!(approx(delta, 30.0));
    }

    #[test]
    fn time_scale_changes_correct_the_step() {
        let params = TimestepParams::default();
        let mut timing = Timing::new(&params);
        timing.next_step(0.0, &params);
        timing.time_scale = 0.5;
        let (_, correction) = timing.next_step(16.0, &params);
        assert!(approx(correction, 0.5));
        timing.time_scale = 0.0;
        let (_, correction) = timing.next_step(32.0, &params);
        assert_eq!(correction, 0.0);
    }

    #[test]
    fn fps_counter() {
        let params = TimestepParams::default();
        let mut timing = Timing::new(&params);
        for time in [100.0, 400.0, 700.0, 1000.0] {
            timing.next_step(time, &params);
        }
        assert!(approx(timing.fps(), 4.0));
    }
}
