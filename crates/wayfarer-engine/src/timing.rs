//! Tick pacing.
//!
//! Converts wall-clock time into a whole number of fixed simulation steps
//! and keeps a rolling average of how long each step took to compute.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-step tick clock.
#[derive(Debug)]
pub struct TickClock {
    /// Ticks per second
    tick_rate: u32,
    /// Seconds per tick
    step: f32,
    /// Time of the last frame sample
    last_frame: Instant,
    /// Unconsumed wall-clock time
    accumulator: f32,
    /// Maximum frame delta accepted (prevents spiral of death)
    max_dt: f32,
    /// Most steps handed out per frame
    max_steps: u32,
    /// Recent tick compute times in seconds
    tick_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(20)
    }
}

impl TickClock {
    /// Create a clock producing `tick_rate` steps per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            step: 1.0 / tick_rate as f32,
            last_frame: Instant::now(),
            accumulator: 0.0,
            max_dt: 0.25,
            max_steps: 10,
            tick_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Ticks per second.
    #[must_use]
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds per tick.
    #[must_use]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Wall-clock time since the previous call, clamped to `max_dt`.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(self.max_dt)
    }

    /// Adds frame time and returns how many steps to run now.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.clamp(0.0, self.max_dt);
        let mut count = 0;
        while self.accumulator >= self.step && count < self.max_steps {
            self.accumulator -= self.step;
            count += 1;
        }

        // Still behind: drop the backlog instead of catching up.
        if self.accumulator > self.step * 2.0 {
            self.accumulator = 0.0;
        }
        count
    }

    /// Time until the next step is due.
    #[must_use]
    pub fn until_next_step(&self) -> Duration {
        Duration::from_secs_f32((self.step - self.accumulator).max(0.0))
    }

    /// Records how long one tick took to compute.
    pub fn record_tick(&mut self, elapsed: Duration) {
        self.tick_times.push_back(elapsed.as_secs_f32());
        if self.tick_times.len() > self.max_samples {
            self.tick_times.pop_front();
        }
    }

    /// Average tick compute time in milliseconds.
    #[must_use]
    pub fn average_tick_ms(&self) -> f32 {
        if self.tick_times.is_empty() {
            return 0.0;
        }
        (self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32) * 1000.0
    }

    /// Reset timing (call after a pause).
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.accumulator = 0.0;
        self.tick_times.clear();
    }
}
