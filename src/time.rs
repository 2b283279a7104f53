use std::time::{Duration, Instant};

pub struct Time {
    start: Instant,
    last: Instant,
    pub delta: Duration,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, delta: Duration::from_secs_f32(0.0) }
    }
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last;
        self.last = now;
    }
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts variable real frame time into a deterministic number of
/// fixed-size logical steps. The clock is the only owner of wall time;
/// everything downstream sees `fixed_dt` and nothing else.
pub struct StepClock {
    time: Time,
    accumulator: f32,
    fixed_dt: f32,
    max_frame_time: f32,
}

/// Outcome of sampling one real frame.
pub struct FrameSample {
    pub dt: f32,
    /// Accumulator overflow discarded by the frame-time clamp, if any.
    /// A stall (debugger pause, OS preemption) shows up here instead of
    /// triggering an unbounded catch-up burst.
    pub dropped_backlog: Option<f32>,
}

impl StepClock {
    pub fn new(fixed_dt: f32, max_frame_time: f32) -> Self {
        Self { time: Time::new(), accumulator: 0.0, fixed_dt, max_frame_time }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Sample the wall clock once per real frame and feed the accumulator.
    pub fn tick(&mut self) -> FrameSample {
        self.time.tick();
        let dt = self.time.delta_seconds();
        let dropped_backlog = self.accumulate(dt);
        FrameSample { dt, dropped_backlog }
    }

    /// Feed one frame's elapsed time, clamping the backlog so a stall can
    /// never trigger an unbounded catch-up burst. Returns the discarded
    /// overflow, if any.
    pub fn accumulate(&mut self, frame_dt: f32) -> Option<f32> {
        self.accumulator += frame_dt.max(0.0);
        if self.accumulator > self.max_frame_time {
            let dropped = self.accumulator - self.max_frame_time;
            self.accumulator = self.max_frame_time;
            return Some(dropped);
        }
        None
    }

    /// Take one fixed step off the accumulator, if enough time has built up.
    pub fn pop_fixed_step(&mut self) -> Option<f32> {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            Some(self.fixed_dt)
        } else {
            None
        }
    }
}
