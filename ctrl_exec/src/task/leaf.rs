//! Leaf task behaviors

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;

use crate::ops::{OpValue, Operation};
use hw_if::act::{ActId, ControlMode, PidGains};
use hw_if::input::DinId;

use super::{Task, TaskCtx};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Holds a set of operation values for a fixed duration, then restores their
/// neutral values.
///
/// With an empty value set this is a pure wait.
pub struct TimedTask {
    values: Vec<(Operation, OpValue)>,
    owned: Vec<Operation>,
    duration_s: f64,
    start_s: f64,
    done: bool,
}

/// Does nothing and completes immediately.
///
/// Used as the degraded fallback when a macro or routine cannot be
/// constructed, so the robot never ends up with an undefined operation
/// state.
pub struct FillerTask;

/// Completes once a digital input channel reads the wanted value.
pub struct WaitForDigitalTask {
    channel: DinId,
    wanted: bool,
    done: bool,
}

/// Drives one actuator to a position in closed loop.
///
/// Completes once the closed-loop error has stayed inside the tolerance for
/// the settle window. A hard timeout bounds the run time, as every leaf task
/// must bound its own.
pub struct PositionMoveTask {
    act: ActId,
    target: f64,
    gains: Option<PidGains>,
    tolerance: f64,
    settle_window_s: f64,
    timeout_s: f64,

    start_s: f64,
    stable_since_s: Option<f64>,
    done: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TimedTask {
    pub fn new(values: Vec<(Operation, OpValue)>, duration_s: f64) -> Self {
        let owned = values.iter().map(|(op, _)| *op).collect();
        Self {
            values,
            owned,
            duration_s,
            start_s: 0.0,
            done: false,
        }
    }

    /// A pure wait with no operation claims.
    pub fn wait(duration_s: f64) -> Self {
        Self::new(vec![], duration_s)
    }

    fn write_values(&self, ctx: &mut TaskCtx) {
        for (op, value) in &self.values {
            ctx.write(*op, *value);
        }
    }

    fn restore_values(&self, ctx: &mut TaskCtx) {
        for op in &self.owned {
            ctx.ops.reset(*op);
        }
    }
}

impl Task for TimedTask {
    fn begin(&mut self, ctx: &mut TaskCtx) {
        self.start_s = ctx.time_s;
        self.write_values(ctx);
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        self.write_values(ctx);

        if ctx.time_s - self.start_s >= self.duration_s {
            self.done = true;
        }
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        self.restore_values(ctx);
    }

    fn end(&mut self, ctx: &mut TaskCtx) {
        self.restore_values(ctx);
    }

    fn has_completed(&self) -> bool {
        self.done
    }

    fn owned_ops(&self) -> &[Operation] {
        &self.owned
    }
}

impl Task for FillerTask {
    fn begin(&mut self, _ctx: &mut TaskCtx) {}

    fn update(&mut self, _ctx: &mut TaskCtx) {}

    fn stop(&mut self, _ctx: &mut TaskCtx) {}

    fn end(&mut self, _ctx: &mut TaskCtx) {}

    fn has_completed(&self) -> bool {
        true
    }
}

impl WaitForDigitalTask {
    pub fn new(channel: DinId, wanted: bool) -> Self {
        Self {
            channel,
            wanted,
            done: false,
        }
    }
}

impl Task for WaitForDigitalTask {
    fn begin(&mut self, _ctx: &mut TaskCtx) {}

    fn update(&mut self, ctx: &mut TaskCtx) {
        if ctx.io.digital(self.channel) == self.wanted {
            self.done = true;
        }
    }

    fn stop(&mut self, _ctx: &mut TaskCtx) {}

    fn end(&mut self, _ctx: &mut TaskCtx) {}

    fn has_completed(&self) -> bool {
        self.done
    }
}

impl PositionMoveTask {
    pub fn new(
        act: ActId,
        target: f64,
        gains: Option<PidGains>,
        tolerance: f64,
        settle_window_s: f64,
        timeout_s: f64,
    ) -> Self {
        Self {
            act,
            target,
            gains,
            tolerance,
            settle_window_s,
            timeout_s,
            start_s: 0.0,
            stable_since_s: None,
            done: false,
        }
    }
}

impl Task for PositionMoveTask {
    fn begin(&mut self, ctx: &mut TaskCtx) {
        self.start_s = ctx.time_s;

        let act = ctx.io.actuator_mut(self.act);
        if let Some(gains) = self.gains {
            act.set_gains(gains);
        }
        act.set_mode(ControlMode::Position);
        act.set_target(self.target);
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        let now = ctx.time_s;
        let err = ctx.io.actuator(self.act).error();

        // Completion requires the error to stay within tolerance for the
        // whole settle window
        if err.abs() <= self.tolerance {
            let since = *self.stable_since_s.get_or_insert(now);
            if now - since >= self.settle_window_s {
                self.done = true;
            }
        } else {
            self.stable_since_s = None;
        }

        if now - self.start_s >= self.timeout_s {
            warn!(
                "PositionMoveTask for {:?} timed out after {} s, error still {:.3}",
                self.act, self.timeout_s, err
            );
            self.done = true;
        }
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        ctx.io.actuator_mut(self.act).stop();
    }

    fn end(&mut self, ctx: &mut TaskCtx) {
        ctx.io.actuator_mut(self.act).stop();
    }

    fn has_completed(&self) -> bool {
        self.done
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
