//! PID tuning trial

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Deserialize;

use crate::task::{Task, TaskCtx};
use hw_if::act::{ActId, ControlMode, PidGains};

use super::{Genome, Trial, TrialFactory, UNFIT_FITNESS};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the PID tuning trial, loaded from `pid_tune.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PidTuneParams {
    /// The actuator under tune
    pub act: ActId,

    /// Open-loop output used to retract onto the reverse limit before the
    /// trial, negative
    pub retract_output: f64,

    /// Maximum time allowed for the retract
    pub setup_timeout_s: f64,

    /// Position setpoints stepped through in order, one scored move each
    pub setpoints: Vec<f64>,

    /// Error band counting as settled
    pub settle_tolerance: f64,

    /// Time the error must stay in band for the move to count as settled
    pub settle_window_s: f64,

    /// Time budget per setpoint; moves still unsettled at the budget record
    /// the full budget as their stabilization time
    pub trial_budget_s: f64,

    /// Weight of mean overshoot against mean stabilization time in the
    /// fitness
    pub overshoot_weight: f64,
}

/// Evaluates one candidate gain set on the real actuator.
///
/// The actuator is first retracted onto its reverse limit switch so every
/// candidate starts the scored moves from the same position. During the
/// moves any limit switch trip means the candidate drove the mechanism into
/// its travel stops, which marks it unfit and aborts the trial.
pub struct PidTuneTask {
    params: PidTuneParams,
    gains: PidGains,

    state: TuneState,
    phase_start_s: f64,
    last_update_s: f64,

    /// The reverse limit is still held just after the retract; it must clear
    /// once before a reverse trip counts as unexpected
    cleared_rev_limit: bool,

    /// Sign of the current move, +1 for forward
    direction: f64,
    peak_overshoot: f64,
    stable_since_s: Option<f64>,

    overshoots: Vec<f64>,
    settle_times_s: Vec<f64>,
    /// Time-weighted absolute error over all moves, diagnostic only
    iae: f64,

    aborted: bool,
    fitness: f64,
    done: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

enum TuneState {
    /// Retract onto the reverse limit at fixed output
    Setup,

    /// Step through the scored setpoints in closed loop
    RunTrials { setpoint: usize },
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// A trial factory evaluating genomes as {kp, ki, kd, kf} gain sets.
pub fn pid_tune_factory(params: PidTuneParams) -> TrialFactory {
    Box::new(move |genome: &Genome| Box::new(PidTuneTask::new(params.clone(), genome)))
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PidTuneTask {
    pub fn new(params: PidTuneParams, genome: &Genome) -> Self {
        let g = genome.genes();
        let gains = PidGains {
            kp: g[0],
            ki: g[1],
            kd: g[2],
            kf: g[3],
        };

        Self {
            params,
            gains,
            state: TuneState::Setup,
            phase_start_s: 0.0,
            last_update_s: 0.0,
            cleared_rev_limit: false,
            direction: 1.0,
            peak_overshoot: 0.0,
            stable_since_s: None,
            overshoots: vec![],
            settle_times_s: vec![],
            iae: 0.0,
            aborted: false,
            fitness: UNFIT_FITNESS,
            done: false,
        }
    }

    fn abort(&mut self, ctx: &mut TaskCtx, reason: &str) {
        warn!("Tuning trial aborted: {}", reason);
        ctx.io.actuator_mut(self.params.act).stop();
        self.aborted = true;
        self.done = true;
    }

    /// Begin the scored move to the given setpoint.
    fn start_move(&mut self, setpoint: usize, ctx: &mut TaskCtx) {
        let target = self.params.setpoints[setpoint];
        let act = ctx.io.actuator_mut(self.params.act);
        self.direction = if target >= act.position() { 1.0 } else { -1.0 };
        act.set_target(target);

        self.peak_overshoot = 0.0;
        self.stable_since_s = None;
        self.phase_start_s = ctx.time_s;
        self.state = TuneState::RunTrials { setpoint };
    }

    /// Close out the current move with the given stabilization time.
    fn finish_move(&mut self, setpoint: usize, settle_time_s: f64, ctx: &mut TaskCtx) {
        self.overshoots.push(self.peak_overshoot);
        self.settle_times_s.push(settle_time_s);

        if setpoint + 1 < self.params.setpoints.len() {
            self.start_move(setpoint + 1, ctx);
        } else {
            let mean_overshoot =
                self.overshoots.iter().sum::<f64>() / self.overshoots.len() as f64;
            let mean_settle =
                self.settle_times_s.iter().sum::<f64>() / self.settle_times_s.len() as f64;

            self.fitness = 100.0
                / (self.params.overshoot_weight * mean_overshoot + mean_settle + 1.0);

            info!(
                "Trial done: fitness {:.3} (mean overshoot {:.3}, mean settle {:.2} s, \
                 IAE {:.2})",
                self.fitness, mean_overshoot, mean_settle, self.iae
            );

            ctx.io.actuator_mut(self.params.act).stop();
            self.done = true;
        }
    }
}

impl Task for PidTuneTask {
    fn begin(&mut self, ctx: &mut TaskCtx) {
        self.phase_start_s = ctx.time_s;
        self.last_update_s = ctx.time_s;

        let act = ctx.io.actuator_mut(self.params.act);
        act.set_mode(ControlMode::PercentOutput);
        act.set_output(self.params.retract_output);
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        let now = ctx.time_s;
        let dt = now - self.last_update_s;
        self.last_update_s = now;

        match self.state {
            TuneState::Setup => {
                if ctx.io.actuator(self.params.act).rev_limit() {
                    let act = ctx.io.actuator_mut(self.params.act);
                    act.set_output(0.0);
                    act.set_gains(self.gains);
                    act.set_mode(ControlMode::Position);

                    self.cleared_rev_limit = false;
                    self.start_move(0, ctx);
                } else if now - self.phase_start_s >= self.params.setup_timeout_s {
                    self.abort(ctx, "retract never reached the reverse limit");
                }
            }
            TuneState::RunTrials { setpoint } => {
                let act = ctx.io.actuator(self.params.act);
                let pos = act.position();
                let err = act.error();
                let rev = act.rev_limit();
                let fwd = act.fwd_limit();

                if !rev {
                    self.cleared_rev_limit = true;
                }
                if fwd || (rev && self.cleared_rev_limit) {
                    self.abort(ctx, "limit switch tripped during a scored move");
                    return;
                }

                self.iae += err.abs() * dt;

                let over = self.direction * (pos - self.params.setpoints[setpoint]);
                if over > self.peak_overshoot {
                    self.peak_overshoot = over;
                }

                if err.abs() <= self.params.settle_tolerance {
                    let since = *self.stable_since_s.get_or_insert(now);
                    if now - since >= self.params.settle_window_s {
                        self.finish_move(setpoint, since - self.phase_start_s, ctx);
                        return;
                    }
                } else {
                    self.stable_since_s = None;
                }

                if now - self.phase_start_s >= self.params.trial_budget_s {
                    self.finish_move(setpoint, self.params.trial_budget_s, ctx);
                }
            }
        }
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        ctx.io.actuator_mut(self.params.act).stop();
    }

    fn end(&mut self, ctx: &mut TaskCtx) {
        ctx.io.actuator_mut(self.params.act).stop();
    }

    fn has_completed(&self) -> bool {
        self.done
    }
}

impl Trial for PidTuneTask {
    fn fitness(&self) -> f64 {
        if self.aborted {
            UNFIT_FITNESS
        } else {
            self.fitness
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::Range;
    use super::*;
    use crate::ops::OperationState;
    use crate::task::FaultPolicy;
    use hw_if::sim::SimRig;

    fn params() -> PidTuneParams {
        PidTuneParams {
            act: ActId::Elevator,
            retract_output: -0.4,
            setup_timeout_s: 20.0,
            setpoints: vec![40.0, 10.0],
            settle_tolerance: 1.0,
            settle_window_s: 0.25,
            trial_budget_s: 15.0,
            overshoot_weight: 2.0,
        }
    }

    fn bounds() -> Vec<Range> {
        vec![
            Range::new(0.0, 2.0).unwrap(),
            Range::new(0.0, 0.5).unwrap(),
            Range::new(0.0, 1.0).unwrap(),
            Range::new(0.0, 1.0).unwrap(),
        ]
    }

    /// Drive the trial on a sim rig until it completes, returning the task.
    fn run(genes: [f64; 4], start_pos: f64) -> PidTuneTask {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        rig.actuator_sim_mut(ActId::Elevator).set_position(start_pos);

        let genome = Genome::from_values(&genes, &bounds());
        let mut task = PidTuneTask::new(params(), &genome);

        let dt = 0.02;
        let mut time_s = 0.0;

        {
            let mut ctx = TaskCtx {
                time_s,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            task.begin(&mut ctx);
        }

        let mut cycles = 0;
        while !task.has_completed() && cycles < 10_000 {
            time_s += dt;
            rig.step(dt);
            let mut ctx = TaskCtx {
                time_s,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            task.update(&mut ctx);
            cycles += 1;
        }

        assert!(task.has_completed(), "trial never completed");
        task
    }

    #[test]
    fn test_reasonable_gains_score_fit() {
        let task = run([0.5, 0.0, 0.05, 0.0], 30.0);

        assert!(!task.aborted);
        let fitness = task.fitness();
        assert!(fitness > 0.0 && fitness <= 100.0, "fitness {}", fitness);
        assert_eq!(task.settle_times_s.len(), 2);
    }

    #[test]
    fn test_zero_gains_never_settle_and_record_budget() {
        let task = run([0.0, 0.0, 0.0, 0.0], 30.0);

        // The actuator never moves off the reverse limit, every move burns
        // its full budget
        assert!(!task.aborted);
        for settle in &task.settle_times_s {
            assert_eq!(*settle, params().trial_budget_s);
        }
        assert!(task.fitness() < 100.0 / params().trial_budget_s);
    }

    /// A limit trip outside Setup must mark the organism unfit no matter
    /// how well it was scoring.
    #[test]
    fn test_limit_trip_outside_setup_marks_unfit() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        rig.actuator_sim_mut(ActId::Elevator).set_position(30.0);

        let genome = Genome::from_values(&[0.5, 0.0, 0.05, 0.0], &bounds());
        let mut task = PidTuneTask::new(params(), &genome);

        let dt = 0.02;
        let mut time_s = 0.0;

        {
            let mut ctx = TaskCtx {
                time_s,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            task.begin(&mut ctx);
        }

        // Run the retract to completion
        while matches!(task.state, TuneState::Setup) {
            time_s += dt;
            rig.step(dt);
            let mut ctx = TaskCtx {
                time_s,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            task.update(&mut ctx);
        }

        // Shove the plant onto the forward limit mid-move
        rig.actuator_sim_mut(ActId::Elevator).set_position(100.0);
        time_s += dt;
        let mut ctx = TaskCtx {
            time_s,
            ops: &mut ops,
            io: &mut rig,
            policy: FaultPolicy::Strict,
        };
        task.update(&mut ctx);

        assert!(task.has_completed());
        assert!(task.aborted);
        assert_eq!(task.fitness(), UNFIT_FITNESS);
    }

    /// Better gains must score better on the same rig.
    #[test]
    fn test_fitness_orders_candidates() {
        let good = run([0.5, 0.0, 0.05, 0.0], 30.0);
        let sluggish = run([0.05, 0.0, 0.0, 0.0], 30.0);

        assert!(
            good.fitness() > sluggish.fitness(),
            "good {} vs sluggish {}",
            good.fitness(),
            sluggish.fitness()
        );
    }
}
