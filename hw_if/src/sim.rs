//! # Simulated rig
//!
//! A bench stand-in for the robot's I/O: first-order actuator plants with
//! travel limits and an on-controller position loop, plus pinned sensor and
//! driver-station values. Used by the tuning executable when no robot is
//! attached, and by the test suites.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use crate::act::{ActId, Actuator, ControlMode, PidGains};
use crate::bus::IoBus;
use crate::input::{AinId, AxisId, DinId, TrigId};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Band at either end of travel within which a limit switch reads pressed
const LIMIT_SWITCH_BAND: f64 = 1e-3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Physical configuration of a simulated actuator.
#[derive(Debug, Copy, Clone)]
pub struct SimActConfig {
    /// Minimum position in sensor units
    pub min_pos: f64,

    /// Maximum position in sensor units
    pub max_pos: f64,

    /// Speed at full output, sensor units per second
    pub max_speed: f64,

    /// First-order response time constant in seconds
    pub time_constant_s: f64,
}

/// First-order plant behind a simulated smart motor controller.
#[derive(Debug, Clone)]
pub struct SimActuator {
    config: SimActConfig,

    mode: ControlMode,
    gains: PidGains,
    output: f64,
    target: f64,

    pos: f64,
    vel: f64,
    err_integral: f64,
}

/// Simulated I/O bus.
///
/// All actuator channels exist from construction; sensor and driver-station
/// channels read their neutral value until pinned by the test or script.
pub struct SimRig {
    acts: HashMap<ActId, SimActuator>,
    din: HashMap<DinId, bool>,
    ain: HashMap<AinId, f64>,
    trig: HashMap<TrigId, bool>,
    axes: HashMap<AxisId, f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimActConfig {
    fn default() -> Self {
        Self {
            min_pos: 0.0,
            max_pos: 100.0,
            max_speed: 50.0,
            time_constant_s: 0.1,
        }
    }
}

impl SimActuator {
    pub fn new(config: SimActConfig) -> Self {
        Self {
            config,
            mode: ControlMode::PercentOutput,
            gains: PidGains::default(),
            output: 0.0,
            target: 0.0,
            pos: config.min_pos,
            vel: 0.0,
            err_integral: 0.0,
        }
    }

    /// Advance the plant by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        // Demand as a fraction of full output
        let demand = match self.mode {
            ControlMode::PercentOutput => self.output,
            ControlMode::Position => {
                let err = self.target - self.pos;
                self.err_integral += err * dt_s;

                self.gains.kp * err + self.gains.ki * self.err_integral - self.gains.kd * self.vel
                    + self.gains.kf * self.target
            }
        };
        let demand = demand.max(-1.0).min(1.0);

        // First-order velocity response towards the demanded speed
        let cmd_vel = demand * self.config.max_speed;
        let alpha = (dt_s / self.config.time_constant_s).min(1.0);
        self.vel += (cmd_vel - self.vel) * alpha;

        // Integrate position, hard stop at the ends of travel
        self.pos += self.vel * dt_s;
        if self.pos <= self.config.min_pos {
            self.pos = self.config.min_pos;
            self.vel = 0.0;
        }
        if self.pos >= self.config.max_pos {
            self.pos = self.config.max_pos;
            self.vel = 0.0;
        }
    }

    /// Teleport the plant to a position, for test setup.
    pub fn set_position(&mut self, pos: f64) {
        self.pos = pos;
        self.vel = 0.0;
    }
}

impl Actuator for SimActuator {
    fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            self.err_integral = 0.0;
        }
        self.mode = mode;
    }

    fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        self.err_integral = 0.0;
    }

    fn set_output(&mut self, output: f64) {
        self.output = output.max(-1.0).min(1.0);
    }

    fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    fn position(&self) -> f64 {
        self.pos
    }

    fn velocity(&self) -> f64 {
        self.vel
    }

    fn error(&self) -> f64 {
        match self.mode {
            ControlMode::Position => self.target - self.pos,
            ControlMode::PercentOutput => 0.0,
        }
    }

    fn fwd_limit(&self) -> bool {
        self.pos >= self.config.max_pos - LIMIT_SWITCH_BAND
    }

    fn rev_limit(&self) -> bool {
        self.pos <= self.config.min_pos + LIMIT_SWITCH_BAND
    }

    fn stop(&mut self) {
        self.mode = ControlMode::PercentOutput;
        self.output = 0.0;
    }
}

impl SimRig {
    /// Build a rig with every actuator channel present, using the given
    /// per-actuator configurations (default for any not listed).
    pub fn new(configs: &[(ActId, SimActConfig)]) -> Self {
        let mut acts = HashMap::new();

        for id in &[
            ActId::DrvL,
            ActId::DrvR,
            ActId::Elevator,
            ActId::Intake,
            ActId::Climber,
        ] {
            let config = configs
                .iter()
                .find(|(cid, _)| cid == id)
                .map(|(_, c)| *c)
                .unwrap_or_default();
            acts.insert(*id, SimActuator::new(config));
        }

        Self {
            acts,
            din: HashMap::new(),
            ain: HashMap::new(),
            trig: HashMap::new(),
            axes: HashMap::new(),
        }
    }

    /// Advance all actuator plants by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        for act in self.acts.values_mut() {
            act.step(dt_s);
        }
    }

    /// Borrow a simulated actuator concretely, for test setup such as
    /// teleporting the plant with [`SimActuator::set_position`].
    pub fn actuator_sim_mut(&mut self, id: ActId) -> &mut SimActuator {
        self.acts
            .get_mut(&id)
            .expect("all actuator channels exist from construction")
    }

    /// Pin a digital sensor channel to a value.
    pub fn set_digital(&mut self, ch: DinId, value: bool) {
        self.din.insert(ch, value);
    }

    /// Pin an analog sensor channel to a value.
    pub fn set_analog(&mut self, ch: AinId, value: f64) {
        self.ain.insert(ch, value);
    }

    /// Pin a driver-station trigger to a held state.
    pub fn set_trigger(&mut self, ch: TrigId, held: bool) {
        self.trig.insert(ch, held);
    }

    /// Pin a driver-station axis to a value.
    pub fn set_axis(&mut self, ch: AxisId, value: f64) {
        self.axes.insert(ch, value);
    }
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl IoBus for SimRig {
    fn digital(&self, ch: DinId) -> bool {
        self.din.get(&ch).copied().unwrap_or(false)
    }

    fn analog(&self, ch: AinId) -> f64 {
        self.ain.get(&ch).copied().unwrap_or(0.0)
    }

    fn trigger(&self, ch: TrigId) -> bool {
        self.trig.get(&ch).copied().unwrap_or(false)
    }

    fn axis(&self, ch: AxisId) -> f64 {
        self.axes.get(&ch).copied().unwrap_or(0.0)
    }

    fn actuator_mut(&mut self, id: ActId) -> &mut dyn Actuator {
        self.acts
            .get_mut(&id)
            .expect("all actuator channels exist from construction")
    }

    fn actuator(&self, id: ActId) -> &dyn Actuator {
        self.acts
            .get(&id)
            .expect("all actuator channels exist from construction")
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
