//! # Actuator contract
//!
//! Per-actuator interface consumed by the control core. The real
//! implementations wrap smart motor controllers which evaluate the closed
//! position loop on-device; the core only selects modes, targets and gains.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Closed-loop controller gains for an actuator.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    /// Feedforward term applied to the target
    pub kf: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuators available to the robot
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ActId {
    /// Left side drive group
    DrvL,

    /// Right side drive group
    DrvR,

    /// Elevator carriage winch
    Elevator,

    /// Cargo intake rollers
    Intake,

    /// Climber winch
    Climber,
}

/// Control mode of an actuator's motor controller.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlMode {
    /// Open loop, demand is a fraction of full output in [-1, 1]
    PercentOutput,

    /// Closed position loop evaluated on the controller using the set gains
    Position,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Contract for a single actuator channel.
///
/// All reads and writes are cheap register-style operations, they must never
/// block the control cycle.
pub trait Actuator {
    /// Select the control mode for subsequent demands.
    fn set_mode(&mut self, mode: ControlMode);

    /// Set the closed-loop gains. Only meaningful in [`ControlMode::Position`].
    fn set_gains(&mut self, gains: PidGains);

    /// Set the open-loop output demand, a fraction of full output in [-1, 1].
    fn set_output(&mut self, output: f64);

    /// Set the closed-loop target position in sensor units.
    fn set_target(&mut self, target: f64);

    /// Current measured position in sensor units.
    fn position(&self) -> f64;

    /// Current measured velocity in sensor units per second.
    fn velocity(&self) -> f64;

    /// Current closed-loop error (target - position), 0.0 in open loop.
    fn error(&self) -> f64;

    /// True if the forward travel limit switch is pressed.
    fn fwd_limit(&self) -> bool;

    /// True if the reverse travel limit switch is pressed.
    fn rev_limit(&self) -> bool;

    /// Zero the output and drop back to open loop.
    fn stop(&mut self);
}
