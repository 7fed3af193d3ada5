//! # I/O bus
//!
//! The single seam between the control core and the hardware. Everything the
//! core senses or commands goes through a [`IoBus`] implementation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::act::{ActId, Actuator};
use crate::input::{AinId, AxisId, DinId, TrigId};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Access to all hardware channels of the robot.
///
/// All operations are non-blocking, reading the most recent known value for
/// the channel. Unknown channels read as the channel's neutral value (false,
/// 0.0) rather than panicking, so a misconfigured rig degrades rather than
/// halting the control cycle.
pub trait IoBus {
    /// Read a digital sensor channel.
    fn digital(&self, ch: DinId) -> bool;

    /// Read an analog sensor channel.
    fn analog(&self, ch: AinId) -> f64;

    /// Read the held state of a driver-station trigger.
    fn trigger(&self, ch: TrigId) -> bool;

    /// Read a driver-station axis, in [-1, 1].
    fn axis(&self, ch: AxisId) -> f64;

    /// Borrow an actuator channel for commanding.
    fn actuator_mut(&mut self, id: ActId) -> &mut dyn Actuator;

    /// Borrow an actuator channel for sensing.
    fn actuator(&self, id: ActId) -> &dyn Actuator;
}
