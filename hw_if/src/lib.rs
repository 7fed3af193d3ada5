//! # Hardware interface crate.
//!
//! Provides the contracts through which the control software reaches the
//! robot's hardware: actuators with closed-loop capable motor controllers,
//! digital/analog sensor channels, and the driver-station triggers and axes.
//!
//! Exactly one [`bus::IoBus`] implementation is active in a given process:
//! the real robot I/O on the robot, or [`sim::SimRig`] for bench runs and
//! tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator contract: control modes, gains, and the per-actuator interface
pub mod act;

/// Sensor, trigger and axis channel catalogs
pub mod input;

/// The I/O bus trait tying the channel catalogs together
pub mod bus;

/// Simulated rig used by bench executables and tests
pub mod sim;
