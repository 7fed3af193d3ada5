//! # Ares behavior-control core library
//!
//! Decides, every fixed control cycle, what each actuator should do. Small
//! units of timed/conditional behavior ([`task::Task`]s) are composed into
//! sequential and concurrent trees, scheduled cooperatively once per cycle,
//! and reconciled into the authoritative [`ops::OperationState`] snapshot
//! that the hardware-facing mechanisms read.
//!
//! The RAPID evolutionary tuner ([`rapid`]) runs entirely as a control task,
//! driving one actuator through scripted trials to evolve controller gains.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod macro_ctrl;
pub mod ops;
pub mod params;
pub mod rapid;
pub mod task;
