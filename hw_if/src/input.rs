//! # Input channel catalogs
//!
//! Fixed catalogs of the digital/analog sensor channels and the
//! driver-station trigger and axis channels. The catalogs are static: no
//! channel is created or destroyed at runtime.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all digital input channels
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum DinId {
    /// Beam-break sensor in the cargo intake throat
    IntakeCargoPresent,

    /// Hatch panel presence switch
    HatchPresent,
}

/// IDs of all analog input channels
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum AinId {
    /// Pressure transducer on the pneumatics loop
    StoredPressure,
}

/// IDs of all driver-station buttons and triggers
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum TrigId {
    DriverSlowMode,
    OperatorIntakeIn,
    OperatorIntakeOut,
    OperatorElevatorBottom,
    OperatorElevatorTop,
    OperatorClimb,
}

/// IDs of all driver-station analog axes
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum AxisId {
    DriverForward,
    DriverTurn,
    OperatorElevator,
}
