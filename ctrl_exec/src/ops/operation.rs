//! Operation catalog

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// All named operations of the robot.
///
/// The catalog is fixed at compile time, no operation is created or destroyed
/// at runtime.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Operation {
    // Drivetrain
    DriveForward,
    DriveTurn,
    DriveSlowMode,

    // Elevator
    ElevatorPower,
    ElevatorToBottom,
    ElevatorToTop,

    // Intake
    IntakeIn,
    IntakeOut,

    // Climber
    ClimberDeploy,
    ClimberPower,
}

/// The type of values an operation carries.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum OpKind {
    Digital,
    Analog,
}

/// A value for an operation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone)]
pub enum OpValue {
    Digital(bool),
    Analog(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Operation {
    /// Every operation in the catalog.
    pub const ALL: &'static [Operation] = &[
        Operation::DriveForward,
        Operation::DriveTurn,
        Operation::DriveSlowMode,
        Operation::ElevatorPower,
        Operation::ElevatorToBottom,
        Operation::ElevatorToTop,
        Operation::IntakeIn,
        Operation::IntakeOut,
        Operation::ClimberDeploy,
        Operation::ClimberPower,
    ];

    /// The kind of value this operation carries.
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::DriveForward
            | Operation::DriveTurn
            | Operation::ElevatorPower
            | Operation::ClimberPower => OpKind::Analog,

            Operation::DriveSlowMode
            | Operation::ElevatorToBottom
            | Operation::ElevatorToTop
            | Operation::IntakeIn
            | Operation::IntakeOut
            | Operation::ClimberDeploy => OpKind::Digital,
        }
    }

    /// The declared neutral value for this operation.
    ///
    /// The neutral value must always be safe to hold: zero power, nothing
    /// engaged.
    pub fn default_value(&self) -> OpValue {
        match self.kind() {
            OpKind::Digital => OpValue::Digital(false),
            OpKind::Analog => OpValue::Analog(0.0),
        }
    }
}

impl OpValue {
    /// The kind of this value.
    pub fn kind(&self) -> OpKind {
        match self {
            OpValue::Digital(_) => OpKind::Digital,
            OpValue::Analog(_) => OpKind::Analog,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_match_kinds() {
        for op in Operation::ALL {
            assert_eq!(op.kind(), op.default_value().kind());
        }
    }
}
