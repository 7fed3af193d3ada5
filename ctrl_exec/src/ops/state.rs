//! Operation state snapshot

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Serialize;

use super::{OpValue, Operation};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The per-cycle snapshot of current values for every operation.
///
/// Single source of truth read by the mechanism drivers. Within a cycle the
/// active task tree is the only writer; every operation not claimed by an
/// active task is reset to its declared neutral value at cycle start.
#[derive(Debug, Clone, Serialize)]
pub struct OperationState {
    values: HashMap<Operation, OpValue>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by writes to the operation state.
#[derive(Debug, thiserror::Error)]
pub enum OpWriteError {
    #[error("Operation {op:?} is {expected:?} but a {got:?} value was written")]
    KindMismatch {
        op: Operation,
        expected: super::OpKind,
        got: super::OpKind,
    },
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl OperationState {
    /// Create a new state with every operation at its neutral value.
    pub fn new() -> Self {
        let mut values = HashMap::new();
        for op in Operation::ALL {
            values.insert(*op, op.default_value());
        }
        Self { values }
    }

    /// Read the value of a digital operation.
    ///
    /// Guaranteed defined for every catalog operation. Reading an analog
    /// operation as digital yields the neutral `false`.
    pub fn digital(&self, op: Operation) -> bool {
        match self.values.get(&op) {
            Some(OpValue::Digital(v)) => *v,
            _ => false,
        }
    }

    /// Read the value of an analog operation.
    ///
    /// Guaranteed defined for every catalog operation. Reading a digital
    /// operation as analog yields the neutral `0.0`.
    pub fn analog(&self, op: Operation) -> f64 {
        match self.values.get(&op) {
            Some(OpValue::Analog(v)) => *v,
            _ => 0.0,
        }
    }

    /// Write a value to an operation, rejecting kind mismatches.
    pub fn set(&mut self, op: Operation, value: OpValue) -> Result<(), OpWriteError> {
        if value.kind() != op.kind() {
            return Err(OpWriteError::KindMismatch {
                op,
                expected: op.kind(),
                got: value.kind(),
            });
        }

        self.values.insert(op, value);
        Ok(())
    }

    /// Write a digital operation.
    pub fn set_digital(&mut self, op: Operation, value: bool) -> Result<(), OpWriteError> {
        self.set(op, OpValue::Digital(value))
    }

    /// Write an analog operation.
    pub fn set_analog(&mut self, op: Operation, value: f64) -> Result<(), OpWriteError> {
        self.set(op, OpValue::Analog(value))
    }

    /// Reset one operation to its neutral value.
    pub fn reset(&mut self, op: Operation) {
        self.values.insert(op, op.default_value());
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Every operation not in `claimed` is reset to its neutral value, so
    /// that values written by deactivated tasks or manual sources never
    /// persist beyond their cycle.
    pub fn cycle_start(&mut self, claimed: &[Operation]) {
        for op in Operation::ALL {
            if !claimed.contains(op) {
                self.reset(*op);
            }
        }
    }
}

impl Default for OperationState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_starts_at_defaults() {
        let state = OperationState::new();

        for op in Operation::ALL {
            match op.default_value() {
                OpValue::Digital(v) => assert_eq!(state.digital(*op), v),
                OpValue::Analog(v) => assert_eq!(state.analog(*op), v),
            }
        }
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut state = OperationState::new();

        assert!(state.set_analog(Operation::IntakeIn, 0.5).is_err());
        assert!(state.set_digital(Operation::DriveForward, true).is_err());

        // The rejected writes must not have disturbed the stored values
        assert!(!state.digital(Operation::IntakeIn));
        assert_eq!(state.analog(Operation::DriveForward), 0.0);
    }

    #[test]
    fn test_cycle_start_resets_unclaimed() {
        let mut state = OperationState::new();

        state.set_analog(Operation::DriveForward, 0.7).unwrap();
        state.set_digital(Operation::IntakeIn, true).unwrap();

        state.cycle_start(&[Operation::IntakeIn]);

        // Unclaimed analog op back to neutral, claimed digital op untouched
        assert_eq!(state.analog(Operation::DriveForward), 0.0);
        assert!(state.digital(Operation::IntakeIn));
    }
}
