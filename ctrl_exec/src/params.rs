//! Executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::task::FaultPolicy;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the control executable, loaded from `exec.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecParams {
    /// Period of the control cycle in seconds
    pub cycle_period_s: f64,

    /// How lifecycle protocol breaches are handled
    pub fault_policy: FaultPolicy,
}
