//! Macro control parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::ops::Operation;
use hw_if::input::{AxisId, TrigId};

use super::ActivationStyle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the macro controller.
///
/// The table is read-only at runtime, loaded from `macro_ctrl.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MacroCtrlParams {
    /// Manual (teleop) sources for operations not claimed by a macro
    pub op_bindings: Vec<OpBinding>,
}

/// A manual source for one operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OpBinding {
    pub op: Operation,
    pub source: OpSource,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Where a manually sourced operation gets its value.
#[derive(Debug, Clone, Deserialize)]
pub enum OpSource {
    /// An analog axis, with a deadzone below which the value reads neutral.
    /// The live band is rescaled so the output still spans [0, 1].
    Axis { id: AxisId, deadzone: f64 },

    /// A button, with click/toggle/simple semantics
    Trigger { id: TrigId, style: ActivationStyle },
}
