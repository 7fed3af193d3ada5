//! # Macro control module
//!
//! Associates driver-station triggers with task factories and the operations
//! each macro exclusively owns while active. Per cycle the controller derives
//! trigger edges, applies the activation semantics, preempts conflicting
//! macros, ticks every active macro's task tree, and finally sources any
//! unclaimed operation from its manual (teleop) binding.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;

// Internal
pub use params::*;

use crate::ops::{OpKind, Operation};
use crate::task::{FillerTask, Task, TaskConfigError, TaskCtx, TaskTreeExecutor};
use hw_if::input::TrigId;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Activation semantics of a trigger.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
pub enum ActivationStyle {
    /// Fires once per press; the macro runs to completion or until
    /// re-triggered (a re-trigger restarts it with a fresh task)
    Click,

    /// Press activates, the next press cancels
    Toggle,

    /// Active exactly while the trigger is held; release stops immediately
    Simple,
}

/// Errors detectable when the macro controller is constructed.
#[derive(Debug, thiserror::Error)]
pub enum MacroCtrlError {
    #[error("Operation {0:?} has more than one manual binding")]
    DuplicateOpBinding(Operation),

    #[error("Operation {op:?} is {kind:?} but its manual source is {source_kind}")]
    SourceKindMismatch {
        op: Operation,
        kind: OpKind,
        source_kind: &'static str,
    },

    #[error("Deadzone {0} for operation {1:?} must be in [0, 1)")]
    InvalidDeadzone(f64, Operation),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A macro: a trigger bound to a task factory and a declared ownership set.
///
/// Macros are stateless between activations: the factory constructs a fresh
/// task instance every time the macro activates. A factory which fails (a
/// composite rejecting its configuration) degrades the activation to a
/// [`FillerTask`] rather than taking the controller down.
pub struct MacroBinding {
    pub name: String,
    pub trigger: TrigId,
    pub style: ActivationStyle,
    pub owned_ops: Vec<Operation>,
    pub factory: Box<dyn Fn() -> Result<Box<dyn Task>, TaskConfigError>>,
}

/// One currently active macro.
struct ActiveMacro {
    binding: usize,
    exec: TaskTreeExecutor,
}

/// The macro controller.
pub struct MacroCtrl {
    bindings: Vec<MacroBinding>,
    params: MacroCtrlParams,

    active: Vec<ActiveMacro>,
    prev_held: HashMap<TrigId, bool>,
    toggled_ops: HashMap<Operation, bool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MacroBinding {
    pub fn new(
        name: &str,
        trigger: TrigId,
        style: ActivationStyle,
        owned_ops: Vec<Operation>,
        factory: impl Fn() -> Box<dyn Task> + 'static,
    ) -> Self {
        Self::new_fallible(name, trigger, style, owned_ops, move || Ok(factory()))
    }

    /// A binding whose factory can reject its own configuration, e.g. a
    /// concurrent composite with overlapping ownership.
    pub fn new_fallible(
        name: &str,
        trigger: TrigId,
        style: ActivationStyle,
        owned_ops: Vec<Operation>,
        factory: impl Fn() -> Result<Box<dyn Task>, TaskConfigError> + 'static,
    ) -> Self {
        Self {
            name: String::from(name),
            trigger,
            style,
            owned_ops,
            factory: Box::new(factory),
        }
    }
}

impl MacroCtrl {
    /// Build the controller, validating the manual binding table.
    pub fn new(
        bindings: Vec<MacroBinding>,
        params: MacroCtrlParams,
    ) -> Result<Self, MacroCtrlError> {
        let mut seen: Vec<Operation> = vec![];

        for binding in &params.op_bindings {
            if seen.contains(&binding.op) {
                return Err(MacroCtrlError::DuplicateOpBinding(binding.op));
            }
            seen.push(binding.op);

            match (&binding.source, binding.op.kind()) {
                (OpSource::Axis { deadzone, .. }, OpKind::Analog) => {
                    if *deadzone < 0.0 || *deadzone >= 1.0 {
                        return Err(MacroCtrlError::InvalidDeadzone(*deadzone, binding.op));
                    }
                }
                (OpSource::Trigger { .. }, OpKind::Digital) => (),
                (OpSource::Axis { .. }, OpKind::Digital) => {
                    return Err(MacroCtrlError::SourceKindMismatch {
                        op: binding.op,
                        kind: OpKind::Digital,
                        source_kind: "an axis",
                    })
                }
                (OpSource::Trigger { .. }, OpKind::Analog) => {
                    return Err(MacroCtrlError::SourceKindMismatch {
                        op: binding.op,
                        kind: OpKind::Analog,
                        source_kind: "a trigger",
                    })
                }
            }
        }

        Ok(Self {
            bindings,
            params,
            active: vec![],
            prev_held: HashMap::new(),
            toggled_ops: HashMap::new(),
        })
    }

    /// The operations claimed by the currently active macros.
    pub fn claimed_ops(&self) -> Vec<Operation> {
        let mut claimed = vec![];
        for active in &self.active {
            for op in &self.bindings[active.binding].owned_ops {
                if !claimed.contains(op) {
                    claimed.push(*op);
                }
            }
        }
        claimed
    }

    /// True if the named macro is currently active.
    pub fn is_macro_active(&self, name: &str) -> bool {
        self.active
            .iter()
            .any(|a| self.bindings[a.binding].name == name)
    }

    /// Advance the macro layer by one cycle.
    ///
    /// Ordering within the cycle: activation/cancellation edges first, then
    /// the unclaimed-operation reset, then the active task trees, then the
    /// manual fall-through sources.
    pub fn step(&mut self, ctx: &mut TaskCtx) {
        // Latch this cycle's trigger states and edges
        let mut held = HashMap::new();
        let mut pressed = HashMap::new();
        for trig in self.watched_triggers() {
            let h = ctx.io.trigger(trig);
            let p = h && !self.prev_held.get(&trig).copied().unwrap_or(false);
            held.insert(trig, h);
            pressed.insert(trig, p);
        }
        self.prev_held = held.clone();

        // Apply activation semantics
        for i in 0..self.bindings.len() {
            let trigger = self.bindings[i].trigger;
            let is_pressed = pressed.get(&trigger).copied().unwrap_or(false);
            let is_held = held.get(&trigger).copied().unwrap_or(false);

            match self.bindings[i].style {
                ActivationStyle::Click => {
                    if is_pressed {
                        self.activate(i, ctx);
                    }
                }
                ActivationStyle::Toggle => {
                    if is_pressed {
                        if self.is_active(i) {
                            self.cancel(i, ctx);
                        } else {
                            self.activate(i, ctx);
                        }
                    }
                }
                ActivationStyle::Simple => {
                    if is_held && !self.is_active(i) {
                        self.activate(i, ctx);
                    } else if !is_held && self.is_active(i) {
                        self.cancel(i, ctx);
                    }
                }
            }
        }

        // Unclaimed operations revert to their neutral defaults before any
        // writer runs this cycle
        let claimed = self.claimed_ops();
        ctx.ops.cycle_start(&claimed);

        // Tick the active macros, dropping any whose tree finished
        for active in self.active.iter_mut() {
            active.exec.tick(ctx);
        }
        let bindings = &self.bindings;
        self.active.retain(|a| {
            if !a.exec.is_active() {
                info!("Macro '{}' finished", bindings[a.binding].name);
            }
            a.exec.is_active()
        });

        // Manual fall-through for operations no macro claims
        self.source_manual_ops(&claimed, &held, &pressed, ctx);
    }

    /// Cancel every active macro, e.g. on disable.
    pub fn cancel_all(&mut self, ctx: &mut TaskCtx) {
        for active in self.active.iter_mut() {
            active.exec.cancel(ctx);
        }
        self.active.clear();
    }

    fn is_active(&self, binding: usize) -> bool {
        self.active.iter().any(|a| a.binding == binding)
    }

    fn activate(&mut self, binding: usize, ctx: &mut TaskCtx) {
        // A macro whose ownership intersects the new one is preempted first
        let new_ops = &self.bindings[binding].owned_ops;
        let bindings = &self.bindings;
        let mut preempted = vec![];
        for active in self.active.iter_mut() {
            let other_ops = &bindings[active.binding].owned_ops;
            let conflicts =
                active.binding == binding || other_ops.iter().any(|op| new_ops.contains(op));

            if conflicts {
                warn!(
                    "Macro '{}' preempted by activation of '{}'",
                    bindings[active.binding].name, bindings[binding].name
                );
                active.exec.cancel(ctx);
                preempted.push(active.binding);
            }
        }
        self.active.retain(|a| !preempted.contains(&a.binding));

        info!("Macro '{}' activated", self.bindings[binding].name);

        let task = match (self.bindings[binding].factory)() {
            Ok(task) => task,
            Err(e) => {
                warn!(
                    "Macro '{}' could not build its task ({}), running a filler instead",
                    self.bindings[binding].name, e
                );
                Box::new(FillerTask)
            }
        };
        let mut exec = TaskTreeExecutor::new();
        exec.activate(task, ctx);

        self.active.push(ActiveMacro { binding, exec });
    }

    fn cancel(&mut self, binding: usize, ctx: &mut TaskCtx) {
        for active in self.active.iter_mut() {
            if active.binding == binding {
                info!("Macro '{}' cancelled", self.bindings[binding].name);
                active.exec.cancel(ctx);
            }
        }
        self.active.retain(|a| a.binding != binding);
    }

    fn watched_triggers(&self) -> Vec<TrigId> {
        let mut triggers: Vec<TrigId> = self.bindings.iter().map(|b| b.trigger).collect();
        for binding in &self.params.op_bindings {
            if let OpSource::Trigger { id, .. } = binding.source {
                if !triggers.contains(&id) {
                    triggers.push(id);
                }
            }
        }
        triggers.sort_by_key(|t| *t as usize);
        triggers.dedup();
        triggers
    }

    fn source_manual_ops(
        &mut self,
        claimed: &[Operation],
        held: &HashMap<TrigId, bool>,
        pressed: &HashMap<TrigId, bool>,
        ctx: &mut TaskCtx,
    ) {
        for binding in &self.params.op_bindings {
            if claimed.contains(&binding.op) {
                continue;
            }

            match &binding.source {
                OpSource::Axis { id, deadzone } => {
                    let raw = ctx.io.axis(*id);
                    let value = apply_deadzone(raw, *deadzone);
                    ctx.write_analog(binding.op, value);
                }
                OpSource::Trigger { id, style } => {
                    let is_held = held.get(id).copied().unwrap_or(false);
                    let is_pressed = pressed.get(id).copied().unwrap_or(false);

                    let value = match style {
                        ActivationStyle::Simple => is_held,
                        ActivationStyle::Click => is_pressed,
                        ActivationStyle::Toggle => {
                            let state = self.toggled_ops.entry(binding.op).or_insert(false);
                            if is_pressed {
                                *state = !*state;
                            }
                            *state
                        }
                    };

                    ctx.write_digital(binding.op, value);
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Apply a deadzone to an axis value, rescaling the live band to [0, 1].
fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if value.abs() <= deadzone {
        0.0
    } else {
        value.signum() * util::maths::lin_map((deadzone, 1.0), (0.0, 1.0), value.abs())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops::{OpValue, OperationState};
    use crate::task::{FaultPolicy, TimedTask};
    use hw_if::sim::SimRig;

    fn intake_pulse_binding(style: ActivationStyle) -> MacroBinding {
        MacroBinding::new(
            "intake_pulse",
            TrigId::OperatorIntakeIn,
            style,
            vec![Operation::IntakeIn],
            || {
                Box::new(TimedTask::new(
                    vec![(Operation::IntakeIn, OpValue::Digital(true))],
                    2.0,
                ))
            },
        )
    }

    fn no_manual_params() -> MacroCtrlParams {
        MacroCtrlParams {
            op_bindings: vec![],
        }
    }

    fn step_at(ctrl: &mut MacroCtrl, ops: &mut OperationState, rig: &mut SimRig, time_s: f64) {
        let mut ctx = TaskCtx {
            time_s,
            ops,
            io: rig,
            policy: FaultPolicy::Strict,
        };
        ctrl.step(&mut ctx);
    }

    #[test]
    fn test_click_macro_round_trip_restores_defaults() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut ctrl =
            MacroCtrl::new(vec![intake_pulse_binding(ActivationStyle::Click)], no_manual_params())
                .unwrap();

        assert!(!ops.digital(Operation::IntakeIn));

        // Press on cycle 0, release after
        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);
        rig.set_trigger(TrigId::OperatorIntakeIn, false);

        assert!(ctrl.is_macro_active("intake_pulse"));
        assert!(ops.digital(Operation::IntakeIn));

        step_at(&mut ctrl, &mut ops, &mut rig, 1.0);
        assert!(ops.digital(Operation::IntakeIn));

        // The 2 s pulse completes here and must restore the default
        step_at(&mut ctrl, &mut ops, &mut rig, 2.0);
        assert!(!ctrl.is_macro_active("intake_pulse"));
        assert!(!ops.digital(Operation::IntakeIn));
    }

    #[test]
    fn test_toggle_macro_cancels_on_second_press() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut ctrl = MacroCtrl::new(
            vec![intake_pulse_binding(ActivationStyle::Toggle)],
            no_manual_params(),
        )
        .unwrap();

        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);
        assert!(ctrl.is_macro_active("intake_pulse"));

        rig.set_trigger(TrigId::OperatorIntakeIn, false);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.5);

        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 1.0);
        assert!(!ctrl.is_macro_active("intake_pulse"));
        assert!(!ops.digital(Operation::IntakeIn));
    }

    #[test]
    fn test_simple_macro_stops_on_release() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut ctrl = MacroCtrl::new(
            vec![intake_pulse_binding(ActivationStyle::Simple)],
            no_manual_params(),
        )
        .unwrap();

        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);
        assert!(ctrl.is_macro_active("intake_pulse"));

        rig.set_trigger(TrigId::OperatorIntakeIn, false);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.5);
        assert!(!ctrl.is_macro_active("intake_pulse"));
        assert!(!ops.digital(Operation::IntakeIn));
    }

    #[test]
    fn test_conflicting_macro_preempts() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();

        let other = MacroBinding::new(
            "intake_eject",
            TrigId::OperatorIntakeOut,
            ActivationStyle::Click,
            vec![Operation::IntakeIn, Operation::IntakeOut],
            || {
                Box::new(TimedTask::new(
                    vec![(Operation::IntakeOut, OpValue::Digital(true))],
                    5.0,
                ))
            },
        );

        let mut ctrl = MacroCtrl::new(
            vec![intake_pulse_binding(ActivationStyle::Click), other],
            no_manual_params(),
        )
        .unwrap();

        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);
        rig.set_trigger(TrigId::OperatorIntakeIn, false);
        assert!(ctrl.is_macro_active("intake_pulse"));

        // The eject macro claims IntakeIn too, the pulse must be preempted
        rig.set_trigger(TrigId::OperatorIntakeOut, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.5);

        assert!(!ctrl.is_macro_active("intake_pulse"));
        assert!(ctrl.is_macro_active("intake_eject"));
        assert!(!ops.digital(Operation::IntakeIn));
        assert!(ops.digital(Operation::IntakeOut));
    }

    #[test]
    fn test_failing_factory_degrades_to_filler() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();

        let bad = MacroBinding::new_fallible(
            "bad_macro",
            TrigId::OperatorIntakeIn,
            ActivationStyle::Click,
            vec![Operation::IntakeIn],
            || {
                Err(TaskConfigError::OverlappingOwnership(
                    0,
                    1,
                    Operation::IntakeIn,
                ))
            },
        );

        let mut ctrl = MacroCtrl::new(vec![bad], no_manual_params()).unwrap();

        rig.set_trigger(TrigId::OperatorIntakeIn, true);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);

        // The filler completes during its activating cycle, so the macro has
        // already finished and no operation was written
        assert!(!ctrl.is_macro_active("bad_macro"));
        assert!(!ops.digital(Operation::IntakeIn));
    }

    #[test]
    fn test_manual_axis_fall_through_with_deadzone() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut ctrl = MacroCtrl::new(
            vec![],
            MacroCtrlParams {
                op_bindings: vec![OpBinding {
                    op: Operation::DriveForward,
                    source: OpSource::Axis {
                        id: hw_if::input::AxisId::DriverForward,
                        deadzone: 0.1,
                    },
                }],
            },
        )
        .unwrap();

        rig.set_axis(hw_if::input::AxisId::DriverForward, 0.05);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.0);
        assert_eq!(ops.analog(Operation::DriveForward), 0.0);

        rig.set_axis(hw_if::input::AxisId::DriverForward, 1.0);
        step_at(&mut ctrl, &mut ops, &mut rig, 0.1);
        assert!((ops.analog(Operation::DriveForward) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_manual_binding_rejected() {
        let params = MacroCtrlParams {
            op_bindings: vec![OpBinding {
                op: Operation::IntakeIn,
                source: OpSource::Axis {
                    id: hw_if::input::AxisId::DriverForward,
                    deadzone: 0.1,
                },
            }],
        };

        let err = match MacroCtrl::new(vec![], params) {
            Err(e) => e,
            Ok(_) => panic!("mismatched binding accepted"),
        };
        assert!(matches!(err, MacroCtrlError::SourceKindMismatch { .. }));
        assert_eq!(
            format!("{}", err),
            "Operation IntakeIn is Digital but its manual source is an axis"
        );
    }
}
