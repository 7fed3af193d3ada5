//! Teleop simulation executable.
//!
//! Drives the macro controller from a scripted driver-station timeline
//! against the simulated rig: manual drive sources, a click-activated intake
//! pulse and a click-activated elevator move. Useful for checking binding
//! semantics and the manual fall-through without a robot attached.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;

// Internal
use ctrl_lib::{
    macro_ctrl::{ActivationStyle, MacroBinding, MacroCtrl, MacroCtrlParams},
    ops::{OpValue, Operation, OperationState},
    params::ExecParams,
    task::{PositionMoveTask, TaskCtx, TimedTask},
};
use hw_if::{
    act::{ActId, PidGains},
    bus::IoBus,
    input::{AxisId, TrigId},
    sim::SimRig,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Total simulated run time.
const RUN_DURATION_S: f64 = 12.0;

/// Drive output scale while slow mode is toggled on.
const SLOW_MODE_SCALE: f64 = 0.5;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// One scripted driver-station event.
enum ScriptStep {
    Trigger(TrigId, bool),
    Axis(AxisId, f64),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("teleop_sim", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Ares Teleop Simulation\n");

    let exec_params: ExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;

    let macro_params: MacroCtrlParams =
        util::params::load("macro_ctrl.toml").wrap_err("Could not load macro ctrl params")?;

    // ---- INITIALISE MODULES ----

    let mut rig = SimRig::default();
    let mut ops = OperationState::new();
    let mut ctrl = MacroCtrl::new(macro_bindings(), macro_params)
        .wrap_err("Could not build the macro controller")?;

    // ---- SCRIPTED TIMELINE ----

    let mut script = vec![
        // A burst of forward drive
        (0.5, ScriptStep::Axis(AxisId::DriverForward, 0.8)),
        (2.5, ScriptStep::Axis(AxisId::DriverForward, 0.0)),
        // Intake pulse fires once on the press edge
        (3.0, ScriptStep::Trigger(TrigId::OperatorIntakeIn, true)),
        (3.2, ScriptStep::Trigger(TrigId::OperatorIntakeIn, false)),
        // Elevator to the top while turning with slow mode toggled on
        (5.5, ScriptStep::Trigger(TrigId::DriverSlowMode, true)),
        (5.7, ScriptStep::Trigger(TrigId::DriverSlowMode, false)),
        (6.0, ScriptStep::Trigger(TrigId::OperatorElevatorTop, true)),
        (6.2, ScriptStep::Trigger(TrigId::OperatorElevatorTop, false)),
        (6.5, ScriptStep::Axis(AxisId::DriverTurn, 0.3)),
        (8.0, ScriptStep::Axis(AxisId::DriverTurn, 0.0)),
    ];
    script.reverse();

    // ---- MAIN LOOP ----

    let dt = exec_params.cycle_period_s;
    let mut time_s = 0.0;

    while time_s < RUN_DURATION_S {
        while script.last().map(|(t, _)| *t <= time_s).unwrap_or(false) {
            match script.pop() {
                Some((_, ScriptStep::Trigger(id, held))) => rig.set_trigger(id, held),
                Some((_, ScriptStep::Axis(id, value))) => rig.set_axis(id, value),
                None => (),
            }
        }

        {
            let mut ctx = TaskCtx {
                time_s,
                ops: &mut ops,
                io: &mut rig,
                policy: exec_params.fault_policy,
            };
            ctrl.step(&mut ctx);
        }

        apply_ops(&ops, &mut rig);
        rig.step(dt);
        time_s += dt;
    }

    {
        let mut ctx = TaskCtx {
            time_s,
            ops: &mut ops,
            io: &mut rig,
            policy: exec_params.fault_policy,
        };
        ctrl.cancel_all(&mut ctx);
    }

    // ---- SHUTDOWN ----

    info!(
        "Run complete: elevator at {:.1}, drive L/R at {:.1}/{:.1}",
        rig.actuator(ActId::Elevator).position(),
        rig.actuator(ActId::DrvL).position(),
        rig.actuator(ActId::DrvR).position()
    );

    session.exit();

    Ok(())
}

/// The macro table for the demonstration.
fn macro_bindings() -> Vec<MacroBinding> {
    vec![
        MacroBinding::new(
            "intake_pulse",
            TrigId::OperatorIntakeIn,
            ActivationStyle::Click,
            vec![Operation::IntakeIn],
            || {
                Box::new(TimedTask::new(
                    vec![(Operation::IntakeIn, OpValue::Digital(true))],
                    2.0,
                ))
            },
        ),
        MacroBinding::new(
            "elevator_top",
            TrigId::OperatorElevatorTop,
            ActivationStyle::Click,
            vec![Operation::ElevatorPower],
            || {
                Box::new(PositionMoveTask::new(
                    ActId::Elevator,
                    90.0,
                    Some(PidGains {
                        kp: 0.5,
                        ki: 0.0,
                        kd: 0.05,
                        kf: 0.0,
                    }),
                    1.0,
                    0.25,
                    10.0,
                ))
            },
        ),
    ]
}

/// Output stage: map this cycle's operation values onto the rig's actuators.
///
/// Only open-loop demands flow through here; closed-loop moves command their
/// actuator directly from the owning task.
fn apply_ops(ops: &OperationState, rig: &mut SimRig) {
    let scale = if ops.digital(Operation::DriveSlowMode) {
        SLOW_MODE_SCALE
    } else {
        1.0
    };

    let fwd = ops.analog(Operation::DriveForward);
    let turn = ops.analog(Operation::DriveTurn);
    rig.actuator_mut(ActId::DrvL)
        .set_output((fwd + turn).max(-1.0).min(1.0) * scale);
    rig.actuator_mut(ActId::DrvR)
        .set_output((fwd - turn).max(-1.0).min(1.0) * scale);

    // Ignored by the plant while a closed-loop move holds the elevator
    rig.actuator_mut(ActId::Elevator)
        .set_output(ops.analog(Operation::ElevatorPower));

    let intake = if ops.digital(Operation::IntakeIn) {
        0.8
    } else if ops.digital(Operation::IntakeOut) {
        -0.8
    } else {
        0.0
    };
    rig.actuator_mut(ActId::Intake).set_output(intake);
}
