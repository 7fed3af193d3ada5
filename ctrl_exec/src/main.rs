//! Main control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the I/O rig and activate the root task tree
//!     - Main loop:
//!         - Operation-state cycle start
//!         - Task tree execution
//!         - Plant propagation
//!         - Cycle management
//!
//! This executable runs against the simulated rig, evolving elevator gains
//! with the RAPID engine and reporting the ranked result. The teleop path is
//! exercised by the companion `teleop_sim` binary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_lib::{
    ops::OperationState,
    params::ExecParams,
    rapid::{pid_tune_factory, PidTuneParams, RapidEngine, RapidSettings},
    task::{TaskCtx, TaskTreeExecutor},
};
use hw_if::sim::SimRig;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of genes in a PID gain genome ({kp, ki, kd, kf})
const PID_GENOME_LEN: usize = 4;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Ares Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;

    let rapid_settings: RapidSettings =
        util::params::load("rapid.toml").wrap_err("Could not load rapid settings")?;

    let tune_params: PidTuneParams =
        util::params::load("pid_tune.toml").wrap_err("Could not load pid tune params")?;

    if rapid_settings.gene_bounds.len() != PID_GENOME_LEN {
        return Err(eyre!(
            "PID tuning needs {} gene bounds, rapid.toml has {}",
            PID_GENOME_LEN,
            rapid_settings.gene_bounds.len()
        ));
    }

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut rig = SimRig::default();
    let mut ops = OperationState::new();
    let mut exec_tree = TaskTreeExecutor::new();

    let engine = RapidEngine::new(rapid_settings, pid_tune_factory(tune_params))
        .wrap_err("Could not build the evolution engine")?;

    info!("Fault policy: {:?}", exec_params.fault_policy);
    info!("Starting elevator gain tuning on the simulated rig");

    {
        let mut ctx = TaskCtx {
            time_s: 0.0,
            ops: &mut ops,
            io: &mut rig,
            policy: exec_params.fault_policy,
        };
        exec_tree.activate(Box::new(engine), &mut ctx);
    }

    // ---- MAIN LOOP ----

    let cycle_period_s = exec_params.cycle_period_s;
    let mut sim_time_s = 0.0;

    while exec_tree.is_active() {
        let cycle_start_instant = Instant::now();

        // ---- CYCLE START ----

        let claimed = exec_tree.claimed_ops().to_vec();
        ops.cycle_start(&claimed);

        // ---- TASK TREE EXECUTION ----

        let mut ctx = TaskCtx {
            time_s: sim_time_s,
            ops: &mut ops,
            io: &mut rig,
            policy: exec_params.fault_policy,
        };
        exec_tree.tick(&mut ctx);

        // ---- PLANT PROPAGATION ----

        rig.step(cycle_period_s);
        sim_time_s += cycle_period_s;

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution after {:.1} s of simulated time", sim_time_s);

    session.exit();

    Ok(())
}
