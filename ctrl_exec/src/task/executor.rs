//! Task tree executor

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use crate::ops::Operation;

use super::{Slot, Task, TaskCtx};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The per-cycle driver of one active task tree.
///
/// Each cycle: if the root requests cancellation it is stopped and
/// deactivated; otherwise it is updated, and ended and deactivated once it
/// reports completion. All side effects flow through operation-state writes
/// made by the tasks themselves; the executor performs no hardware I/O.
#[derive(Default)]
pub struct TaskTreeExecutor {
    root: Option<Slot>,
    claimed: Vec<Operation>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TaskTreeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a task tree is currently active.
    pub fn is_active(&self) -> bool {
        self.root.is_some()
    }

    /// The operations claimed by the active tree, empty when inactive.
    pub fn claimed_ops(&self) -> &[Operation] {
        &self.claimed
    }

    /// Activate a new root task, interrupting any tree already active.
    pub fn activate(&mut self, task: Box<dyn Task>, ctx: &mut TaskCtx) {
        if let Some(mut old) = self.root.take() {
            info!("Active task tree interrupted by new activation");
            old.stop(ctx);
        }

        self.claimed = task.owned_ops().to_vec();

        let mut slot = Slot::new(task);
        slot.begin(ctx);
        self.root = Some(slot);
    }

    /// Cancel the active tree, if any.
    pub fn cancel(&mut self, ctx: &mut TaskCtx) {
        if let Some(mut slot) = self.root.take() {
            slot.stop(ctx);
            self.claimed.clear();
        }
    }

    /// Advance the active tree by one cycle.
    pub fn tick(&mut self, ctx: &mut TaskCtx) {
        let slot = match self.root.as_mut() {
            Some(s) => s,
            None => return,
        };

        if slot.should_cancel(ctx) {
            slot.stop(ctx);
            self.deactivate();
            return;
        }

        if !slot.has_completed() {
            slot.update(ctx);
        }

        if slot.has_completed() {
            slot.end(ctx);
            self.deactivate();
        }
    }

    fn deactivate(&mut self) {
        self.root = None;
        self.claimed.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::test_util::ProbeTask;
    use super::super::{FaultPolicy, Task, TaskCtx};
    use super::*;
    use crate::ops::{OperationState, Operation};
    use hw_if::sim::SimRig;

    /// A task that requests its own cancellation after one update.
    struct SelfCancelTask {
        updates: usize,
        stopped: bool,
    }

    impl Task for SelfCancelTask {
        fn begin(&mut self, _ctx: &mut TaskCtx) {}

        fn update(&mut self, _ctx: &mut TaskCtx) {
            self.updates += 1;
        }

        fn stop(&mut self, _ctx: &mut TaskCtx) {
            self.stopped = true;
        }

        fn end(&mut self, _ctx: &mut TaskCtx) {}

        fn has_completed(&self) -> bool {
            false
        }

        fn should_cancel(&self, _ctx: &TaskCtx) -> bool {
            self.updates >= 1
        }
    }

    #[test]
    fn test_executor_runs_to_completion() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut exec = TaskTreeExecutor::new();

        let task = ProbeTask::with_ops(2, vec![Operation::IntakeIn]);
        let counters = task.counters();

        let mut ctx = TaskCtx {
            time_s: 0.0,
            ops: &mut ops,
            io: &mut rig,
            policy: FaultPolicy::Strict,
        };

        exec.activate(Box::new(task), &mut ctx);
        assert!(exec.is_active());
        assert_eq!(exec.claimed_ops(), &[Operation::IntakeIn]);

        exec.tick(&mut ctx);
        assert!(exec.is_active());

        exec.tick(&mut ctx);
        assert!(!exec.is_active());
        assert!(exec.claimed_ops().is_empty());
        assert_eq!(counters.begins.get(), 1);
        assert_eq!(counters.updates.get(), 2);
        assert_eq!(counters.ends.get(), 1);
        assert_eq!(counters.stops.get(), 0);
    }

    #[test]
    fn test_executor_honours_cancellation() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut exec = TaskTreeExecutor::new();

        let mut ctx = TaskCtx {
            time_s: 0.0,
            ops: &mut ops,
            io: &mut rig,
            policy: FaultPolicy::Strict,
        };

        exec.activate(
            Box::new(SelfCancelTask {
                updates: 0,
                stopped: false,
            }),
            &mut ctx,
        );

        // First tick updates, second tick sees should_cancel and stops
        exec.tick(&mut ctx);
        assert!(exec.is_active());
        exec.tick(&mut ctx);
        assert!(!exec.is_active());
    }

    #[test]
    fn test_activation_interrupts_previous_tree() {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut exec = TaskTreeExecutor::new();

        let first = ProbeTask::new(100);
        let counters = first.counters();

        let mut ctx = TaskCtx {
            time_s: 0.0,
            ops: &mut ops,
            io: &mut rig,
            policy: FaultPolicy::Strict,
        };

        exec.activate(Box::new(first), &mut ctx);
        exec.tick(&mut ctx);
        exec.activate(Box::new(ProbeTask::new(1)), &mut ctx);

        assert_eq!(counters.stops.get(), 1);
        assert_eq!(counters.ends.get(), 0);
    }
}
