//! Concurrent composite task

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::ops::Operation;

use super::{Slot, Task, TaskConfigError, TaskCtx};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// When a [`ConcurrentTask`] reports completion.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompletionPolicy {
    /// Complete when every child has completed (the default)
    All,

    /// Complete when any one child has completed
    Any,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs child tasks in lockstep, every active child ticked exactly once per
/// cycle.
///
/// There is no defined ordering between children within a cycle, so children
/// must not have cycle-order dependencies on each other. Children may not
/// declare overlapping operation ownership; this is rejected at
/// construction.
pub struct ConcurrentTask {
    children: Vec<Slot>,
    policy: CompletionPolicy,
    owned: Vec<Operation>,
    done: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConcurrentTask {
    /// Build a concurrent composite, rejecting overlapping child ownership.
    pub fn new(
        children: Vec<Box<dyn Task>>,
        policy: CompletionPolicy,
    ) -> Result<Self, TaskConfigError> {
        let children: Vec<Slot> = children.into_iter().map(Slot::new).collect();

        let mut owned: Vec<Operation> = vec![];
        for (i, child) in children.iter().enumerate() {
            for op in child.owned_ops() {
                // Find which earlier child already claims this operation
                for (j, other) in children.iter().enumerate().take(i) {
                    if other.owned_ops().contains(op) {
                        return Err(TaskConfigError::OverlappingOwnership(j, i, *op));
                    }
                }
                owned.push(*op);
            }
        }

        Ok(Self {
            children,
            policy,
            owned,
            done: false,
        })
    }
}

impl Task for ConcurrentTask {
    fn begin(&mut self, ctx: &mut TaskCtx) {
        for child in self.children.iter_mut() {
            child.begin(ctx);
        }
        self.refresh_done();
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        // Completed children are skipped but retained for bookkeeping
        for child in self.children.iter_mut() {
            if child.is_active() && !child.has_completed() {
                child.update(ctx);
            }

            if child.is_active() && child.has_completed() {
                child.end(ctx);
            }
        }

        self.refresh_done();
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        for child in self.children.iter_mut() {
            if child.is_active() {
                child.stop(ctx);
            }
        }
    }

    fn end(&mut self, ctx: &mut TaskCtx) {
        // Under the Any policy unfinished children are abandoned: they get
        // stop, not end, since they did not complete
        for child in self.children.iter_mut() {
            if child.is_active() {
                child.stop(ctx);
            }
        }
    }

    fn has_completed(&self) -> bool {
        self.done
    }

    fn should_cancel(&self, ctx: &TaskCtx) -> bool {
        self.children.iter().any(|c| c.should_cancel(ctx))
    }

    fn owned_ops(&self) -> &[Operation] {
        &self.owned
    }
}

impl ConcurrentTask {
    fn refresh_done(&mut self) {
        let done = match self.policy {
            CompletionPolicy::All => self.children.iter().all(|c| c.has_completed()),
            CompletionPolicy::Any => self.children.iter().any(|c| c.has_completed()),
        };

        if done {
            self.done = true;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
