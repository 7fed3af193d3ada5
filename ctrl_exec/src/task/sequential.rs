//! Sequential composite task

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::ops::Operation;

use super::{Slot, Task, TaskCtx};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Progress of a [`SequentialTask`] through its children.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SeqState {
    Idle,
    RunningChild(usize),
    Done,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs child tasks one at a time, in declared order.
///
/// When the active child completes it receives `end` and the next child
/// receives `begin` in the same cycle, so no cycle is skipped between
/// children. On `stop` only the active child is stopped; children not yet
/// started are abandoned without `begin`, so their operation claims are never
/// written and the neutral defaults must be safe.
pub struct SequentialTask {
    children: Vec<Slot>,
    state: SeqState,
    owned: Vec<Operation>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SequentialTask {
    pub fn new(children: Vec<Box<dyn Task>>) -> Self {
        let children: Vec<Slot> = children.into_iter().map(Slot::new).collect();

        // Ownership of the composite is the union of its children's claims
        let mut owned: Vec<Operation> = vec![];
        for child in &children {
            for op in child.owned_ops() {
                if !owned.contains(op) {
                    owned.push(*op);
                }
            }
        }

        Self {
            children,
            state: SeqState::Idle,
            owned,
        }
    }
}

impl Task for SequentialTask {
    fn begin(&mut self, ctx: &mut TaskCtx) {
        if self.children.is_empty() {
            self.state = SeqState::Done;
            return;
        }

        self.children[0].begin(ctx);
        self.state = SeqState::RunningChild(0);
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        let mut index = match self.state {
            SeqState::RunningChild(i) => i,
            _ => return,
        };

        if !self.children[index].has_completed() {
            self.children[index].update(ctx);
        }

        // Hand over to the next child in the same cycle; an immediately
        // complete child is caught by the next cycle's update
        if self.children[index].has_completed() {
            self.children[index].end(ctx);

            index += 1;
            if index < self.children.len() {
                self.children[index].begin(ctx);
                self.state = SeqState::RunningChild(index);
            } else {
                self.state = SeqState::Done;
            }
        }
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        if let SeqState::RunningChild(i) = self.state {
            self.children[i].stop(ctx);
        }
        self.state = SeqState::Done;
    }

    fn end(&mut self, _ctx: &mut TaskCtx) {
        // All children have already received their terminal call
    }

    fn has_completed(&self) -> bool {
        self.state == SeqState::Done
    }

    fn should_cancel(&self, ctx: &TaskCtx) -> bool {
        match self.state {
            SeqState::RunningChild(i) => self.children[i].should_cancel(ctx),
            _ => false,
        }
    }

    fn owned_ops(&self) -> &[Operation] {
        &self.owned
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
