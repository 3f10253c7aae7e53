//! Execution strategies for an assembled specification tree.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Instant;

use generational_arena::Index;
use tracing::{debug, instrument, trace, warn};

use crate::arena::SpecArena;
use crate::config::Mode;
use crate::node::{Action, Outcome, RunRecord, NO_PANIC_MESSAGE};
use crate::verify::{self, CaughtPanic};

/// How a run ended. A quick-mode run aborts when a fixture step that
/// previously succeeded fails during prefix replay.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Completion {
    Finished,
    Aborted(Index),
}

impl Completion {
    pub(crate) fn aborted_at(self) -> Option<Index> {
        match self {
            Completion::Finished => None,
            Completion::Aborted(idx) => Some(idx),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Engine {
    arena: Rc<RefCell<SpecArena>>,
}

impl Engine {
    pub(crate) fn new(arena: Rc<RefCell<SpecArena>>) -> Self {
        Self { arena }
    }

    pub(crate) fn run(&self, mode: Mode) -> Completion {
        match mode {
            Mode::Isolated => self.run_isolated(),
            Mode::Quick => self.run_quick(),
        }
    }

    /// Runs every scenario from scratch, re-running its fixture prefix, and
    /// stops each scenario at the first node whose execution refuses to
    /// continue the chain.
    #[instrument(level = "debug", skip(self))]
    fn run_isolated(&self) -> Completion {
        let scenarios = self.arena.borrow().scenarios();
        debug!(scenarios = scenarios.len(), "isolated run");
        for path in &scenarios {
            for &idx in path {
                if !self.exec(idx) {
                    break;
                }
            }
        }
        Completion::Finished
    }

    /// Single pre-order scan with a cursor: after a node stops progress, the
    /// fixture steps before the cursor are replayed and the scan resumes one
    /// past the stopper. Assertions are never replayed; their recorded
    /// outcomes stand.
    #[instrument(level = "debug", skip(self))]
    fn run_quick(&self) -> Completion {
        let sequence: Vec<Index> = self.arena.borrow().iter().map(|(idx, _)| idx).collect();
        debug!(nodes = sequence.len(), "quick run");
        let mut end = 0;
        while end < sequence.len() {
            for &idx in &sequence[..end] {
                let replayable = self
                    .arena
                    .borrow()
                    .node(idx)
                    .map(|node| node.kind.is_setup())
                    .unwrap_or(false);
                if replayable && !self.exec(idx) {
                    warn!(?idx, "fixture step failed on replay, aborting run");
                    return Completion::Aborted(idx);
                }
            }
            while end < sequence.len() && self.exec(sequence[end]) {
                end += 1;
            }
            end += 1;
        }
        Completion::Finished
    }

    /// Runs one node's action under timing and panic capture, appends a run
    /// record, raises the node's aggregate, and reports whether the caller
    /// should keep advancing through the chain.
    ///
    /// A panic from a swallowing node is logged with its classified severity
    /// but raises the aggregate only to `Passed`: judgment over the captured
    /// panic belongs to the expecting sibling attached after it. When that
    /// sibling's expectation misses, the swallowed panic's severity is
    /// applied to the parent after all.
    #[instrument(level = "trace", skip(self))]
    fn exec(&self, idx: Index) -> bool {
        let (action, swallow, parent_idx, parent_panic) = {
            let arena = self.arena.borrow();
            let Some(node) = arena.node(idx) else {
                return false;
            };
            let parent_panic = node
                .parent
                .and_then(|parent| arena.node(parent))
                .and_then(|parent| parent.last_panic.clone());
            (
                node.action.clone(),
                node.swallow_panics,
                node.parent,
                parent_panic,
            )
        };

        let started = Instant::now();
        let run = panic::catch_unwind(AssertUnwindSafe(|| match &action {
            Action::Run(action) => (&mut *action.borrow_mut())(),
            Action::ExpectPanic(expectation) => expectation.check(parent_panic.as_deref()),
            Action::InspectPanic(assertion) => match parent_panic.as_deref() {
                Some(caught) => (&mut *assertion.borrow_mut())(caught),
                None => verify::fail(NO_PANIC_MESSAGE),
            },
        }));
        let elapsed = started.elapsed();

        let (severity, message, caught) = match run {
            Ok(()) => (Outcome::Passed, None, None),
            Err(payload) => {
                let caught = CaughtPanic::new(payload);
                let severity = severity_of(&caught);
                (severity, Some(caught.message()), Some(Rc::new(caught)))
            }
        };

        let expectation_missed = severity != Outcome::Passed
            && matches!(action, Action::ExpectPanic(_))
            && parent_panic.is_some();

        {
            let mut arena = self.arena.borrow_mut();
            if let Some(node) = arena.node_mut(idx) {
                node.last_panic = caught;
                node.result_log.push(RunRecord {
                    elapsed,
                    outcome: severity,
                    message,
                });
                let applied = if swallow && severity != Outcome::Passed {
                    Outcome::Passed
                } else {
                    severity
                };
                node.raise_aggregate(applied);
            }
            if expectation_missed {
                if let (Some(parent_idx), Some(panic)) = (parent_idx, parent_panic.as_deref()) {
                    let parent_severity = severity_of(panic);
                    if let Some(parent) = arena.node_mut(parent_idx) {
                        parent.raise_aggregate(parent_severity);
                    }
                }
            }
        }

        trace!(?severity, ?elapsed, "node executed");
        severity == Outcome::Passed || swallow
    }
}

/// The engine's only dependency on the assertion collaborator: a caught
/// panic is either an assertion signal or an arbitrary panic.
fn severity_of(panic: &CaughtPanic) -> Outcome {
    if panic.failure_kind().is_some() {
        Outcome::Failed
    } else {
        Outcome::Panicked
    }
}
