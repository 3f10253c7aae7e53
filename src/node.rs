use std::any::TypeId;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use generational_arena::Index;
use itertools::Itertools;

use crate::verify::{self, CaughtPanic};

/// Failure message recorded when a panic-asserting node finds that its
/// parent captured no panic at all.
pub(crate) const NO_PANIC_MESSAGE: &str = "No panic was raised.";

/// Node kinds in declaration order: initial condition, state transition,
/// assertion, assertion about a captured panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Given = 0,
    When = 1,
    It = 2,
    ThePanic = 3,
}

impl Kind {
    /// Placement depth used by the attachment walk: a new node attaches
    /// beneath the nearest ancestor whose rank is strictly lower. `ThePanic`
    /// shares `It`'s rank so detail assertions land beside the assertions
    /// they follow instead of nesting under them. This is the only place
    /// kinds are ordered.
    pub fn rank(self) -> u8 {
        match self {
            Kind::Given => 0,
            Kind::When => 1,
            Kind::It | Kind::ThePanic => 2,
        }
    }

    /// True for kinds that establish fixture state and get replayed.
    pub fn is_setup(self) -> bool {
        matches!(self, Kind::Given | Kind::When)
    }

    /// True for kinds that terminate a scenario.
    pub fn is_assertion(self) -> bool {
        matches!(self, Kind::It | Kind::ThePanic)
    }

    pub fn label(self) -> &'static str {
        match self {
            Kind::Given => "given",
            Kind::When => "when",
            Kind::It => "it",
            Kind::ThePanic => "the panic",
        }
    }
}

/// Result severity for a single execution, totally ordered from best to
/// worst. `Failed` covers panics carrying the crate's own [`Failure`]
/// payload; `Panicked` covers every other payload.
///
/// [`Failure`]: crate::verify::Failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    NotRun = 0,
    Passed = 1,
    Failed = 2,
    Panicked = 3,
}

impl Outcome {
    pub fn state_word(self) -> &'static str {
        match self {
            Outcome::NotRun => "not run",
            Outcome::Passed => "ok",
            Outcome::Failed => "FAILED",
            Outcome::Panicked => "panicked",
        }
    }
}

/// One execution of a node's action.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub elapsed: Duration,
    pub outcome: Outcome,
    /// Rendered panic payload, `None` when the run completed normally.
    pub message: Option<String>,
}

/// What an `it_should_panic*` node expects of its parent's captured panic.
#[derive(Debug, Clone)]
pub enum PanicExpectation {
    /// The payload's concrete type must match.
    Type {
        type_id: TypeId,
        name: &'static str,
    },
    /// The rendered payload message must contain this fragment.
    Message(String),
}

impl PanicExpectation {
    /// Judges the panic captured by the expecting node's parent, raising an
    /// assertion failure when nothing was captured or the captured panic
    /// does not satisfy the expectation.
    pub(crate) fn check(&self, caught: Option<&CaughtPanic>) {
        let Some(caught) = caught else {
            verify::fail(NO_PANIC_MESSAGE);
        };
        match self {
            PanicExpectation::Type { type_id, name } => {
                if !caught.type_matches(*type_id) {
                    verify::fail(format!(
                        "expected a panic of type {}, got: {}",
                        name,
                        caught.message()
                    ));
                }
            }
            PanicExpectation::Message(fragment) => {
                let message = caught.message();
                if !message.contains(fragment.as_str()) {
                    verify::fail(format!(
                        "panic message {:?} does not contain {:?}",
                        message, fragment
                    ));
                }
            }
        }
    }
}

/// The work a node performs when executed.
///
/// `ExpectPanic` and `InspectPanic` do not touch the fixture; they judge the
/// panic most recently captured by the node's parent.
pub enum Action {
    Run(Rc<RefCell<dyn FnMut()>>),
    ExpectPanic(PanicExpectation),
    InspectPanic(Rc<RefCell<dyn FnMut(&CaughtPanic)>>),
}

impl Action {
    pub(crate) fn run(action: impl FnMut() + 'static) -> Self {
        Action::Run(Rc::new(RefCell::new(action)))
    }

    pub(crate) fn inspect(assertion: impl FnMut(&CaughtPanic) + 'static) -> Self {
        Action::InspectPanic(Rc::new(RefCell::new(assertion)))
    }
}

impl Clone for Action {
    fn clone(&self) -> Self {
        match self {
            Action::Run(action) => Action::Run(Rc::clone(action)),
            Action::ExpectPanic(expectation) => Action::ExpectPanic(expectation.clone()),
            Action::InspectPanic(assertion) => Action::InspectPanic(Rc::clone(assertion)),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Run(_) => f.write_str("Run"),
            Action::ExpectPanic(expectation) => {
                f.debug_tuple("ExpectPanic").field(expectation).finish()
            }
            Action::InspectPanic(_) => f.write_str("InspectPanic"),
        }
    }
}

/// Tree element for one specification step. Immutable after construction
/// except for the swallow flag (set while attaching a panic-asserting
/// child) and the run state fields, which only the engine mutates.
#[derive(Debug)]
pub struct Node {
    pub description: String,
    pub action: Action,
    pub kind: Kind,
    /// Non-owning back-reference into the arena, `None` only for the root.
    pub parent: Option<Index>,
    /// Insertion order is execution order.
    pub children: Vec<Index>,
    /// Once set, a panic from this node's own action no longer terminates
    /// the scenario it belongs to.
    pub swallow_panics: bool,
    /// Most recent panic captured from this node's own action; cleared by
    /// every run that completes normally.
    pub last_panic: Option<Rc<CaughtPanic>>,
    /// Append-only, one entry per execution.
    pub result_log: Vec<RunRecord>,
    /// Worst severity ever applied to this node.
    pub aggregate: Outcome,
}

impl Node {
    pub fn new(description: String, action: Action, kind: Kind) -> Self {
        Self {
            description,
            action,
            kind,
            parent: None,
            children: Vec::new(),
            swallow_panics: false,
            last_panic: None,
            result_log: Vec::new(),
            aggregate: Outcome::NotRun,
        }
    }

    /// Raises the aggregate to `severity`; a later, better run never lowers it.
    pub fn raise_aggregate(&mut self, severity: Outcome) {
        if severity > self.aggregate {
            self.aggregate = severity;
        }
    }

    /// Mean wall-clock duration across all runs, `None` before the first run.
    pub fn average_elapsed(&self) -> Option<Duration> {
        if self.result_log.is_empty() {
            return None;
        }
        let total: Duration = self.result_log.iter().map(|record| record.elapsed).sum();
        Some(total / self.result_log.len() as u32)
    }

    /// Distinct failure messages across all runs, in first-seen order.
    pub fn distinct_failure_messages(&self) -> Vec<String> {
        self.result_log
            .iter()
            .filter_map(|record| record.message.as_deref())
            .unique()
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn node(kind: Kind) -> Node {
        Node::new("n".to_string(), Action::run(|| {}), kind)
    }

    #[test]
    fn given_raised_aggregate_when_applying_lower_severity_then_keeps_worst() {
        let mut node = node(Kind::When);

        node.raise_aggregate(Outcome::Passed);
        node.raise_aggregate(Outcome::Panicked);
        node.raise_aggregate(Outcome::Passed);

        assert_eq!(node.aggregate, Outcome::Panicked);
    }

    #[test]
    fn given_repeated_messages_when_collecting_then_deduplicates_in_order() {
        let mut node = node(Kind::It);
        for message in ["first", "second", "first"] {
            node.result_log.push(RunRecord {
                elapsed: Duration::from_millis(1),
                outcome: Outcome::Failed,
                message: Some(message.to_string()),
            });
        }

        assert_eq!(node.distinct_failure_messages(), vec!["first", "second"]);
    }

    #[test]
    fn given_no_runs_when_averaging_then_returns_none() {
        assert!(node(Kind::Given).average_elapsed().is_none());
    }

    #[test]
    fn given_the_panic_kind_when_ranking_then_places_like_an_assertion() {
        assert_eq!(Kind::ThePanic.rank(), Kind::It.rank());
        assert!(Kind::ThePanic.is_assertion());
        assert!(!Kind::ThePanic.is_setup());
    }
}
