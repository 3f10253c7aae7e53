use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use generational_arena::Index;
use tracing::instrument;

use crate::arena::SpecArena;
use crate::claim::Claim;
use crate::config::{Mode, RunConfig};
use crate::engine::Engine;
use crate::errors::{BuildError, BuildResult};
use crate::node::{Action, Kind, Node, Outcome, PanicExpectation};
use crate::report::{self, Report};
use crate::verify::CaughtPanic;

/// Starts a specification tree with its initial condition and returns the
/// root handle.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spectree::{given, verify, RunConfig};
///
/// let count = Rc::new(Cell::new(0));
/// let setup = Rc::clone(&count);
/// let root = given("a counter at zero", move || setup.set(0)).unwrap();
/// let bump = Rc::clone(&count);
/// let step = root.when("it is incremented", move || bump.set(bump.get() + 1)).unwrap();
/// let seen = Rc::clone(&count);
/// step.it("holds one", move || verify::equal(seen.get(), 1)).unwrap();
///
/// let report = root.run(RunConfig::default());
/// assert!(report.passed);
/// ```
#[instrument(level = "debug", skip(action))]
pub fn given(description: &str, action: impl FnMut() + 'static) -> BuildResult<Step> {
    let description = validated(description, "description")?;
    let mut arena = SpecArena::new();
    let root = arena.insert_root(Node::new(description, Action::run(action), Kind::Given));
    Ok(Step {
        arena: Rc::new(RefCell::new(arena)),
        node: root,
    })
}

/// Handle to one node of a specification tree. Cloneable and cheap; all
/// handles share the same tree, and any of them can start a run.
///
/// Every attaching method returns the handle of the newly created node, so
/// calls chain into nested scenarios. Where the new node actually lands is
/// decided by the precedence walk, not by the receiver alone: an `it`
/// chained off another `it` becomes its sibling, a `when` chained off an
/// `it` climbs back up to the enclosing `given`.
#[derive(Clone, Debug)]
pub struct Step {
    arena: Rc<RefCell<SpecArena>>,
    node: Index,
}

impl Step {
    /// Attaches a state transition (kind `when`).
    #[instrument(level = "debug", skip(self, action))]
    pub fn when(&self, description: &str, action: impl FnMut() + 'static) -> BuildResult<Step> {
        let description = validated(description, "description")?;
        self.attach(Node::new(description, Action::run(action), Kind::When), false)
    }

    /// Attaches an assertion (kind `it`). The assertion signals through the
    /// [`verify`] helpers or any panic.
    ///
    /// [`verify`]: crate::verify
    #[instrument(level = "debug", skip(self, assertion))]
    pub fn it(&self, description: &str, assertion: impl FnMut() + 'static) -> BuildResult<Step> {
        let description = validated(description, "description")?;
        self.attach(Node::new(description, Action::run(assertion), Kind::It), false)
    }

    /// Attaches an assertion built from an explicit comparison spec, so
    /// mismatches report expected vs. actual.
    #[instrument(level = "debug", skip(self, claim))]
    pub fn it_checks(&self, description: &str, claim: Claim) -> BuildResult<Step> {
        let description = validated(description, "description")?;
        self.attach(Node::new(description, claim.into_action(), Kind::It), false)
    }

    /// Expects the enclosing fixture step to panic with a payload of type
    /// `E`. Marks that step as swallowing at build time, so siblings attached
    /// after this one stay reachable even though the step panics. The check
    /// fails with "No panic was raised." when no panic was captured.
    #[instrument(level = "debug", skip(self))]
    pub fn it_should_panic<E: Any>(&self) -> BuildResult<Step> {
        let name = std::any::type_name::<E>();
        let expectation = PanicExpectation::Type {
            type_id: TypeId::of::<E>(),
            name,
        };
        self.attach(
            Node::new(
                format!("panics with {}", name),
                Action::ExpectPanic(expectation),
                Kind::It,
            ),
            true,
        )
    }

    /// Expects the enclosing fixture step to panic with a message containing
    /// `fragment`. This matches panics raised by the runtime itself, whose
    /// payloads are plain strings rather than typed values.
    #[instrument(level = "debug", skip(self))]
    pub fn it_should_panic_with(&self, fragment: &str) -> BuildResult<Step> {
        let fragment = validated(fragment, "fragment")?;
        self.attach(
            Node::new(
                format!("panics with message containing {:?}", fragment),
                Action::ExpectPanic(PanicExpectation::Message(fragment)),
                Kind::It,
            ),
            true,
        )
    }

    /// Attaches an assertion over the panic captured by the enclosing
    /// fixture step, reported under its own `the panic` label. Placed beside
    /// sibling assertions, and marks the fixture step as swallowing just
    /// like [`Step::it_should_panic`].
    #[instrument(level = "debug", skip(self, assertion))]
    pub fn the_panic(
        &self,
        description: &str,
        assertion: impl FnMut(&CaughtPanic) + 'static,
    ) -> BuildResult<Step> {
        let description = validated(description, "description")?;
        self.attach(
            Node::new(description, Action::inspect(assertion), Kind::ThePanic),
            true,
        )
    }

    fn attach(&self, node: Node, swallow_parent: bool) -> BuildResult<Step> {
        let label = node.kind.label();
        let mut arena = self.arena.borrow_mut();
        let (idx, parent_idx) = arena
            .attach(self.node, node)
            .ok_or(BuildError::NoAttachmentPoint(label))?;
        if swallow_parent {
            if let Some(parent) = arena.node_mut(parent_idx) {
                parent.swallow_panics = true;
            }
        }
        Ok(Step {
            arena: Rc::clone(&self.arena),
            node: idx,
        })
    }

    /// Runs the tree with [`RunConfig::default`], prints the report, and
    /// panics with the plain report text on a failing verdict, so a
    /// specification embedded in a test fails the test the usual way.
    pub fn go(&self) {
        self.go_with(RunConfig::default());
    }

    /// Runs with the isolated strategy regardless of the default.
    pub fn go_isolated(&self) {
        self.go_with(RunConfig {
            mode: Mode::Isolated,
            ..RunConfig::default()
        });
    }

    /// Runs with the quick strategy regardless of the default.
    pub fn go_quick(&self) {
        self.go_with(RunConfig {
            mode: Mode::Quick,
            ..RunConfig::default()
        });
    }

    #[instrument(level = "debug", skip(self))]
    pub fn go_with(&self, config: RunConfig) {
        let (aborted, report) = self.execute(config);
        print!("{}", report.text);
        if !report.passed {
            let text = if config.color {
                report::render(&self.arena.borrow(), aborted, false).text
            } else {
                report.text
            };
            panic!("{}", text);
        }
    }

    /// Runs the tree and returns the report without printing or panicking.
    #[instrument(level = "debug", skip(self))]
    pub fn run(&self, config: RunConfig) -> Report {
        self.execute(config).1
    }

    fn execute(&self, config: RunConfig) -> (Option<Index>, Report) {
        let engine = Engine::new(Rc::clone(&self.arena));
        let aborted = engine.run(config.mode).aborted_at();
        let report = report::render(&self.arena.borrow(), aborted, config.color);
        (aborted, report)
    }

    pub fn description(&self) -> String {
        self.arena.borrow()[self.node].description.clone()
    }

    pub fn kind(&self) -> Kind {
        self.arena.borrow()[self.node].kind
    }

    /// Aggregate state after the most recent run, `NotRun` before any.
    pub fn outcome(&self) -> Outcome {
        self.arena.borrow()[self.node].aggregate
    }

    /// Number of times this node's action has executed.
    pub fn runs(&self) -> usize {
        self.arena.borrow()[self.node].result_log.len()
    }

    /// Message recorded by the most recent run, `None` when it passed.
    pub fn last_message(&self) -> Option<String> {
        self.arena.borrow()[self.node]
            .result_log
            .last()
            .and_then(|record| record.message.clone())
    }

    pub fn parent(&self) -> Option<Step> {
        self.arena.borrow()[self.node].parent.map(|idx| Step {
            arena: Rc::clone(&self.arena),
            node: idx,
        })
    }

    /// Handle to the tree's root.
    pub fn root(&self) -> Step {
        let root = self.arena.borrow().root().unwrap_or(self.node);
        Step {
            arena: Rc::clone(&self.arena),
            node: root,
        }
    }
}

fn validated(value: &str, name: &'static str) -> BuildResult<String> {
    if value.trim().is_empty() {
        return Err(BuildError::EmptyArgument(name));
    }
    Ok(value.to_string())
}
