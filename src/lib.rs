//! Behavior-specification trees for tests.
//!
//! A specification is written as a fluent chain of `given`/`when`/`it`
//! calls. The chain assembles a tree: each call attaches a node beneath the
//! nearest ancestor that may parent it, so assertions line up as siblings
//! under the step they examine and new `when` steps climb back to the
//! enclosing `given`. Running the tree executes every scenario (a
//! root-to-assertion path) and renders a hierarchical report.
//!
//! Two execution strategies are available: [`Mode::Isolated`] replays the
//! fixture steps for every scenario, [`Mode::Quick`] (the default) scans the
//! tree once and only replays fixtures after a failure.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use spectree::{given, verify};
//!
//! let count = Rc::new(Cell::new(0));
//!
//! let setup = Rc::clone(&count);
//! let root = given("a counter at zero", move || setup.set(0)).unwrap();
//! let bump = Rc::clone(&count);
//! let incremented = root
//!     .when("it is incremented", move || bump.set(bump.get() + 1))
//!     .unwrap();
//! let seen = Rc::clone(&count);
//! incremented
//!     .it("holds one", move || verify::equal(seen.get(), 1))
//!     .unwrap();
//!
//! root.go();
//! ```

pub mod arena;
pub mod builder;
pub mod claim;
pub mod config;
mod engine;
pub mod errors;
pub mod node;
pub mod report;
pub mod testing;
pub mod verify;

pub use builder::{given, Step};
pub use claim::Claim;
pub use config::{Mode, RunConfig};
pub use errors::{BuildError, BuildResult};
pub use node::{Kind, Outcome, RunRecord};
pub use report::{Report, StateCounts};
pub use verify::{CaughtPanic, Failure, FailureKind};
