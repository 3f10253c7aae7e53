//! Tests for report rendering: tree lines, state words, counts, and the
//! failure payload raised by `go_with`.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use rstest::{fixture, rstest};

use spectree::{given, verify, Mode, Outcome, RunConfig, Step};

fn plain(mode: Mode) -> RunConfig {
    RunConfig { mode, color: false }
}

/// Root of a tree with one failing branch and one passing branch.
#[fixture]
fn mixed_tree() -> Step {
    let root = given("a service", || {}).unwrap();
    let rejecting = root
        .when("rejecting the request", || verify::fail("boom"))
        .unwrap();
    rejecting.it("never seen", || {}).unwrap();
    let accepting = root.when("accepting the request", || {}).unwrap();
    accepting.it("responds", || {}).unwrap();
    root
}

#[test]
fn given_passing_tree_when_rendering_then_every_line_ends_in_ok() {
    // Arrange
    let root = given("a counter", || {}).unwrap();
    let step = root.when("incrementing", || {}).unwrap();
    step.it("holds", || {}).unwrap();

    // Act
    let report = root.run(plain(Mode::Quick));

    // Assert
    assert!(report.passed);
    let lines: Vec<&str> = report.text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("given a counter (avg "));
    assert!(lines[0].ends_with(" ok"));
    assert!(lines[1].starts_with("└── when incrementing (avg "));
    assert!(lines[2].starts_with("    └── it holds (avg "));
    assert_eq!(
        lines[3],
        "spec result: PASSED (total 3: ok 3, failed 0, panicked 0, not run 0)"
    );
}

#[rstest]
fn given_mixed_outcomes_when_rendering_then_summary_counts_each_state(mixed_tree: Step) {
    // Act
    let report = mixed_tree.run(plain(Mode::Isolated));

    // Assert
    assert!(!report.passed);
    assert_eq!(report.counts.ok, 3);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.counts.not_run, 1);
    assert!(report
        .text
        .ends_with("spec result: FAILED (total 5: ok 3, failed 1, panicked 0, not run 1)\n"));
}

#[rstest]
fn given_mixed_outcomes_when_rendering_then_branches_carry_their_state(mixed_tree: Step) {
    // Act
    let report = mixed_tree.run(plain(Mode::Isolated));

    // Assert: failing branch shows the message, unreached leaf shows no
    // duration, passing branch stays clean
    let lines: Vec<&str> = report.text.lines().collect();
    assert!(lines[1].starts_with("├── when rejecting the request (avg "));
    assert!(lines[1].ends_with(" FAILED: boom"));
    assert_eq!(lines[2], "│   └── it never seen not run");
    assert!(lines[3].starts_with("└── when accepting the request (avg "));
    assert!(lines[4].starts_with("    └── it responds (avg "));
    assert!(lines[4].ends_with(" ok"));
}

#[test]
fn given_varying_failure_messages_when_rendering_then_marks_line_with_plus() {
    // Arrange: the step fails with a different message on each run
    let calls = Rc::new(Cell::new(0));
    let varying = Rc::clone(&calls);

    let root = given("a validator", || {}).unwrap();
    let step = root
        .when("checking input", move || {
            let n = varying.get() + 1;
            varying.set(n);
            if n == 1 {
                verify::fail("first failure");
            }
            verify::fail("second failure");
        })
        .unwrap();
    step.it("first probe", || {}).unwrap();
    step.it("second probe", || {}).unwrap();

    // Act: isolated mode runs the step once per probe
    let report = root.run(plain(Mode::Isolated));

    // Assert: the marker flags multiple distinct messages, the first one is
    // printed
    assert_eq!(step.runs(), 2);
    assert!(report.text.contains(" + FAILED: first failure"));
}

#[test]
fn given_panicking_step_when_rendering_then_state_word_is_panicked() {
    // Arrange
    let root = given("a machine", || {}).unwrap();
    let step = root.when("overheating", || panic!("kapow")).unwrap();
    step.it("cools down", || {}).unwrap();

    // Act
    let report = root.run(plain(Mode::Isolated));

    // Assert
    assert_eq!(step.outcome(), Outcome::Panicked);
    assert!(report.text.contains(" panicked: kapow"));
    assert!(report
        .text
        .ends_with("spec result: FAILED (total 3: ok 1, failed 0, panicked 1, not run 1)\n"));
}

#[test]
fn given_aborted_run_when_rendering_then_diagnostic_names_the_step() {
    // Arrange: fixture passes once, then breaks on replay
    let calls = Rc::new(Cell::new(0));
    let unstable = Rc::clone(&calls);

    let root = given("unstable fixture", move || {
        let n = unstable.get() + 1;
        unstable.set(n);
        if n > 1 {
            panic!("broke on call {}", n);
        }
    })
    .unwrap();
    root.it("falls over", || verify::fail("nope")).unwrap();
    root.it("never reached", || {}).unwrap();

    // Act
    let report = root.run(plain(Mode::Quick));

    // Assert
    assert!(report.aborted);
    assert!(report
        .text
        .contains("run aborted: replay of given \"unstable fixture\" failed\n"));
}

#[test]
fn given_no_assertions_when_running_isolated_then_whole_tree_stays_not_run() {
    // Arrange: without an assertion leaf there is no scenario to run
    let root = given("an orphaned fixture", || {}).unwrap();
    root.when("going nowhere", || {}).unwrap();

    // Act
    let report = root.run(plain(Mode::Isolated));

    // Assert
    assert!(!report.passed);
    assert_eq!(root.outcome(), Outcome::NotRun);
    assert_eq!(report.counts.not_run, 2);
    assert!(report.text.starts_with("given an orphaned fixture not run"));
}

#[test]
fn given_failing_spec_when_go_with_then_panic_payload_carries_the_report() {
    // Arrange
    let root = given("a counter", || {}).unwrap();
    root.it("claims the impossible", || verify::fail("it was possible"))
        .unwrap();

    // Act
    let outcome = catch_unwind(AssertUnwindSafe(|| root.go_with(plain(Mode::Quick))));

    // Assert: the payload is the plain rendered report
    let payload = outcome.expect_err("a failing spec must panic");
    let text = payload
        .downcast_ref::<String>()
        .expect("payload should be the rendered report");
    assert!(text.contains("it claims the impossible"));
    assert!(text.contains("FAILED: it was possible"));
    assert!(text.contains("spec result: FAILED"));
}

#[test]
fn given_passing_spec_when_go_with_then_returns_without_panicking() {
    // Arrange
    let root = given("a counter", || {}).unwrap();
    root.it("holds", || {}).unwrap();

    // Act & Assert
    root.go_with(plain(Mode::Quick));
}
