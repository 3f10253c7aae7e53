//! Tree-to-text rendering and the run verdict.

use colored::Colorize;
use generational_arena::Index;
use termtree::Tree;

use crate::arena::SpecArena;
use crate::node::{Node, Outcome};

/// Node tallies by aggregate state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub not_run: usize,
    pub ok: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl StateCounts {
    pub fn total(&self) -> usize {
        self.not_run + self.ok + self.failed + self.panicked
    }
}

/// Outcome of one specification run.
#[derive(Debug, Clone)]
pub struct Report {
    /// True iff every node in the tree ended with aggregate state `ok`.
    pub passed: bool,
    /// True when a quick-mode replay failure cut the run short.
    pub aborted: bool,
    /// Rendered tree followed by the summary line.
    pub text: String,
    pub counts: StateCounts,
}

/// Renders the whole tree plus summary. Unreached nodes show as `not run`;
/// an aborted run gets a diagnostic line naming the fixture step whose
/// replay failed.
pub(crate) fn render(arena: &SpecArena, aborted: Option<Index>, color: bool) -> Report {
    let mut text = match arena.root().and_then(|root| subtree(arena, root, color)) {
        Some(tree) => tree.to_string(),
        None => String::new(),
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }

    if let Some(failed_idx) = aborted {
        if let Some(node) = arena.node(failed_idx) {
            text.push_str(&format!(
                "run aborted: replay of {} {:?} failed\n",
                node.kind.label(),
                node.description
            ));
        }
    }

    let counts = tally(arena);
    let passed = counts.failed == 0 && counts.panicked == 0 && counts.not_run == 0;
    text.push_str(&format!(
        "spec result: {} (total {}: ok {}, failed {}, panicked {}, not run {})\n",
        verdict_word(passed, color),
        counts.total(),
        counts.ok,
        counts.failed,
        counts.panicked,
        counts.not_run
    ));

    Report {
        passed,
        aborted: aborted.is_some(),
        text,
        counts,
    }
}

fn subtree(arena: &SpecArena, idx: Index, color: bool) -> Option<Tree<String>> {
    let node = arena.node(idx)?;
    let leaves: Vec<Tree<String>> = node
        .children
        .iter()
        .filter_map(|&child| subtree(arena, child, color))
        .collect();
    Some(Tree::new(node_line(node, color)).with_leaves(leaves))
}

/// One report line: kind label, description, average duration, the state
/// word, and, for failing aggregates, the first distinct failure message
/// plus a `+` marker when more than one distinct message was recorded.
fn node_line(node: &Node, color: bool) -> String {
    let mut line = format!("{} {}", node.kind.label(), node.description);
    if let Some(avg) = node.average_elapsed() {
        line.push_str(&format!(" (avg {:?})", avg));
    }
    // A swallowed, expected panic leaves its node ok; neither its messages
    // nor the marker belong on the line then.
    let failing = matches!(node.aggregate, Outcome::Failed | Outcome::Panicked);
    let messages = node.distinct_failure_messages();
    if failing && messages.len() > 1 {
        line.push_str(" +");
    }
    line.push(' ');
    line.push_str(&state_word(node.aggregate, color));
    if failing {
        if let Some(first) = messages.first() {
            line.push_str(": ");
            line.push_str(first);
        }
    }
    line
}

fn tally(arena: &SpecArena) -> StateCounts {
    let mut counts = StateCounts::default();
    for (_, node) in arena.iter() {
        match node.aggregate {
            Outcome::NotRun => counts.not_run += 1,
            Outcome::Passed => counts.ok += 1,
            Outcome::Failed => counts.failed += 1,
            Outcome::Panicked => counts.panicked += 1,
        }
    }
    counts
}

// Failure message text stays plain; only state and verdict words are
// colorized. Respects NO_COLOR / terminal detection via the colored crate.
fn state_word(outcome: Outcome, color: bool) -> String {
    let word = outcome.state_word();
    if !color {
        return word.to_string();
    }
    match outcome {
        Outcome::NotRun => word.yellow().to_string(),
        Outcome::Passed => word.green().to_string(),
        Outcome::Failed => word.red().to_string(),
        Outcome::Panicked => word.red().bold().to_string(),
    }
}

fn verdict_word(passed: bool, color: bool) -> String {
    let word = if passed { "PASSED" } else { "FAILED" };
    if !color {
        return word.to_string();
    }
    if passed {
        word.green().bold().to_string()
    } else {
        word.red().bold().to_string()
    }
}
