/// Execution strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Replays every fixture step once per scenario, so assertions never
    /// observe each other's side effects. Cost grows with scenario count.
    Isolated,
    /// Single linear scan over the whole tree with a fixture-only prefix
    /// replay after each failure. Linear when everything passes; sibling
    /// assertions are not re-isolated from each other.
    Quick,
}

/// Configuration for one run, passed explicitly to the run entry points.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub mode: Mode,
    /// Colorize state words in the rendered report.
    pub color: bool,
}

impl Default for RunConfig {
    /// Quick execution with colored output. Quick is the default because it
    /// keeps sibling steps cumulative: a chain of alternating when/it calls
    /// reads as one progressing scenario.
    fn default() -> Self {
        Self {
            mode: Mode::Quick,
            color: true,
        }
    }
}
