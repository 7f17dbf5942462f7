//! Per-run context threaded through every component

/// Settings that shape output but never change run semantics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Surface subject output, request traces and per-test lines
    pub verbose: bool,

    /// Use colored, symbol-decorated console output
    pub decorated: bool,
}

impl RunContext {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            decorated: false,
        }
    }

    pub fn with_decorations(mut self, decorated: bool) -> Self {
        self.decorated = decorated;
        self
    }
}
