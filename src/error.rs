//! The error taxonomy (spec §3.5, §7): grammar-construction defects vs. the
//! recoverable error catalog attached to a [`RootNode`](crate::node::RootNode).
use crate::position::Position;
use std::fmt::{Display, Formatter};

/// Severity of a catalog entry, ordered `Note < Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Fatal,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

/// A single entry in a root node's error catalog (spec §3.5).
#[derive(Debug, Clone)]
pub struct ParseErrorEntry {
    pub position: usize,
    pub severity: Severity,
    pub message: String,
    pub code: Option<String>,
    /// Name of the node where the error was detected (debug/report purposes
    /// only; nodes are owned by the tree so we keep a name, not a reference).
    pub node_name: Option<String>,
}

impl ParseErrorEntry {
    pub fn new(position: usize, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            position,
            severity,
            message: message.into(),
            code: None,
            node_name: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    fn dedup_key(&self) -> (usize, Option<&str>) {
        (self.position, self.code.as_deref())
    }

    pub fn same_entry(&self, other: &Self) -> bool {
        self.dedup_key() == other.dedup_key()
    }

    pub fn display_at(&self, pos: Position) -> String {
        format!("{}: {} (at {})", self.severity, self.message, pos)
    }
}

/// A grammar-construction-time defect: raised while building or freezing a
/// [`Grammar`](crate::parser::Grammar), never while parsing.
#[derive(Debug, thiserror::Error)]
pub enum ImplementationError {
    #[error("symbol `{0}` is already bound to a parser")]
    SymbolAlreadyBound(String),
    #[error("forward reference `{0}` was never bound with `set`")]
    UnboundForward(String),
    #[error("`drop` can only wrap a disposable parser ({0})")]
    DropOnNonDisposable(String),
    #[error("unguarded infinite repetition: body of `{0}` can match the empty string")]
    UnguardedRepetition(String),
    #[error("duplicate pipeline junction target `{0}`")]
    DuplicateJunctionTarget(String),
    #[error("{what}: {message}")]
    Other { what: String, message: String },
}

impl ImplementationError {
    pub fn new(what: impl Into<String>, message: impl Into<String>) -> Self {
        ImplementationError::Other {
            what: what.into(),
            message: message.into(),
        }
    }
}

/// Top-level error returned across the single `Result` boundary a caller of
/// [`Pipeline`](crate::pipeline::Pipeline) deals with.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Implementation(#[from] ImplementationError),
    #[error("fatal error during parsing/compilation: {0}")]
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn dedup_key_ignores_message_text() {
        let a = ParseErrorEntry::new(5, Severity::Error, "first").with_code("E1");
        let b = ParseErrorEntry::new(5, Severity::Error, "second").with_code("E1");
        assert!(a.same_entry(&b));
    }
}
