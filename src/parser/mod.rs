//! The parser graph (spec §3.4/§4.3): a frozen arena of combinator nodes.
//!
//! The grammar's parser variants form a *closed set* (spec §3.4), so — per
//! Design Notes §9 — the graph is an arena of [`ParserNode`]s addressed by
//! small integer [`ParserId`]s rather than a tree of `Rc<dyn Trait>` objects.
//! A [`ForwardRef`] holds a mutable, set-once index so recursive
//! non-terminals can be wired up without true reference cycles.
mod builder;
mod freeze;

pub use builder::GrammarBuilder;

use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParserId(pub(crate) usize);

/// A filter applied by `retrieve`/`pop`: `(captured_text, text_at_position)`.
pub type RetrieveFilter = Rc<dyn Fn(&str, &str) -> bool>;

/// A resume point locator used during mandatory-marker recovery (spec §4.4.3).
#[derive(Clone)]
pub enum ResumePattern {
    Literal(String),
    Regex(Regex),
    Predicate(Rc<dyn Fn(&str, usize) -> Option<usize>>),
}

impl std::fmt::Debug for ResumePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResumePattern::Literal(s) => write!(f, "Literal({s:?})"),
            ResumePattern::Regex(r) => write!(f, "Regex({})", r.as_str()),
            ResumePattern::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// One element of a [`ParserKind::Sequence`]: a child parser, optionally
/// tagged `mandatory` (spec §3.4, "Mandatory marker").
#[derive(Debug, Clone, Copy)]
pub struct SeqItem {
    pub id: ParserId,
    pub mandatory: bool,
}

/// The closed set of parser variants (spec §3.4).
#[derive(Debug, Clone)]
pub enum ParserKind {
    Literal(String),
    LiteralCI(String),
    Regex(Regex),
    CharRange(char, char),
    EndOfInput,
    Never,
    Whitespace {
        ws: Regex,
        comment: Option<Regex>,
    },
    Sequence(Vec<SeqItem>),
    Alternative(Vec<ParserId>),
    Option(ParserId),
    ZeroOrMore(ParserId),
    OneOrMore(ParserId),
    Counted(ParserId, usize, Option<usize>),
    LookaheadPositive(ParserId),
    LookaheadNegative(ParserId),
    Lookbehind(ParserId),
    Forward(RefCell<Option<ParserId>>),
    Drop(ParserId),
    Synonym(ParserId),
    Capture(String, ParserId),
    Retrieve(String, Option<RetrieveFilter>),
    Pop(String),
}

#[derive(Debug)]
pub(crate) struct ParserNode {
    pub kind: ParserKind,
    pub symbol: Option<String>,
    pub resume: Option<ResumePattern>,
}

impl ParserNode {
    fn new(kind: ParserKind) -> Self {
        Self {
            kind,
            symbol: None,
            resume: None,
        }
    }
}

/// A frozen, shareable parser graph (spec §3.6: "built once and then
/// frozen"). Equivalence classes, the disposable bit vector, and statefulness
/// are all fixed here and reused read-only across concurrent parses.
pub struct Grammar {
    pub(crate) arena: Vec<ParserNode>,
    pub(crate) root: ParserId,
    pub(crate) classes: Vec<u64>,
    pub(crate) disposable_bits: Vec<bool>,
    pub(crate) stateful_bits: Vec<bool>,
}

impl Grammar {
    pub fn root(&self) -> ParserId {
        self.root
    }

    pub(crate) fn kind(&self, id: ParserId) -> &ParserKind {
        &self.arena[id.0].kind
    }

    pub(crate) fn node(&self, id: ParserId) -> &ParserNode {
        &self.arena[id.0]
    }

    pub fn symbol_of(&self, id: ParserId) -> Option<&str> {
        self.arena[id.0].symbol.as_deref()
    }

    pub fn is_disposable(&self, id: ParserId) -> bool {
        self.disposable_bits[id.0]
    }

    pub fn is_stateful(&self, id: ParserId) -> bool {
        self.stateful_bits[id.0]
    }

    pub fn equivalence_class(&self, id: ParserId) -> u64 {
        self.classes[id.0]
    }

    pub(crate) fn forward_target(&self, id: ParserId) -> ParserId {
        match &self.arena[id.0].kind {
            ParserKind::Forward(cell) => cell
                .borrow()
                .expect("forward references are resolved at freeze time"),
            _ => id,
        }
    }
}
