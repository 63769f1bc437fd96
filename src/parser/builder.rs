//! Programmatic parser-construction API (spec §6.1).
//!
//! Operator overloading for grammar construction is "a convenience of the
//! source language, not a requirement" (Design Notes §9); this builder
//! exposes the equivalent named methods (`then`/`or_`/`opt`/`star`/`plus`/
//! `required`) directly, in the spirit of `lang_pt`'s `into_*` builder
//! methods (`src/production/builder.rs`).
use super::{ParserKind, ParserNode, RetrieveFilter, SeqItem};
use crate::error::ImplementationError;
use crate::parser::{Grammar, ParserId, ResumePattern};
use regex::Regex;
use std::cell::RefCell;

pub struct GrammarBuilder {
    arena: RefCell<Vec<ParserNode>>,
    disposable: RefCell<Vec<bool>>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            arena: RefCell::new(Vec::new()),
            disposable: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, kind: ParserKind) -> ParserId {
        let mut arena = self.arena.borrow_mut();
        let id = ParserId(arena.len());
        arena.push(ParserNode::new(kind));
        self.disposable.borrow_mut().push(true);
        id
    }

    // --- terminals -----------------------------------------------------
    pub fn literal(&self, text: impl Into<String>) -> ParserId {
        self.push(ParserKind::Literal(text.into()))
    }
    pub fn literal_ci(&self, text: impl Into<String>) -> ParserId {
        self.push(ParserKind::LiteralCI(text.into()))
    }
    pub fn regex(&self, pattern: &str) -> Result<ParserId, ImplementationError> {
        let re = Regex::new(pattern)
            .map_err(|e| ImplementationError::new("InvalidRegex", e.to_string()))?;
        Ok(self.push(ParserKind::Regex(re)))
    }
    pub fn char_range(&self, lo: char, hi: char) -> ParserId {
        self.push(ParserKind::CharRange(lo, hi))
    }
    pub fn eof(&self) -> ParserId {
        self.push(ParserKind::EndOfInput)
    }
    pub fn never(&self) -> ParserId {
        self.push(ParserKind::Never)
    }
    pub fn whitespace(&self, ws: &str, comment: Option<&str>) -> Result<ParserId, ImplementationError> {
        let ws = Regex::new(ws).map_err(|e| ImplementationError::new("InvalidRegex", e.to_string()))?;
        let comment = comment
            .map(Regex::new)
            .transpose()
            .map_err(|e| ImplementationError::new("InvalidRegex", e.to_string()))?;
        Ok(self.push(ParserKind::Whitespace { ws, comment }))
    }

    // --- combinators -----------------------------------------------------
    /// Plain sequence element (not mandatory).
    pub fn seq_item(id: ParserId) -> SeqItem {
        SeqItem { id, mandatory: false }
    }
    /// Tag a sequence element as mandatory (spec §3.4, the `§` marker).
    pub fn required(id: ParserId) -> SeqItem {
        SeqItem { id, mandatory: true }
    }
    pub fn sequence(&self, items: Vec<SeqItem>) -> ParserId {
        self.push(ParserKind::Sequence(items))
    }
    /// Convenience: a sequence built entirely from non-mandatory ids.
    pub fn then(&self, items: Vec<ParserId>) -> ParserId {
        self.sequence(items.into_iter().map(Self::seq_item).collect())
    }
    pub fn alternative(&self, items: Vec<ParserId>) -> ParserId {
        self.push(ParserKind::Alternative(items))
    }
    pub fn or_(&self, items: Vec<ParserId>) -> ParserId {
        self.alternative(items)
    }
    pub fn option(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::Option(inner))
    }
    pub fn opt(&self, inner: ParserId) -> ParserId {
        self.option(inner)
    }
    pub fn zero_or_more(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::ZeroOrMore(inner))
    }
    pub fn star(&self, inner: ParserId) -> ParserId {
        self.zero_or_more(inner)
    }
    pub fn one_or_more(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::OneOrMore(inner))
    }
    pub fn plus(&self, inner: ParserId) -> ParserId {
        self.one_or_more(inner)
    }
    pub fn counted(&self, inner: ParserId, min: usize, max: Option<usize>) -> ParserId {
        self.push(ParserKind::Counted(inner, min, max))
    }
    pub fn lookahead(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::LookaheadPositive(inner))
    }
    pub fn neg_lookahead(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::LookaheadNegative(inner))
    }
    pub fn lookbehind(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::Lookbehind(inner))
    }
    pub fn forward(&self) -> ParserId {
        self.push(ParserKind::Forward(RefCell::new(None)))
    }
    /// Bind a forward reference's target exactly once (spec §4.3).
    pub fn set(&self, forward: ParserId, target: ParserId) -> Result<(), ImplementationError> {
        let arena = self.arena.borrow();
        match &arena[forward.0].kind {
            ParserKind::Forward(cell) => {
                let mut slot = cell.borrow_mut();
                if slot.is_some() {
                    return Err(ImplementationError::new(
                        "DoubleBind",
                        format!("forward reference {:?} already bound", forward),
                    ));
                }
                *slot = Some(target);
                Ok(())
            }
            _ => Err(ImplementationError::new(
                "NotAForward",
                format!("{:?} is not a forward reference", forward),
            )),
        }
    }
    pub fn drop(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::Drop(inner))
    }
    pub fn synonym(&self, inner: ParserId) -> ParserId {
        self.push(ParserKind::Synonym(inner))
    }
    pub fn capture(&self, name: impl Into<String>, inner: ParserId) -> ParserId {
        self.push(ParserKind::Capture(name.into(), inner))
    }
    pub fn retrieve(&self, name: impl Into<String>, filter: Option<RetrieveFilter>) -> ParserId {
        self.push(ParserKind::Retrieve(name.into(), filter))
    }
    pub fn pop(&self, name: impl Into<String>) -> ParserId {
        self.push(ParserKind::Pop(name.into()))
    }

    // --- symbols & resume patterns ---------------------------------------
    /// Bind a name to a parser (spec §4.3/§6.1). A name starting with `:`
    /// keeps the parser disposable; any other name marks it non-disposable.
    pub fn symbol(&self, id: ParserId, name: &'static str) -> Result<(), ImplementationError> {
        let mut arena = self.arena.borrow_mut();
        if arena[id.0].symbol.is_some() {
            return Err(ImplementationError::SymbolAlreadyBound(name.to_string()));
        }
        arena[id.0].symbol = Some(name.to_string());
        self.disposable.borrow_mut()[id.0] = name.starts_with(':');
        Ok(())
    }

    pub fn resume_on_literal(&self, id: ParserId, literal: impl Into<String>) {
        self.arena.borrow_mut()[id.0].resume = Some(ResumePattern::Literal(literal.into()));
    }
    pub fn resume_on_regex(&self, id: ParserId, pattern: &str) -> Result<(), ImplementationError> {
        let re = Regex::new(pattern)
            .map_err(|e| ImplementationError::new("InvalidRegex", e.to_string()))?;
        self.arena.borrow_mut()[id.0].resume = Some(ResumePattern::Regex(re));
        Ok(())
    }

    pub fn freeze(self, root: ParserId) -> Result<Grammar, ImplementationError> {
        super::freeze::freeze(self, root)
    }

    pub(crate) fn into_parts(self) -> (Vec<ParserNode>, Vec<bool>) {
        (self.arena.into_inner(), self.disposable.into_inner())
    }

    pub(crate) fn arena_ref(&self) -> std::cell::Ref<'_, Vec<ParserNode>> {
        self.arena.borrow()
    }
}
