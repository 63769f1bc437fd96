//! The parse driver (spec §4.4): depth-first descent over a frozen
//! [`Grammar`], with memoization, left-recursion seed-growing,
//! mandatory-marker error recovery, and a variable-capture stack.
use crate::error::{ParseErrorEntry, Severity};
use crate::node::{Node, RootNode};
use crate::parser::{Grammar, ParserId, ParserKind, ResumePattern};
use crate::slice::Code;
use std::collections::HashMap;

/// What a successful match contributes to its parent: the span it covered
/// and the (possibly empty, possibly multi-element) list of nodes it
/// produces — mirrors `lang_pt`'s `SuccessData` (`src/success_data.rs`).
#[derive(Clone, Debug)]
struct Success {
    start: usize,
    end: usize,
    nodes: Vec<Node>,
}

impl Success {
    fn empty(pos: usize) -> Self {
        Success {
            start: pos,
            end: pos,
            nodes: Vec::new(),
        }
    }
}

type MatchResult = Result<Success, ()>;

#[derive(Clone)]
enum MemoEntry {
    InProgress,
    Done(MatchResult),
}

/// Tracks maximum progress reached so the eventual "unparsed remainder"
/// error points at the furthest failure, matching `lang_pt`'s `Cache`
/// (`src/cache.rs`).
struct ProgressTracker {
    max: usize,
}

pub struct Driver<'g, 'c> {
    grammar: &'g Grammar,
    code: &'c Code,
    text: &'c str,
    memo: HashMap<(u64, usize), MemoEntry>,
    left_recursion_hits: std::collections::HashSet<(u64, usize)>,
    captures: HashMap<String, Vec<String>>,
    progress: ProgressTracker,
    errors: Vec<ParseErrorEntry>,
    trace: Trace,
}

/// Minimal entry/result tracing, in the spirit of `lang_pt`'s debug-only
/// `Log<T>` (spec §10.2). Off by default; tests can flip it on to assert the
/// driver actually attempted the productions they expect.
#[derive(Default)]
pub struct Trace {
    pub enabled: bool,
    pub events: Vec<String>,
}

impl Trace {
    fn log(&mut self, msg: impl Into<String>) {
        if self.enabled {
            self.events.push(msg.into());
        }
    }
}

impl<'g, 'c> Driver<'g, 'c> {
    pub fn new(grammar: &'g Grammar, code: &'c Code) -> Self {
        Self {
            grammar,
            code,
            text: code.as_str(),
            memo: HashMap::new(),
            left_recursion_hits: std::collections::HashSet::new(),
            captures: HashMap::new(),
            progress: ProgressTracker { max: 0 },
            errors: Vec::new(),
            trace: Trace::default(),
        }
    }

    pub fn with_trace(mut self) -> Self {
        self.trace.enabled = true;
        self
    }

    pub fn trace_events(&self) -> &[String] {
        &self.trace.events
    }

    /// Run the root parser over the whole buffer and produce a `RootNode`
    /// tagged `"CST"` (spec §4.6.1). Unconsumed trailing input produces an
    /// `Error` whose position is the first unconsumed offset (spec §8).
    pub fn parse(mut self) -> RootNode {
        let root = self.grammar.root();
        let result = self.eval(root, 0);
        let (node, mut errors) = match result {
            Ok(success) => {
                let consumed = success.end;
                let mut errs = std::mem::take(&mut self.errors);
                if consumed < self.text.len() {
                    errs.push(ParseErrorEntry::new(
                        consumed,
                        Severity::Error,
                        format!(
                            "unexpected trailing input starting with {:?}",
                            &self.text[consumed..(consumed + 20).min(self.text.len())]
                        ),
                    ));
                }
                (Node::inner("root", success.nodes), errs)
            }
            Err(()) => {
                let errs = if self.errors.is_empty() {
                    vec![ParseErrorEntry::new(
                        self.progress.max,
                        Severity::Error,
                        "failed to parse input".to_string(),
                    )]
                } else {
                    std::mem::take(&mut self.errors)
                };
                (Node::inner("root", Vec::new()), errs)
            }
        };
        let mut root_node = RootNode::new(node, Code::new(self.text.to_string()), "CST");
        errors.sort_by_key(|e| e.position);
        for e in errors {
            root_node.add_error(e);
        }
        root_node
    }

    fn record_progress(&mut self, pos: usize) {
        if pos > self.progress.max {
            self.progress.max = pos;
        }
    }

    fn capture_snapshot(&self) -> HashMap<String, usize> {
        self.captures.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }

    fn capture_restore(&mut self, snap: &HashMap<String, usize>) {
        self.captures.retain(|k, _| snap.contains_key(k));
        for (k, v) in self.captures.iter_mut() {
            if let Some(&len) = snap.get(k) {
                v.truncate(len);
            }
        }
    }

    fn effective_name(&self, id: ParserId, auto: &str) -> String {
        self.grammar
            .symbol_of(id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| auto.to_string())
    }

    /// Memoized evaluation (spec §4.4.4): stateful parsers bypass the
    /// memo table entirely; others are keyed by equivalence class.
    fn eval(&mut self, id: ParserId, pos: usize) -> MatchResult {
        self.trace.log(format!("enter {:?}@{}", id, pos));
        if self.grammar.is_stateful(id) {
            let snap = self.capture_snapshot();
            let result = self.raw_eval(id, pos);
            if result.is_err() {
                self.capture_restore(&snap);
            }
            return result;
        }

        let class = self.grammar.equivalence_class(id);
        let key = (class, pos);
        if let Some(entry) = self.memo.get(&key) {
            return match entry {
                MemoEntry::InProgress => {
                    self.left_recursion_hits.insert(key);
                    Err(())
                }
                MemoEntry::Done(r) => r.clone(),
            };
        }

        self.memo.insert(key, MemoEntry::InProgress);
        let snap = self.capture_snapshot();
        let mut result = self.raw_eval(id, pos);
        if result.is_err() {
            self.capture_restore(&snap);
        }

        if self.left_recursion_hits.remove(&key) && result.is_ok() {
            loop {
                self.memo.insert(key, MemoEntry::Done(result.clone()));
                let snap2 = self.capture_snapshot();
                let next = self.raw_eval(id, pos);
                match next {
                    Ok(ref s) if s.end > result.as_ref().unwrap().end => result = next,
                    _ => {
                        self.capture_restore(&snap2);
                        break;
                    }
                }
            }
        }

        self.memo.insert(key, MemoEntry::Done(result.clone()));
        result
    }

    fn wrap_composite(&mut self, id: ParserId, raw: Success) -> Success {
        if self.grammar.is_disposable(id) {
            raw
        } else {
            let name = self.effective_name(id, ":anon");
            let mut node = Node::inner(name, raw.nodes);
            node.assign_pos(raw.start);
            Success {
                start: raw.start,
                end: raw.end,
                nodes: vec![node],
            }
        }
    }

    fn raw_eval(&mut self, id: ParserId, pos: usize) -> MatchResult {
        // `self.grammar` is a plain `&'g Grammar`, so this borrow's lifetime
        // is independent of `self`'s other (mutable) fields below.
        let kind = self.grammar.kind(id);
        match kind {
            ParserKind::Literal(s) => self.match_literal(id, pos, s, false),
            ParserKind::LiteralCI(s) => self.match_literal(id, pos, s, true),
            ParserKind::Regex(re) => self.match_regex(id, pos, re),
            ParserKind::CharRange(lo, hi) => self.match_char_range(id, pos, *lo, *hi),
            ParserKind::EndOfInput => {
                if pos >= self.text.len() {
                    Ok(Success::empty(pos))
                } else {
                    self.record_progress(pos);
                    Err(())
                }
            }
            ParserKind::Never => Err(()),
            ParserKind::Whitespace { ws, comment } => Ok(self.match_whitespace(pos, ws, comment.as_ref())),
            ParserKind::Sequence(items) => self.match_sequence(id, pos, items),
            ParserKind::Alternative(items) => {
                let raw = self.match_alternative(pos, items)?;
                Ok(self.wrap_composite(id, raw))
            }
            ParserKind::Option(inner) => {
                let raw = match self.eval(*inner, pos) {
                    Ok(s) => s,
                    Err(()) => Success::empty(pos),
                };
                Ok(self.wrap_composite(id, raw))
            }
            ParserKind::ZeroOrMore(inner) => {
                let (raw, _) = self.match_repeat(*inner, pos, None);
                Ok(self.wrap_composite(id, raw))
            }
            ParserKind::OneOrMore(inner) => {
                let raw = self.match_repeat_required(*inner, pos)?;
                Ok(self.wrap_composite(id, raw))
            }
            ParserKind::Counted(inner, min, max) => {
                let raw = self.match_counted(*inner, pos, *min, *max)?;
                Ok(self.wrap_composite(id, raw))
            }
            ParserKind::LookaheadPositive(inner) => match self.eval(*inner, pos) {
                Ok(_) => Ok(Success::empty(pos)),
                Err(()) => Err(()),
            },
            ParserKind::LookaheadNegative(inner) => match self.eval(*inner, pos) {
                Ok(_) => Err(()),
                Err(()) => Ok(Success::empty(pos)),
            },
            ParserKind::Lookbehind(inner) => {
                if self.match_lookbehind(*inner, pos) {
                    Ok(Success::empty(pos))
                } else {
                    Err(())
                }
            }
            ParserKind::Forward(cell) => {
                let target = cell.borrow().expect("forward resolved at freeze time");
                let raw = self.eval(target, pos)?;
                Ok(self.wrap_composite(id, Success { start: pos, ..raw }))
            }
            ParserKind::Drop(inner) => {
                let s = self.eval(*inner, pos)?;
                Ok(Success {
                    start: s.start,
                    end: s.end,
                    nodes: Vec::new(),
                })
            }
            ParserKind::Synonym(inner) => self.match_synonym(id, *inner, pos),
            ParserKind::Capture(name, inner) => {
                let s = self.eval(*inner, pos)?;
                let text = self.text[s.start..s.end].to_string();
                self.captures.entry(name.clone()).or_default().push(text);
                Ok(self.wrap_composite(id, s))
            }
            ParserKind::Retrieve(name, filter) => self.match_retrieve(id, pos, name, filter.as_ref(), false),
            ParserKind::Pop(name) => self.match_retrieve(id, pos, name, None, true),
        }
    }

    /// A synonym is a pure renamer (spec §3.4): the result carries only
    /// `id`'s own name, never `inner`'s. When `inner` is disposable it
    /// contributes no name of its own, so its raw content is wrapped under
    /// `id` exactly like any other composite. When `inner` already carries
    /// its own symbol, its match produced exactly one already-named node;
    /// reusing that node and renaming it in place avoids nesting a second
    /// wrapper around it.
    fn match_synonym(&mut self, id: ParserId, inner: ParserId, pos: usize) -> MatchResult {
        if self.grammar.is_disposable(inner) {
            let raw = self.eval(inner, pos)?;
            Ok(self.wrap_composite(id, raw))
        } else {
            let raw = self.raw_eval(inner, pos)?;
            let mut nodes = raw.nodes;
            debug_assert_eq!(
                nodes.len(),
                1,
                "a non-disposable parser must contribute exactly one node"
            );
            if let Some(node) = nodes.first_mut() {
                node.rename(self.effective_name(id, ":syn"));
            }
            Ok(Success {
                start: raw.start,
                end: raw.end,
                nodes,
            })
        }
    }

    fn match_literal(&mut self, id: ParserId, pos: usize, needle: &str, ci: bool) -> MatchResult {
        let rest = &self.text[pos..];
        let matches = if ci {
            rest.len() >= needle.len() && rest[..needle.len()].eq_ignore_ascii_case(needle)
        } else {
            rest.starts_with(needle)
        };
        if matches {
            let end = pos + needle.len();
            let mut leaf = Node::leaf(
                self.effective_name(id, ":lit"),
                self.text[pos..end].to_string(),
            );
            leaf.assign_pos(pos);
            Ok(Success {
                start: pos,
                end,
                nodes: vec![leaf],
            })
        } else {
            self.record_progress(pos);
            Err(())
        }
    }

    fn match_regex(&mut self, id: ParserId, pos: usize, re: &regex::Regex) -> MatchResult {
        match self.code.whole().match_regex_at(re, pos) {
            Some(len) => {
                let end = pos + len;
                let mut leaf = Node::leaf(self.effective_name(id, ":regex"), self.text[pos..end].to_string());
                leaf.assign_pos(pos);
                Ok(Success {
                    start: pos,
                    end,
                    nodes: vec![leaf],
                })
            }
            None => {
                self.record_progress(pos);
                Err(())
            }
        }
    }

    fn match_char_range(&mut self, id: ParserId, pos: usize, lo: char, hi: char) -> MatchResult {
        match self.text[pos..].chars().next() {
            Some(c) if c >= lo && c <= hi => {
                let end = pos + c.len_utf8();
                let mut leaf = Node::leaf(self.effective_name(id, ":range"), c.to_string());
                leaf.assign_pos(pos);
                Ok(Success {
                    start: pos,
                    end,
                    nodes: vec![leaf],
                })
            }
            _ => {
                self.record_progress(pos);
                Err(())
            }
        }
    }

    fn match_whitespace(&mut self, pos: usize, ws: &regex::Regex, comment: Option<&regex::Regex>) -> Success {
        let mut p = pos;
        loop {
            let mut advanced = false;
            if let Some(len) = self.code.whole().match_regex_at(ws, p) {
                if len > 0 {
                    p += len;
                    advanced = true;
                }
            }
            if let Some(c) = comment {
                if let Some(len) = self.code.whole().match_regex_at(c, p) {
                    if len > 0 {
                        p += len;
                        advanced = true;
                    }
                }
            }
            if !advanced {
                break;
            }
        }
        Success {
            start: pos,
            end: p,
            nodes: Vec::new(),
        }
    }

    fn match_retrieve(
        &mut self,
        id: ParserId,
        pos: usize,
        name: &str,
        filter: Option<&crate::parser::RetrieveFilter>,
        consume: bool,
    ) -> MatchResult {
        let captured = match self.captures.get(name).and_then(|v| v.last()) {
            Some(s) => s.clone(),
            None => return Err(()),
        };
        let rest_end = (pos + captured.len()).min(self.text.len());
        let candidate = &self.text[pos..rest_end];
        let ok = match filter {
            Some(f) => f(&captured, candidate),
            None => candidate == captured,
        };
        if !ok {
            self.record_progress(pos);
            return Err(());
        }
        if consume {
            self.captures.get_mut(name).unwrap().pop();
        }
        let end = pos + captured.len();
        let mut leaf = Node::leaf(self.effective_name(id, ":retrieve"), captured);
        leaf.assign_pos(pos);
        Ok(Success {
            start: pos,
            end,
            nodes: vec![leaf],
        })
    }

    /// Runs `inner` up to `max` times (unbounded if `None`), stopping early
    /// on failure. Returns the combined span/nodes plus the iteration count,
    /// since a disposable `inner` may itself contribute zero or several
    /// nodes per iteration.
    fn match_repeat(&mut self, inner: ParserId, pos: usize, max: Option<usize>) -> (Success, usize) {
        let mut p = pos;
        let mut nodes = Vec::new();
        let mut count = 0usize;
        loop {
            if let Some(max) = max {
                if count >= max {
                    break;
                }
            }
            match self.eval(inner, p) {
                Ok(s) => {
                    let zero_length = s.end == p;
                    nodes.extend(s.nodes);
                    p = s.end;
                    count += 1;
                    // A repetition body that matched empty would loop
                    // forever; stop after this one iteration (spec §8).
                    if zero_length {
                        break;
                    }
                }
                Err(()) => break,
            }
        }
        (
            Success {
                start: pos,
                end: p,
                nodes,
            },
            count,
        )
    }

    fn match_repeat_required(&mut self, inner: ParserId, pos: usize) -> MatchResult {
        match self.eval(inner, pos) {
            Err(()) => Err(()),
            Ok(first) => {
                let zero_length = first.end == pos;
                if zero_length {
                    return Ok(Success {
                        start: pos,
                        end: first.end,
                        nodes: first.nodes,
                    });
                }
                let (rest, _) = self.match_repeat(inner, first.end, None);
                let mut nodes = first.nodes;
                nodes.extend(rest.nodes);
                Ok(Success {
                    start: pos,
                    end: rest.end,
                    nodes,
                })
            }
        }
    }

    fn match_counted(&mut self, inner: ParserId, pos: usize, min: usize, max: Option<usize>) -> MatchResult {
        let (s, count) = self.match_repeat(inner, pos, max);
        if count >= min {
            Ok(s)
        } else {
            self.record_progress(pos);
            Err(())
        }
    }

    fn match_lookbehind(&mut self, inner: ParserId, pos: usize) -> bool {
        const WINDOW: usize = 256;
        let lo = pos.saturating_sub(WINDOW);
        for start in (lo..=pos).rev() {
            let snap = self.capture_snapshot();
            if let Ok(s) = self.eval(inner, start) {
                if s.end == pos {
                    return true;
                }
            }
            self.capture_restore(&snap);
        }
        false
    }

    fn match_alternative(&mut self, pos: usize, items: &[ParserId]) -> MatchResult {
        for &item in items {
            let snap = self.capture_snapshot();
            match self.eval(item, pos) {
                Ok(s) => return Ok(s),
                Err(()) => self.capture_restore(&snap),
            }
        }
        Err(())
    }

    fn match_sequence(&mut self, seq_id: ParserId, pos: usize, items: &[crate::parser::SeqItem]) -> MatchResult {
        let mut p = pos;
        let mut nodes = Vec::new();
        let mut passed_mandatory = false;
        let snap_start = self.capture_snapshot();

        let mut i = 0;
        while i < items.len() {
            let item = items[i];
            if item.mandatory {
                passed_mandatory = true;
            }
            match self.eval(item.id, p) {
                Ok(s) => {
                    nodes.extend(s.nodes);
                    p = s.end;
                    i += 1;
                }
                Err(()) => {
                    if !passed_mandatory {
                        self.capture_restore(&snap_start);
                        return Err(());
                    }
                    // Recoverable: convert into a catalog error and try to
                    // resynchronize (spec §4.4.3).
                    let resume = self
                        .grammar
                        .node(seq_id)
                        .resume
                        .clone()
                        .or_else(|| self.grammar.node(item.id).resume.clone());
                    self.errors.push(
                        ParseErrorEntry::new(
                            p,
                            Severity::Error,
                            format!("expected production at offset {p} but failed to match"),
                        )
                        .with_node(self.effective_name(item.id, ":anon")),
                    );
                    match resume.and_then(|r| self.find_resume_point(&r, p)) {
                        Some(resume_at) => {
                            nodes.push(error_marker_node(p, resume_at, self.text));
                            p = resume_at;
                            i += 1;
                        }
                        None => {
                            nodes.push(error_marker_node(p, p, self.text));
                            i = items.len();
                        }
                    }
                }
            }
        }
        Ok(self.wrap_composite(seq_id, Success { start: pos, end: p, nodes }))
    }

    fn find_resume_point(&self, pattern: &ResumePattern, from: usize) -> Option<usize> {
        let slice = self.code.whole();
        match pattern {
            ResumePattern::Literal(lit) => slice.find(lit, from, None),
            ResumePattern::Regex(re) => slice.find_regex(re, from, None),
            ResumePattern::Predicate(f) => f(self.text, from),
        }
    }
}

/// A placeholder left in the tree at a mandatory-marker recovery point,
/// carrying the skipped text so a later transform pass can inspect it.
fn error_marker_node(start: usize, end: usize, text: &str) -> Node {
    let mut n = Node::leaf(":error", &text[start..end]);
    n.assign_pos(start);
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Content;
    use crate::parser::GrammarBuilder;

    fn lit_grammar() -> Grammar {
        let b = GrammarBuilder::new();
        let a = b.literal("a");
        b.symbol(a, "A").unwrap();
        b.freeze(a).unwrap()
    }

    #[test]
    fn literal_matches_and_leaves_remainder_as_error() {
        let g = lit_grammar();
        let code = Code::new("ab");
        let root = Driver::new(&g, &code).parse();
        assert_eq!(root.errors.len(), 1);
        assert_eq!(root.errors[0].position, 1);
    }

    #[test]
    fn zero_or_more_over_nullable_terminates() {
        let b = GrammarBuilder::new();
        let opt = b.option(b.literal("x"));
        let star = b.zero_or_more(opt);
        // `opt` is itself nullable, but the repetition body here is an
        // Option wrapping a literal, which IS rejected at freeze time as
        // an unguarded repetition.
        assert!(b.freeze(star).is_err());
    }

    #[test]
    fn left_recursive_arithmetic_is_left_associative() {
        // E = E "+" T | T ; T = NUMBER
        //
        // `recurse_branch` stays anonymous (disposable): its only job is to
        // describe "E, then +, then T" as E's own recursive alternative, not
        // to introduce a second named layer. Naming it (e.g. "Plus") would
        // make its own wrap nest under E's wrap on every growth step,
        // collapsing the left-recursive chain into single-child nodes
        // instead of the flat `[E, "+", NUMBER]` triple each step produces.
        let b = GrammarBuilder::new();
        let number = b.regex("^[0-9]+").unwrap();
        b.symbol(number, "NUMBER").unwrap();

        let e = b.forward();
        let plus = b.literal("+");
        let recurse_branch = b.then(vec![e, plus, number]);
        let alt = b.alternative(vec![recurse_branch, number]);
        b.set(e, alt).unwrap();
        b.symbol(e, "E").unwrap();

        let g = b.freeze(e).unwrap();
        let code = Code::new("1+2+3");
        let root = Driver::new(&g, &code).parse();
        assert!(root.errors.is_empty(), "errors: {:?}", root.errors);
        // left-associative shape: (("1" "+" "2") "+" "3")
        let top = &root.node.children()[0];
        assert_eq!(top.name, "E");
        match top.content() {
            Content::Children(cs) => {
                assert_eq!(cs.len(), 3);
                assert_eq!(cs[0].name, "E");
                assert_eq!(cs[1].text(), Some("+"));
                assert_eq!(cs[2].text(), Some("3"));
                match cs[0].content() {
                    Content::Children(inner) => {
                        assert_eq!(inner.len(), 3);
                        assert_eq!(inner[0].name, "E");
                        assert_eq!(inner[1].text(), Some("+"));
                        assert_eq!(inner[2].text(), Some("2"));
                    }
                    _ => panic!("expected children"),
                }
            }
            _ => panic!("expected children"),
        }
    }
}
