//! Validation and derived-data computation run once when a [`GrammarBuilder`]
//! is frozen into a [`Grammar`] (spec §3.6, §4.3, §4.4.4, §4.4.6).
use super::builder::GrammarBuilder;
use super::{Grammar, ParserId, ParserKind, ParserNode};
use crate::error::ImplementationError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub(crate) fn freeze(
    builder: GrammarBuilder,
    root: ParserId,
) -> Result<Grammar, ImplementationError> {
    let (arena, disposable_bits) = builder.into_parts();

    check_forward_refs_bound(&arena)?;
    check_drop_compatibility(&arena, &disposable_bits)?;

    let nullable = compute_all_nullable(&arena);
    check_unguarded_repetition(&arena, &nullable)?;

    let classes = compute_all_classes(&arena);
    let stateful_bits = compute_all_stateful(&arena);

    Ok(Grammar {
        arena,
        root,
        classes,
        disposable_bits,
        stateful_bits,
    })
}

fn check_forward_refs_bound(arena: &[ParserNode]) -> Result<(), ImplementationError> {
    for (i, node) in arena.iter().enumerate() {
        if let ParserKind::Forward(cell) = &node.kind {
            if cell.borrow().is_none() {
                let label = node
                    .symbol
                    .clone()
                    .unwrap_or_else(|| format!(":forward#{i}"));
                return Err(ImplementationError::UnboundForward(label));
            }
        }
    }
    Ok(())
}

fn check_drop_compatibility(
    arena: &[ParserNode],
    disposable: &[bool],
) -> Result<(), ImplementationError> {
    for node in arena {
        if let ParserKind::Drop(inner) = &node.kind {
            if !disposable[inner.0] {
                let label = arena[inner.0]
                    .symbol
                    .clone()
                    .unwrap_or_else(|| "<anonymous>".to_string());
                return Err(ImplementationError::DropOnNonDisposable(label));
            }
        }
    }
    Ok(())
}

/// Conservative, cycle-safe nullability: whether a parser can match the
/// empty string *in every case observable without running the parse*.
/// `Retrieve`/`Pop` are treated as non-nullable since their nullability
/// depends on runtime capture state (spec §9, Open Questions).
fn compute_all_nullable(arena: &[ParserNode]) -> Vec<bool> {
    let mut memo = vec![None; arena.len()];
    for i in 0..arena.len() {
        if memo[i].is_none() {
            let mut visiting = vec![false; arena.len()];
            nullable_of(arena, ParserId(i), &mut memo, &mut visiting);
        }
    }
    memo.into_iter().map(|v| v.unwrap_or(false)).collect()
}

fn nullable_of(
    arena: &[ParserNode],
    id: ParserId,
    memo: &mut Vec<Option<bool>>,
    visiting: &mut Vec<bool>,
) -> bool {
    if let Some(v) = memo[id.0] {
        return v;
    }
    if visiting[id.0] {
        return false; // cycle guard: conservative
    }
    visiting[id.0] = true;
    let result = match &arena[id.0].kind {
        ParserKind::Literal(s) => s.is_empty(),
        ParserKind::LiteralCI(s) => s.is_empty(),
        ParserKind::Regex(re) => re.is_match(""),
        ParserKind::CharRange(_, _) => false,
        ParserKind::EndOfInput => false,
        ParserKind::Never => false,
        ParserKind::Whitespace { .. } => true,
        ParserKind::Sequence(items) => items
            .iter()
            .all(|it| nullable_of(arena, it.id, memo, visiting)),
        ParserKind::Alternative(items) => items
            .iter()
            .any(|id| nullable_of(arena, *id, memo, visiting)),
        ParserKind::Option(_) => true,
        ParserKind::ZeroOrMore(_) => true,
        ParserKind::OneOrMore(inner) => nullable_of(arena, *inner, memo, visiting),
        ParserKind::Counted(inner, min, _) => {
            *min == 0 || nullable_of(arena, *inner, memo, visiting)
        }
        ParserKind::LookaheadPositive(_) => true,
        ParserKind::LookaheadNegative(_) => true,
        ParserKind::Lookbehind(_) => true,
        ParserKind::Forward(cell) => {
            let target = cell.borrow().unwrap();
            nullable_of(arena, target, memo, visiting)
        }
        ParserKind::Drop(inner) => nullable_of(arena, *inner, memo, visiting),
        ParserKind::Synonym(inner) => nullable_of(arena, *inner, memo, visiting),
        ParserKind::Capture(_, inner) => nullable_of(arena, *inner, memo, visiting),
        ParserKind::Retrieve(_, _) => false,
        ParserKind::Pop(_) => false,
    };
    visiting[id.0] = false;
    memo[id.0] = Some(result);
    result
}

fn check_unguarded_repetition(
    arena: &[ParserNode],
    nullable: &[bool],
) -> Result<(), ImplementationError> {
    for node in arena {
        let body = match &node.kind {
            ParserKind::ZeroOrMore(inner) => Some(*inner),
            ParserKind::OneOrMore(inner) => Some(*inner),
            ParserKind::Counted(inner, _, None) => Some(*inner),
            _ => None,
        };
        if let Some(inner) = body {
            if nullable[inner.0] {
                let label = node
                    .symbol
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", node.kind));
                return Err(ImplementationError::UnguardedRepetition(label));
            }
        }
    }
    Ok(())
}

fn compute_all_classes(arena: &[ParserNode]) -> Vec<u64> {
    let mut memo = vec![None; arena.len()];
    for i in 0..arena.len() {
        if memo[i].is_none() {
            let mut visiting = vec![false; arena.len()];
            class_of(arena, ParserId(i), &mut memo, &mut visiting);
        }
    }
    memo.into_iter().map(|v| v.unwrap()).collect()
}

/// Structural hash used as the memoization key (spec §4.4.4): structurally
/// identical sub-parsers fold to the same class. Cyclic (forward-recursive)
/// parsers fall back to their own id to break the recursion, which is
/// conservative but safe (documented in DESIGN.md).
fn class_of(
    arena: &[ParserNode],
    id: ParserId,
    memo: &mut Vec<Option<u64>>,
    visiting: &mut Vec<bool>,
) -> u64 {
    if let Some(v) = memo[id.0] {
        return v;
    }
    if visiting[id.0] {
        return id.0 as u64 ^ 0x9e3779b97f4a7c15;
    }
    visiting[id.0] = true;
    let mut hasher = DefaultHasher::new();
    match &arena[id.0].kind {
        ParserKind::Literal(s) => {
            0u8.hash(&mut hasher);
            s.hash(&mut hasher);
        }
        ParserKind::LiteralCI(s) => {
            1u8.hash(&mut hasher);
            s.hash(&mut hasher);
        }
        ParserKind::Regex(re) => {
            2u8.hash(&mut hasher);
            re.as_str().hash(&mut hasher);
        }
        ParserKind::CharRange(a, b) => {
            3u8.hash(&mut hasher);
            a.hash(&mut hasher);
            b.hash(&mut hasher);
        }
        ParserKind::EndOfInput => 4u8.hash(&mut hasher),
        ParserKind::Never => 5u8.hash(&mut hasher),
        ParserKind::Whitespace { ws, comment } => {
            6u8.hash(&mut hasher);
            ws.as_str().hash(&mut hasher);
            comment.as_ref().map(|c| c.as_str()).hash(&mut hasher);
        }
        ParserKind::Sequence(items) => {
            7u8.hash(&mut hasher);
            for it in items {
                class_of(arena, it.id, memo, visiting).hash(&mut hasher);
                it.mandatory.hash(&mut hasher);
            }
        }
        ParserKind::Alternative(items) => {
            8u8.hash(&mut hasher);
            for it in items {
                class_of(arena, *it, memo, visiting).hash(&mut hasher);
            }
        }
        ParserKind::Option(inner) => {
            9u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::ZeroOrMore(inner) => {
            10u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::OneOrMore(inner) => {
            11u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Counted(inner, min, max) => {
            12u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
            min.hash(&mut hasher);
            max.hash(&mut hasher);
        }
        ParserKind::LookaheadPositive(inner) => {
            13u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::LookaheadNegative(inner) => {
            14u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Lookbehind(inner) => {
            15u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Forward(cell) => {
            let target = cell.borrow().unwrap();
            visiting[id.0] = false;
            let v = class_of(arena, target, memo, visiting);
            memo[id.0] = Some(v);
            return v;
        }
        ParserKind::Drop(inner) => {
            16u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Synonym(inner) => {
            17u8.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Capture(name, inner) => {
            18u8.hash(&mut hasher);
            name.hash(&mut hasher);
            class_of(arena, *inner, memo, visiting).hash(&mut hasher);
        }
        ParserKind::Retrieve(name, filter) => {
            19u8.hash(&mut hasher);
            name.hash(&mut hasher);
            filter.is_some().hash(&mut hasher);
        }
        ParserKind::Pop(name) => {
            20u8.hash(&mut hasher);
            name.hash(&mut hasher);
        }
    }
    visiting[id.0] = false;
    let v = hasher.finish();
    memo[id.0] = Some(v);
    v
}

fn compute_all_stateful(arena: &[ParserNode]) -> Vec<bool> {
    let mut memo = vec![None; arena.len()];
    for i in 0..arena.len() {
        if memo[i].is_none() {
            let mut visiting = vec![false; arena.len()];
            stateful_of(arena, ParserId(i), &mut memo, &mut visiting);
        }
    }
    memo.into_iter().map(|v| v.unwrap_or(false)).collect()
}

/// A parser is stateful (excluded from memoization, spec §4.4.4) if it
/// consults the variable-capture stack itself, or any descendant does —
/// caching a `Capture`'s result would otherwise silently drop its push
/// side-effect on a cache hit.
fn stateful_of(
    arena: &[ParserNode],
    id: ParserId,
    memo: &mut Vec<Option<bool>>,
    visiting: &mut Vec<bool>,
) -> bool {
    if let Some(v) = memo[id.0] {
        return v;
    }
    if visiting[id.0] {
        return false;
    }
    visiting[id.0] = true;
    let result = match &arena[id.0].kind {
        ParserKind::Retrieve(_, _) | ParserKind::Pop(_) => true,
        // Always stateful, independent of `inner`: every match pushes onto
        // the capture stack, so memoizing a cache hit would silently skip
        // that push.
        ParserKind::Capture(_, _) => true,
        ParserKind::Sequence(items) => items
            .iter()
            .any(|it| stateful_of(arena, it.id, memo, visiting)),
        ParserKind::Alternative(items) => items
            .iter()
            .any(|id| stateful_of(arena, *id, memo, visiting)),
        ParserKind::Option(inner)
        | ParserKind::ZeroOrMore(inner)
        | ParserKind::OneOrMore(inner)
        | ParserKind::Counted(inner, _, _)
        | ParserKind::LookaheadPositive(inner)
        | ParserKind::LookaheadNegative(inner)
        | ParserKind::Lookbehind(inner)
        | ParserKind::Drop(inner)
        | ParserKind::Synonym(inner) => stateful_of(arena, *inner, memo, visiting),
        ParserKind::Forward(cell) => {
            let target = cell.borrow().unwrap();
            stateful_of(arena, target, memo, visiting)
        }
        _ => false,
    };
    visiting[id.0] = false;
    memo[id.0] = Some(result);
    result
}
