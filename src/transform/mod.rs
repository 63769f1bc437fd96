//! The declarative tree-transformation engine (spec §4.5): a depth-first,
//! post-order pass over a parse tree driven by a name-keyed operator table,
//! turning a CST into an AST.
pub mod ops;
pub mod predicates;

pub use ops::Op;
pub use predicates::Predicate;

use crate::error::ParseErrorEntry;
use crate::node::{Content, Node};
use std::cell::RefCell;
use std::collections::HashMap;

/// What happens to a node in its parent's children list once the node's own
/// operators have run. Operators only ever see the node they're bound to
/// (spec §9); this is how `flatten`/`replace_by_children`/`remove_if` still
/// manage to affect how the *parent* rebuilds its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Keep,
    Remove,
    ReplaceWithChildren,
}

/// Read-only traversal context available to predicates and operators.
/// Ancestors and siblings are tracked by name, not by full node reference,
/// to avoid aliasing the node under mutation; `errors` is a single sink
/// shared across the whole pass, written to by [`ops::add_error`].
pub struct Path<'e> {
    pub ancestors: Vec<String>,
    pub sibling_names: Vec<String>,
    pub errors: &'e RefCell<Vec<ParseErrorEntry>>,
    /// Spec §10.3: when set, operators note unmet preconditions instead of
    /// silently no-oping.
    pub development_mode: bool,
}

const PROLOGUE_KEY: &str = "<";
const EPILOGUE_KEY: &str = ">";
const WILDCARD_KEY: &str = "*";

/// A name-keyed operator table (spec §4.5.1). `"<"` and `">"` run on every
/// node, before and after its name-specific entry; `"*"` is the fallback for
/// names with no specific entry.
#[derive(Default)]
pub struct TransformTable {
    table: HashMap<String, Vec<Op>>,
}

impl TransformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `ops` to `key`. A comma-separated key (spec §4.5.4) registers
    /// the same ops under each of the named entries.
    pub fn on(mut self, key: &str, ops: Vec<Op>) -> Self {
        for name in key.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            self.table
                .entry(name.to_string())
                .or_default()
                .extend(ops.clone());
        }
        self
    }

    pub fn prologue(self, ops: Vec<Op>) -> Self {
        self.on(PROLOGUE_KEY, ops)
    }

    pub fn epilogue(self, ops: Vec<Op>) -> Self {
        self.on(EPILOGUE_KEY, ops)
    }

    pub fn wildcard(self, ops: Vec<Op>) -> Self {
        self.on(WILDCARD_KEY, ops)
    }

    fn ops_for(&self, name: &str) -> Option<&[Op]> {
        self.table.get(name).map(|v| v.as_slice())
    }
}

/// Runs `table` over `root` in place and returns whatever `add_error`
/// recorded along the way.
pub fn transform(root: &mut Node, table: &TransformTable) -> Vec<ParseErrorEntry> {
    transform_with_mode(root, table, false)
}

/// Like [`transform`], but with spec §10.3's `development_mode` switch
/// threaded down to every operator invocation.
pub fn transform_with_mode(
    root: &mut Node,
    table: &TransformTable,
    development_mode: bool,
) -> Vec<ParseErrorEntry> {
    let errors = RefCell::new(Vec::new());
    let action = transform_node(root, &[], &[], table, &errors, development_mode);
    if action == PostAction::ReplaceWithChildren {
        // A root has no parent to splice into; keep its own name but adopt
        // its (now flattened) children as its new content.
        if let Content::Children(cs) = root.content().clone() {
            *root = Node::inner(root.name.clone(), cs);
        }
    }
    errors.into_inner()
}

fn transform_children(
    children: &mut Vec<Node>,
    ancestors: &[String],
    table: &TransformTable,
    errors: &RefCell<Vec<ParseErrorEntry>>,
    development_mode: bool,
) {
    let names: Vec<String> = children.iter().map(|c| c.name.clone()).collect();
    let mut rebuilt = Vec::with_capacity(children.len());
    for mut child in std::mem::take(children) {
        match transform_node(&mut child, ancestors, &names, table, errors, development_mode) {
            PostAction::Keep => rebuilt.push(child),
            PostAction::Remove => {}
            PostAction::ReplaceWithChildren => match child.content().clone() {
                Content::Children(cs) => rebuilt.extend(cs),
                Content::Text(_) => rebuilt.push(child),
            },
        }
    }
    *children = rebuilt;
}

fn transform_node(
    node: &mut Node,
    ancestors: &[String],
    sibling_names: &[String],
    table: &TransformTable,
    errors: &RefCell<Vec<ParseErrorEntry>>,
    development_mode: bool,
) -> PostAction {
    if let Some(children) = node.children_mut() {
        let mut child_ancestors = ancestors.to_vec();
        child_ancestors.push(node.name.clone());
        transform_children(children, &child_ancestors, table, errors, development_mode);
    }

    let path = Path {
        ancestors: ancestors.to_vec(),
        sibling_names: sibling_names.to_vec(),
        errors,
        development_mode,
    };

    let mut action = PostAction::Keep;
    if let Some(ops) = table.ops_for(PROLOGUE_KEY) {
        for op in ops {
            action = combine(action, op(node, &path));
        }
    }
    let key_ops = table
        .ops_for(&node.name)
        .or_else(|| table.ops_for(WILDCARD_KEY));
    if let Some(ops) = key_ops {
        for op in ops {
            action = combine(action, op(node, &path));
        }
    }
    if let Some(ops) = table.ops_for(EPILOGUE_KEY) {
        for op in ops {
            action = combine(action, op(node, &path));
        }
    }
    action
}

/// Once a non-`Keep` action is requested, later ops still run (they may
/// still want to mutate the node's content) but the action sticks.
fn combine(prev: PostAction, next: PostAction) -> PostAction {
    if prev == PostAction::Keep {
        next
    } else {
        prev
    }
}
