//! Operator library (spec §4.5.2): the functions a table entry binds to a
//! node name. Each operator mutates the node it is given and reports what
//! should happen to it in its parent's children list via [`PostAction`].
use super::{Path, PostAction};
use crate::error::{ParseErrorEntry, Severity};
use crate::node::{Content, Node};
use crate::transform::predicates::Predicate;
use regex::Regex;
use std::rc::Rc;

pub type Op = Rc<dyn for<'e> Fn(&mut Node, &Path<'e>) -> PostAction>;

/// Records a development-mode note that an operator's precondition wasn't
/// met (spec §10.3); a no-op when `development_mode` is off.
fn note(path: &Path, node: &Node, message: &str) {
    if path.development_mode {
        let pos = node.pos().unwrap_or(0);
        let entry = ParseErrorEntry::new(pos, Severity::Note, message.to_string())
            .with_node(node.name.clone());
        path.errors.borrow_mut().push(entry);
    }
}

/// If this node has exactly one child, it is replaced by that child —
/// including the child's own name, content and attributes.
pub fn replace_by_single_child() -> Op {
    Rc::new(|n: &mut Node, path: &Path| {
        match n.content() {
            Content::Children(cs) if cs.len() == 1 => {
                let only = n.children_mut().unwrap().pop().unwrap();
                *n = only;
            }
            Content::Children(_) => note(
                path,
                n,
                "replace_by_single_child applied to a node without exactly one child",
            ),
            Content::Text(_) => note(path, n, "replace_by_single_child applied to a leaf"),
        }
        PostAction::Keep
    })
}

/// Like [`replace_by_single_child`], but only when this node carries no
/// attributes of its own to lose.
pub fn reduce_single_child() -> Op {
    Rc::new(|n: &mut Node, path: &Path| {
        let one_child = matches!(n.content(), Content::Children(cs) if cs.len() == 1);
        if one_child && n.attrs().is_none() {
            let only = n.children_mut().unwrap().pop().unwrap();
            *n = only;
        } else if one_child {
            note(
                path,
                n,
                "reduce_single_child skipped: node carries attributes of its own",
            );
        } else {
            note(
                path,
                n,
                "reduce_single_child applied to a node without exactly one child",
            );
        }
        PostAction::Keep
    })
}

/// This node vanishes from its parent; its own children take its place.
pub fn replace_by_children() -> Op {
    Rc::new(|_: &mut Node, _: &Path| PostAction::ReplaceWithChildren)
}

/// Recursively replaces every child matching `pred` with that child's own
/// children, flattening nested matching structure into one level.
pub fn flatten(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            let mut out = Vec::with_capacity(children.len());
            for child in std::mem::take(children) {
                flatten_into(child, &pred, path, &mut out);
            }
            *children = out;
        }
        PostAction::Keep
    })
}

fn flatten_into(node: Node, pred: &Predicate, path: &Path, out: &mut Vec<Node>) {
    if pred(&node, path) {
        for child in node.children().to_vec() {
            flatten_into(child, pred, path, out);
        }
    } else {
        out.push(node);
    }
}

/// Collapses this node into a leaf holding its own derived content.
pub fn collapse() -> Op {
    Rc::new(|n: &mut Node, _: &Path| {
        let text = n.derived_content();
        n.set_content(Content::Text(text));
        PostAction::Keep
    })
}

/// Collapses every child matching `pred` into a leaf of its own derived
/// content, leaving non-matching children alone.
pub fn collapse_children_if(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            for child in children.iter_mut() {
                if pred(child, path) {
                    let text = child.derived_content();
                    child.set_content(Content::Text(text));
                }
            }
        }
        PostAction::Keep
    })
}

/// Merges runs of adjacent leaf children matching `pred` into one leaf.
pub fn merge_adjacent(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            let mut merged: Vec<Node> = Vec::with_capacity(children.len());
            for child in std::mem::take(children) {
                if child.is_leaf() && pred(&child, path) {
                    if let Some(last) = merged.last_mut() {
                        if last.is_leaf() && pred(last, path) {
                            let combined =
                                format!("{}{}", last.text().unwrap_or(""), child.text().unwrap_or(""));
                            last.set_text(combined);
                            continue;
                        }
                    }
                }
                merged.push(child);
            }
            *children = merged;
        }
        PostAction::Keep
    })
}

/// Moves leading/trailing children matching `pred` out of this node by
/// merging their derived content into the nearest remaining leaf sibling.
/// Stops at the first non-matching or non-leaf neighbor on each side.
pub fn move_fringes(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            while children.len() > 1 && pred(&children[0], path) {
                if !children[1].is_leaf() {
                    break;
                }
                let fringe = children.remove(0);
                let text = fringe.derived_content();
                let merged = format!("{}{}", text, children[0].text().unwrap_or(""));
                children[0].set_text(merged);
            }
            while children.len() > 1 && pred(children.last().unwrap(), path) {
                let last_idx = children.len() - 1;
                if !children[last_idx - 1].is_leaf() {
                    break;
                }
                let fringe = children.pop().unwrap();
                let text = fringe.derived_content();
                let last_idx = children.len() - 1;
                let merged = format!("{}{}", children[last_idx].text().unwrap_or(""), text);
                children[last_idx].set_text(merged);
            }
        }
        PostAction::Keep
    })
}

pub fn lstrip(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            while !children.is_empty() && pred(&children[0], path) {
                children.remove(0);
            }
        }
        PostAction::Keep
    })
}

pub fn rstrip(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            while !children.is_empty() && pred(children.last().unwrap(), path) {
                children.pop();
            }
        }
        PostAction::Keep
    })
}

pub fn strip(pred: Predicate) -> Op {
    let l = lstrip(pred.clone());
    let r = rstrip(pred);
    Rc::new(move |n: &mut Node, path: &Path| {
        l(n, path);
        r(n, path)
    })
}

pub fn remove_children_if(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            children.retain(|c| !pred(c, path));
        }
        PostAction::Keep
    })
}

pub fn remove_children(names: Vec<&'static str>) -> Op {
    remove_children_if(crate::transform::predicates::is_one_of(names))
}

/// Removes every substring of this node's own text content matching `re`,
/// mirroring [`crate::slice::Slice::replace`] with an empty replacement.
pub fn remove_content(re: Regex) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        match n.content() {
            Content::Text(t) => {
                let stripped = re.replace_all(t, "").into_owned();
                n.set_text(stripped);
            }
            Content::Children(_) => {
                note(path, n, "remove_content applied to a node with children, not text")
            }
        }
        PostAction::Keep
    })
}

/// Drops this node's first and last child, e.g. to remove `(` and `)`
/// bracket tokens once they are no longer needed to guide the transform.
pub fn remove_brackets() -> Op {
    Rc::new(|n: &mut Node, path: &Path| {
        if let Some(children) = n.children_mut() {
            if children.len() >= 2 {
                children.pop();
                children.remove(0);
            } else {
                note(path, n, "remove_brackets applied to a node with fewer than two children");
            }
        }
        PostAction::Keep
    })
}

pub fn remove_tokens(literals: Vec<&'static str>) -> Op {
    Rc::new(move |n: &mut Node, _: &Path| {
        if let Some(children) = n.children_mut() {
            children.retain(|c| !(c.is_leaf() && literals.iter().any(|l| c.text() == Some(*l))));
        }
        PostAction::Keep
    })
}

pub fn remove_if(pred: Predicate) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if pred(n, path) {
            PostAction::Remove
        } else {
            PostAction::Keep
        }
    })
}

pub fn change_name(name: impl Into<String>) -> Op {
    let name = name.into();
    Rc::new(move |n: &mut Node, _: &Path| {
        n.rename(name.clone());
        PostAction::Keep
    })
}

pub fn replace_content_with(text: impl Into<String>) -> Op {
    let text = text.into();
    Rc::new(move |n: &mut Node, _: &Path| {
        n.set_text(text.clone());
        PostAction::Keep
    })
}

pub fn transform_content(f: Rc<dyn Fn(&str) -> String>) -> Op {
    Rc::new(move |n: &mut Node, _: &Path| {
        let text = f(&n.derived_content());
        n.set_content(Content::Text(text));
        PostAction::Keep
    })
}

pub fn apply_if(pred: Predicate, op: Op) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if pred(n, path) {
            op(n, path)
        } else {
            PostAction::Keep
        }
    })
}

pub fn apply_unless(pred: Predicate, op: Op) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if pred(n, path) {
            PostAction::Keep
        } else {
            op(n, path)
        }
    })
}

pub fn apply_ifelse(pred: Predicate, then_op: Op, else_op: Op) -> Op {
    Rc::new(move |n: &mut Node, path: &Path| {
        if pred(n, path) {
            then_op(n, path)
        } else {
            else_op(n, path)
        }
    })
}

/// Appends an entry to the transform pass's shared error sink (spec §4.5.2).
pub fn add_error(severity: Severity, message: impl Into<String>) -> Op {
    let message = message.into();
    Rc::new(move |n: &mut Node, path: &Path| {
        let pos = n.pos().unwrap_or(0);
        let entry = ParseErrorEntry::new(pos, severity, message.clone()).with_node(n.name.clone());
        path.errors.borrow_mut().push(entry);
        PostAction::Keep
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::predicates;
    use std::cell::RefCell;

    fn path() -> Path<'static> {
        let errors: &'static RefCell<Vec<ParseErrorEntry>> =
            Box::leak(Box::new(RefCell::new(Vec::new())));
        Path {
            ancestors: Vec::new(),
            sibling_names: Vec::new(),
            errors,
            development_mode: false,
        }
    }

    #[test]
    fn replace_by_single_child_adopts_the_child() {
        let op = replace_by_single_child();
        let mut n = Node::inner("wrapper", vec![Node::leaf("NUMBER", "3")]);
        let p = path();
        op(&mut n, &p);
        assert_eq!(n.name, "NUMBER");
        assert_eq!(n.text(), Some("3"));
    }

    #[test]
    fn flatten_inlines_matching_children_recursively() {
        let pred = predicates::is_one_of(vec!["group"]);
        let op = flatten(pred);
        let mut n = Node::inner(
            "list",
            vec![
                Node::leaf("a", "1"),
                Node::inner(
                    "group",
                    vec![
                        Node::leaf("b", "2"),
                        Node::inner("group", vec![Node::leaf("c", "3")]),
                    ],
                ),
            ],
        );
        let p = path();
        op(&mut n, &p);
        let names: Vec<&str> = n.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn lstrip_and_rstrip_drop_matching_fringes_only() {
        let ws = predicates::is_one_of(vec![":ws"]);
        let op = strip(ws);
        let mut n = Node::inner(
            "phrase",
            vec![
                Node::leaf(":ws", " "),
                Node::leaf("WORD", "hi"),
                Node::leaf(":ws", " "),
            ],
        );
        let p = path();
        op(&mut n, &p);
        assert_eq!(n.children().len(), 1);
        assert_eq!(n.children()[0].name, "WORD");
    }

    #[test]
    fn remove_if_requests_removal_from_parent() {
        let pred = predicates::is_one_of(vec!["junk"]);
        let op = remove_if(pred);
        let mut n = Node::leaf("junk", "x");
        let p = path();
        assert_eq!(op(&mut n, &p), PostAction::Remove);
    }
}
