//! Predicate library for table-driven matching (spec §4.5.2): small,
//! composable tests used both as table keys' guards and as arguments to
//! operators like `flatten`/`strip`/`remove_children_if`.
use super::Path;
use crate::node::{Content, Node};
use regex::Regex;
use std::rc::Rc;

pub type Predicate = Rc<dyn for<'e> Fn(&Node, &Path<'e>) -> bool>;

pub fn is_anonymous() -> Predicate {
    Rc::new(|n: &Node, _: &Path| n.name.is_empty() || n.name.starts_with(':'))
}

pub fn is_empty() -> Predicate {
    Rc::new(|n: &Node, _: &Path| match n.content() {
        Content::Text(t) => t.is_empty(),
        Content::Children(c) => c.is_empty(),
    })
}

pub fn is_token() -> Predicate {
    Rc::new(|n: &Node, _: &Path| n.is_leaf())
}

pub fn is_one_of(names: Vec<&str>) -> Predicate {
    let names: Vec<String> = names.into_iter().map(String::from).collect();
    Rc::new(move |n: &Node, _: &Path| names.iter().any(|x| x == &n.name))
}

pub fn not_one_of(names: Vec<&str>) -> Predicate {
    neg(is_one_of(names))
}

pub fn name_matches(pattern: &str) -> Result<Predicate, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(Rc::new(move |n: &Node, _: &Path| re.is_match(&n.name)))
}

pub fn content_matches(pattern: &str) -> Result<Predicate, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(Rc::new(move |n: &Node, _: &Path| {
        re.is_match(&n.derived_content())
    }))
}

pub fn has_content(expected: impl Into<String>) -> Predicate {
    let expected = expected.into();
    Rc::new(move |n: &Node, _: &Path| n.derived_content() == expected)
}

pub fn has_attr(key: &str, value: Option<&str>) -> Predicate {
    let key = key.to_string();
    let value = value.map(String::from);
    Rc::new(move |n: &Node, _: &Path| match (n.attr(&key), &value) {
        (Some(v), Some(expected)) => v == expected,
        (Some(_), None) => true,
        (None, _) => false,
    })
}

/// Tests an ancestor's *name* (spec §4.5.2). [`Path`] tracks ancestors by
/// name only, not by full node reference — see DESIGN.md.
pub fn has_ancestor(name_pred: impl Fn(&str) -> bool + 'static) -> Predicate {
    Rc::new(move |_: &Node, path: &Path| path.ancestors.iter().any(|a| name_pred(a)))
}

pub fn has_parent(name_pred: impl Fn(&str) -> bool + 'static) -> Predicate {
    Rc::new(move |_: &Node, path: &Path| {
        path.ancestors.last().map(|a| name_pred(a)).unwrap_or(false)
    })
}

/// Tests a sibling's *name* at the current nesting level, for the same
/// reason as [`has_ancestor`].
pub fn has_sibling(name_pred: impl Fn(&str) -> bool + 'static) -> Predicate {
    Rc::new(move |_: &Node, path: &Path| path.sibling_names.iter().any(|s| name_pred(s)))
}

pub fn has_child(pred: Predicate) -> Predicate {
    Rc::new(move |n: &Node, path: &Path| n.children().iter().any(|c| pred(c, path)))
}

pub fn has_descendant(pred: Predicate) -> Predicate {
    Rc::new(move |n: &Node, path: &Path| {
        n.children()
            .iter()
            .any(|c| !c.list(&|x| pred(x, path)).is_empty())
    })
}

pub fn any_of(preds: Vec<Predicate>) -> Predicate {
    Rc::new(move |n: &Node, path: &Path| preds.iter().any(|p| p(n, path)))
}

pub fn all_of(preds: Vec<Predicate>) -> Predicate {
    Rc::new(move |n: &Node, path: &Path| preds.iter().all(|p| p(n, path)))
}

pub fn neg(pred: Predicate) -> Predicate {
    Rc::new(move |n: &Node, path: &Path| !pred(n, path))
}
