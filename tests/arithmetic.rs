//! End-to-end scenario (spec §8, "Arithmetic"): a grammar for expressions
//! with the usual `*`/`/` over `+`/`-` precedence, folded left-associative by
//! a transform-table operator, then evaluated.
use std::rc::Rc;
use treeforge::driver::Driver;
use treeforge::parser::{Grammar, GrammarBuilder};
use treeforge::transform::{ops, transform, Op, Path, PostAction, TransformTable};
use treeforge::{Code, Content, Node};

/// Folds a flat `[operand, OP, operand, OP, operand, ...]` children list into
/// a left-nested binary tree, renaming each fold point per `mapping`. This is
/// scenario-specific (spec §8 gives it as a user-supplied operator, not part
/// of the library), so it lives here rather than in `transform::ops`.
fn left_associative(mapping: &'static [(&'static str, &'static str)]) -> Op {
    Rc::new(move |n: &mut Node, _path: &Path| {
        let children = match n.content().clone() {
            Content::Children(cs) => cs,
            Content::Text(_) => return PostAction::Keep,
        };
        if children.len() <= 1 {
            return PostAction::Keep;
        }
        let mut iter = children.into_iter();
        let mut acc = iter.next().unwrap();
        while let (Some(op), Some(rhs)) = (iter.next(), iter.next()) {
            let op_text = op.text().unwrap_or("").to_string();
            let name = mapping
                .iter()
                .find(|(lit, _)| *lit == op_text)
                .map(|(_, name)| *name)
                .unwrap_or("OP");
            acc = Node::inner(name, vec![acc, rhs]);
        }
        n.set_content(Content::Children(vec![acc]));
        PostAction::Keep
    })
}

fn build_grammar() -> Grammar {
    let b = GrammarBuilder::new();
    let ws = b.whitespace(r"[ \t\r\n]*", None).unwrap();

    let number = b.regex(r"[0-9]+(\.[0-9]+)?").unwrap();
    b.symbol(number, "NUMBER").unwrap();

    let expr_fwd = b.forward();
    b.symbol(expr_fwd, "expression").unwrap();

    let lparen = b.drop(b.literal("("));
    let rparen = b.drop(b.literal(")"));
    let group = b.then(vec![lparen, ws, expr_fwd, ws, rparen]);
    b.symbol(group, "group").unwrap();

    let factor = b.alternative(vec![group, number]);
    b.symbol(factor, "factor").unwrap();

    let star = b.literal("*");
    b.symbol(star, "OP").unwrap();
    let slash = b.literal("/");
    b.symbol(slash, "OP").unwrap();
    let mul_op = b.alternative(vec![star, slash]);

    let term_tail = b.then(vec![ws, mul_op, ws, factor]);
    let term_tail_star = b.zero_or_more(term_tail);
    let term = b.then(vec![factor, term_tail_star]);
    b.symbol(term, "term").unwrap();

    let plus = b.literal("+");
    b.symbol(plus, "OP").unwrap();
    let minus = b.literal("-");
    b.symbol(minus, "OP").unwrap();
    let add_op = b.alternative(vec![plus, minus]);

    let expr_tail = b.then(vec![ws, add_op, ws, term]);
    let expr_tail_star = b.zero_or_more(expr_tail);
    let expr_body = b.then(vec![term, expr_tail_star]);
    b.set(expr_fwd, expr_body).unwrap();

    b.freeze(expr_fwd).unwrap()
}

fn eval_arith(n: &Node) -> f64 {
    match n.name.as_str() {
        "NUMBER" => n.text().unwrap().parse().unwrap(),
        "PLUS" => eval_arith(&n.children()[0]) + eval_arith(&n.children()[1]),
        "MINUS" => eval_arith(&n.children()[0]) - eval_arith(&n.children()[1]),
        "MUL" => eval_arith(&n.children()[0]) * eval_arith(&n.children()[1]),
        "DIV" => eval_arith(&n.children()[0]) / eval_arith(&n.children()[1]),
        other => panic!("unexpected node in evaluated tree: {other}"),
    }
}

#[test]
fn precedence_is_respected_and_left_associative() {
    let grammar = build_grammar();
    let code = Code::new("3 * (4 + 5)");
    let mut root = Driver::new(&grammar, &code).parse();
    assert!(root.errors.is_empty(), "errors: {:?}", root.errors);

    let table = TransformTable::new()
        .on(
            "term, expression",
            vec![
                left_associative(&[("*", "MUL"), ("/", "DIV"), ("+", "PLUS"), ("-", "MINUS")]),
                ops::replace_by_single_child(),
            ],
        )
        .on("group, factor", vec![ops::replace_by_single_child()]);
    transform(&mut root.node, &table);

    let expected = Node::inner(
        "MUL",
        vec![
            Node::leaf("NUMBER", "3"),
            Node::inner(
                "PLUS",
                vec![Node::leaf("NUMBER", "4"), Node::leaf("NUMBER", "5")],
            ),
        ],
    );
    assert_eq!(root.node.children()[0], expected);
    assert_eq!(eval_arith(&root.node.children()[0]), 27.0);
}

#[test]
fn left_to_right_chain_without_parens_also_associates_left() {
    let grammar = build_grammar();
    let code = Code::new("10 - 2 - 3");
    let mut root = Driver::new(&grammar, &code).parse();
    assert!(root.errors.is_empty(), "errors: {:?}", root.errors);

    let table = TransformTable::new()
        .on(
            "term, expression",
            vec![
                left_associative(&[("*", "MUL"), ("/", "DIV"), ("+", "PLUS"), ("-", "MINUS")]),
                ops::replace_by_single_child(),
            ],
        )
        .on("group, factor", vec![ops::replace_by_single_child()]);
    transform(&mut root.node, &table);

    // (10 - 2) - 3, not 10 - (2 - 3)
    let top = &root.node.children()[0];
    assert_eq!(top.name, "MINUS");
    assert_eq!(top.children()[1].text(), Some("3"));
    assert_eq!(top.children()[0].name, "MINUS");
    assert_eq!(eval_arith(top), 5.0);
}
