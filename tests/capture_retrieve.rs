//! End-to-end scenario (spec §8, "Capture/retrieve"): the opening delimiter
//! is captured and the closing delimiter is matched against it with `pop`,
//! so `|abc|` matches but `|abc#` does not — and because `Capture`/`Pop` are
//! stateful, neither participates in memoization (spec §4.4.4).
use treeforge::driver::Driver;
use treeforge::parser::{Grammar, GrammarBuilder};
use treeforge::Code;

fn build_grammar() -> Grammar {
    let b = GrammarBuilder::new();
    let open = b.capture("delim", b.regex(r#"[^a-zA-Z0-9\s]"#).unwrap());
    let body = b.regex(r"[a-zA-Z0-9]+").unwrap();
    b.symbol(body, "BODY").unwrap();
    let close = b.pop("delim");

    let delimited = b.then(vec![open, body, close]);
    b.symbol(delimited, "delimited").unwrap();

    b.freeze(delimited).unwrap()
}

#[test]
fn matching_closing_delimiter_parses_cleanly() {
    let grammar = build_grammar();
    let code = Code::new("|abc|");
    let root = Driver::new(&grammar, &code).parse();
    assert!(root.errors.is_empty(), "errors: {:?}", root.errors);

    let node = &root.node.children()[0];
    assert_eq!(node.name, "delimited");
    let body = node
        .children()
        .iter()
        .find(|c| c.name == "BODY")
        .expect("BODY child");
    assert_eq!(body.text(), Some("abc"));
}

#[test]
fn mismatched_closing_delimiter_fails_to_parse() {
    let grammar = build_grammar();
    let code = Code::new("|abc#");
    let root = Driver::new(&grammar, &code).parse();
    assert_eq!(root.errors.len(), 1);
    assert_eq!(root.errors[0].position, 4);
}

#[test]
fn each_match_attempt_captures_independently_rather_than_reusing_a_memoized_result() {
    // Two different opening delimiters over structurally identical bodies:
    // if captures were folded into the ordinary memo key (by equivalence
    // class + position only, ignoring capture state) the second parse could
    // wrongly reuse the first's result. Parsing both from scratch with fresh
    // drivers exercises that each is captured and retrieved independently.
    let grammar = build_grammar();

    let pipe = Driver::new(&grammar, &Code::new("|abc|")).parse();
    assert!(pipe.errors.is_empty());

    let hash = Driver::new(&grammar, &Code::new("#abc#")).parse();
    assert!(hash.errors.is_empty());
}
