//! End-to-end scenario (spec §8, "Mandatory-marker recovery"): `document =
//! ~ { WORD } §EOF`. A stray character before the input actually ends makes
//! the mandatory end-of-input fail; the driver records exactly one error and
//! resynchronizes to the end of the buffer rather than aborting outright.
use treeforge::driver::Driver;
use treeforge::parser::{Grammar, GrammarBuilder};
use treeforge::Code;

fn build_grammar() -> Grammar {
    let b = GrammarBuilder::new();
    let ws = b.whitespace(r"[ \t\r\n]*", None).unwrap();
    let word = b.regex(r"[A-Za-z]+").unwrap();
    b.symbol(word, "WORD").unwrap();

    let word_ws = b.then(vec![word, ws]);
    let body = b.zero_or_more(word_ws);
    let eof = b.eof();

    let doc = b.sequence(vec![
        GrammarBuilder::seq_item(ws),
        GrammarBuilder::seq_item(body),
        GrammarBuilder::required(eof),
    ]);
    b.symbol(doc, "document").unwrap();
    b.resume_on_regex(doc, r"$").unwrap();

    b.freeze(doc).unwrap()
}

#[test]
fn unexpected_character_yields_one_error_and_keeps_words_parsed_before_it() {
    let grammar = build_grammar();
    let code = Code::new("one two. three");
    let root = Driver::new(&grammar, &code).parse();

    assert_eq!(root.errors.len(), 1);
    assert_eq!(root.errors[0].position, 7);

    let doc = &root.node.children()[0];
    assert_eq!(doc.name, "document");

    let words: Vec<&str> = doc
        .children()
        .iter()
        .filter(|c| c.name == "WORD")
        .map(|c| c.text().unwrap())
        .collect();
    assert_eq!(words, vec!["one", "two"]);

    let marker = doc
        .children()
        .iter()
        .find(|c| c.name == ":error")
        .expect("a recovery marker should remain in the tree");
    assert!(marker.text().unwrap().contains("three"));
}

#[test]
fn well_formed_input_parses_with_no_errors() {
    let grammar = build_grammar();
    let code = Code::new("one two three");
    let root = Driver::new(&grammar, &code).parse();
    assert!(root.errors.is_empty(), "errors: {:?}", root.errors);

    let doc = &root.node.children()[0];
    let words: Vec<&str> = doc
        .children()
        .iter()
        .filter(|c| c.name == "WORD")
        .map(|c| c.text().unwrap())
        .collect();
    assert_eq!(words, vec!["one", "two", "three"]);
}
