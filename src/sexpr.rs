//! A hand-rolled reader for the S-expression format written by
//! [`Node::as_sxpr`](crate::node::Node::as_sxpr), used to check the
//! round-trip property of spec §8: `parse_sxpr(node.as_sxpr()) == node`.
use crate::node::Node;

pub fn parse_sxpr(input: &str) -> Result<Node, String> {
    let mut reader = Reader {
        chars: input.chars().collect(),
        pos: 0,
    };
    reader.skip_ws();
    let node = reader.read_node()?;
    reader.skip_ws();
    if reader.pos != reader.chars.len() {
        return Err(format!("trailing input at offset {}", reader.pos));
    }
    Ok(node)
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        match self.bump() {
            Some(x) if x == c => Ok(()),
            other => Err(format!("expected {:?}, got {:?} at {}", c, other, self.pos)),
        }
    }

    fn read_name(&mut self) -> String {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != '(' && c != ')' && c != '`') {
            s.push(self.bump().unwrap());
        }
        s
    }

    fn read_quoted(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".into()),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some('0') => out.push('\0'),
                    Some('\n') => {
                        // Line-continuation inserted when wrapping long leaf
                        // text (spec §6.3): the newline and its indentation
                        // carry no content.
                        while matches!(self.peek(), Some(' ')) {
                            self.bump();
                        }
                    }
                    Some('u') => {
                        self.expect('{')?;
                        let mut hex = String::new();
                        while matches!(self.peek(), Some(c) if c != '}') {
                            hex.push(self.bump().unwrap());
                        }
                        self.expect('}')?;
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|e| format!("bad unicode escape: {e}"))?;
                        out.push(char::from_u32(code).ok_or("invalid code point")?);
                    }
                    other => return Err(format!("unknown escape {:?}", other)),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn read_node(&mut self) -> Result<Node, String> {
        self.expect('(')?;
        self.skip_ws();
        let name = self.read_name();
        self.skip_ws();

        let mut node = Node::inner(name, Vec::new());
        while self.peek() == Some('`') {
            self.bump();
            self.expect('(')?;
            self.skip_ws();
            let key = self.read_name();
            self.skip_ws();
            let value = self.read_quoted()?;
            self.skip_ws();
            self.expect(')')?;
            self.skip_ws();
            node.set_attr(key, value);
        }

        if self.peek() == Some('"') {
            let text = self.read_quoted()?;
            node.set_text(text);
            self.skip_ws();
        } else {
            let mut children = Vec::new();
            while self.peek() == Some('(') {
                children.push(self.read_node()?);
                self.skip_ws();
            }
            node.set_content(crate::node::Content::Children(children));
        }
        self.expect(')')?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SxprStyle;

    #[test]
    fn round_trips_leaf_with_attribute() {
        let mut n = Node::leaf("NUMBER", "3.5");
        n.set_attr("unit", "kg");
        let text = n.as_sxpr(&SxprStyle::default());
        let parsed = parse_sxpr(&text).unwrap();
        assert_eq!(parsed, n);
    }

    #[test]
    fn round_trips_nested_tree() {
        let tree = Node::inner(
            "MUL",
            vec![
                Node::leaf("NUMBER", "3"),
                Node::inner(
                    "PLUS",
                    vec![Node::leaf("NUMBER", "4"), Node::leaf("NUMBER", "5")],
                ),
            ],
        );
        let text = tree.as_sxpr(&SxprStyle::default());
        let parsed = parse_sxpr(&text).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn round_trips_escaped_quotes() {
        let n = Node::leaf("STR", "she said \"hi\"\nnext line");
        let text = n.as_sxpr(&SxprStyle::default());
        let parsed = parse_sxpr(&text).unwrap();
        assert_eq!(parsed, n);
    }

    #[test]
    fn round_trips_text_past_the_wrap_column() {
        let style = SxprStyle {
            indent: 2,
            wrap_column: 20,
        };
        let long = "abcdefghij".repeat(5);
        let n = Node::leaf("BLOB", long.clone());
        let text = n.as_sxpr(&style);
        assert!(text.contains('\n'), "expected wrapping to kick in: {text}");
        let parsed = parse_sxpr(&text).unwrap();
        assert_eq!(parsed.text(), Some(long.as_str()));
        assert_eq!(parsed, n);
    }

    #[test]
    fn round_trips_wrapped_text_with_quotes_and_multibyte_chars() {
        let style = SxprStyle {
            indent: 2,
            wrap_column: 10,
        };
        let long = "\"quoted\" caf\u{e9} \u{1f600} ".repeat(4);
        let n = Node::leaf("BLOB", long.clone());
        let text = n.as_sxpr(&style);
        let parsed = parse_sxpr(&text).unwrap();
        assert_eq!(parsed.text(), Some(long.as_str()));
    }
}
