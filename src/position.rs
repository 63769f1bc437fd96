//! Line/column resolution for absolute buffer offsets.
use crate::slice::Code;
use once_cell::unsync::OnceCell;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Lazily-computed line-break index over a [`Code`] buffer.
pub struct LineIndex<'c> {
    code: &'c Code,
    line_breaks: OnceCell<Vec<usize>>,
}

impl<'c> LineIndex<'c> {
    pub fn new(code: &'c Code) -> Self {
        Self {
            code,
            line_breaks: OnceCell::new(),
        }
    }

    fn breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.code
                .as_str()
                .bytes()
                .enumerate()
                .filter_map(|(i, b)| if b == b'\n' { Some(i) } else { None })
                .collect()
        })
    }

    pub fn position(&self, offset: usize) -> Position {
        let breaks = self.breaks();
        let index = match breaks.binary_search(&offset) {
            Ok(i) | Err(i) => i,
        };
        if index == 0 {
            Position::new(1, offset + 1)
        } else {
            let line_start = breaks[index - 1] + 1;
            Position::new(index + 1, offset - line_start + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_columns_are_one_based() {
        let code = Code::new("abc");
        let idx = LineIndex::new(&code);
        assert_eq!(idx.position(0), Position::new(1, 1));
        assert_eq!(idx.position(2), Position::new(1, 3));
    }

    #[test]
    fn position_after_newline_resets_column() {
        let code = Code::new("ab\ncd");
        let idx = LineIndex::new(&code);
        assert_eq!(idx.position(3), Position::new(2, 1));
        assert_eq!(idx.position(4), Position::new(2, 2));
    }
}
