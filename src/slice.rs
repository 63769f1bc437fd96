//! Cheap, shareable views over an immutable input buffer ("String Slice", spec §3.1/§4.1).
use regex::Regex;
use std::rc::Rc;

/// The immutable input buffer a [`Slice`] is cut from.
#[derive(Debug)]
pub struct Code {
    text: Rc<str>,
}

impl Code {
    pub fn new<S: Into<Rc<str>>>(text: S) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// The whole buffer as a slice.
    pub fn whole(&self) -> Slice {
        Slice {
            buf: self.text.clone(),
            start: 0,
            end: self.text.len(),
        }
    }
}

/// A view over [`Code`] carrying absolute offsets into the original buffer.
///
/// Cutting a slice never copies characters; offsets stay absolute so error
/// positions always refer back to the original buffer (spec §3.1).
#[derive(Debug, Clone)]
pub struct Slice {
    buf: Rc<str>,
    start: usize,
    end: usize,
}

impl Slice {
    pub fn start(&self) -> usize {
        self.start
    }
    pub fn end(&self) -> usize {
        self.end
    }
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_str(&self) -> &str {
        &self.buf[self.start..self.end]
    }

    fn normalize(&self, offset: isize) -> usize {
        let len = self.len() as isize;
        let o = if offset < 0 { len + offset } else { offset };
        self.start + o.clamp(0, len) as usize
    }

    /// Cut a new slice out of this one; `start`/`end` are relative to this
    /// slice and may be negative (from-the-end), but the result carries
    /// absolute offsets into the original buffer.
    pub fn cut(&self, start: isize, end: isize) -> Slice {
        let a = self.normalize(start);
        let b = self.normalize(end).max(a);
        Slice {
            buf: self.buf.clone(),
            start: a,
            end: b,
        }
    }

    /// Find a literal needle; offsets are absolute in the original buffer.
    pub fn find(&self, needle: &str, from: usize, last: Option<usize>) -> Option<usize> {
        let hi = last.unwrap_or(self.end).min(self.end);
        let lo = from.max(self.start);
        if lo > hi || needle.is_empty() {
            return None;
        }
        self.buf[lo..hi].find(needle).map(|rel| lo + rel)
    }

    /// Find the next regex match; offsets are absolute in the original buffer.
    pub fn find_regex(&self, re: &Regex, from: usize, last: Option<usize>) -> Option<usize> {
        let hi = last.unwrap_or(self.end).min(self.end);
        let lo = from.max(self.start);
        if lo > hi {
            return None;
        }
        re.find(&self.buf[lo..hi]).map(|m| lo + m.start())
    }

    /// Length of an anchored match starting exactly at `offset`, or `None`.
    pub fn match_regex_at(&self, re: &Regex, offset: usize) -> Option<usize> {
        if offset > self.end {
            return None;
        }
        let m = re.find(&self.buf[offset..self.end])?;
        if m.start() == 0 {
            Some(m.end())
        } else {
            None
        }
    }

    pub fn replace(&self, re: &Regex, replacement: &str) -> String {
        re.replace_all(self.as_str(), replacement).into_owned()
    }
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.buf, &other.buf) && self.start == other.start && self.end == other.end
    }
}
impl Eq for Slice {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_normalizes_negative_offsets() {
        let code = Code::new("hello world");
        let s = code.whole();
        let tail = s.cut(-5, -1);
        assert_eq!(tail.as_str(), "worl");
        assert_eq!(tail.start(), 6);
    }

    #[test]
    fn equality_is_by_buffer_and_offsets() {
        let code = Code::new("abcdef");
        let a = code.whole().cut(1, 3);
        let b = code.whole().cut(1, 3);
        assert_eq!(a, b);
        let other = Code::new("abcdef");
        let c = other.whole().cut(1, 3);
        assert_ne!(a, c, "different buffer identity must not compare equal");
    }

    #[test]
    fn match_regex_at_requires_anchor_at_offset() {
        let code = Code::new("   123");
        let re = Regex::new(r"^[0-9]+").unwrap();
        let s = code.whole();
        assert_eq!(s.match_regex_at(&re, 0), None);
        assert_eq!(s.match_regex_at(&re, 3), Some(3));
    }
}
