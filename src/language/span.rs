use std::fmt;
use std::rc::Rc;

/// Source position attached to every runtime error. Produced by the lexer and
/// carried through the statement interpreter untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(file: impl Into<Rc<str>>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }

    /// Byte offset of this position within `source`, if the line exists.
    /// Lines and columns are 1-based; a column past the end of its line is
    /// clamped to the line end.
    pub fn offset_in(&self, source: &str) -> Option<usize> {
        if self.line == 0 {
            return None;
        }
        let mut offset = 0;
        for (idx, line) in source.split_inclusive('\n').enumerate() {
            if idx + 1 == self.line {
                let trimmed = line.trim_end_matches(['\n', '\r']);
                let column = self.column.saturating_sub(1).min(trimmed.len());
                return Some(offset + column);
            }
            offset += line.len();
        }
        None
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_tracks_lines_and_columns() {
        let source = "x = 1\ny = x + 2\n";
        assert_eq!(Span::new("main.kiwi", 1, 1).offset_in(source), Some(0));
        assert_eq!(Span::new("main.kiwi", 2, 5).offset_in(source), Some(10));
        assert_eq!(Span::new("main.kiwi", 9, 1).offset_in(source), None);
        assert_eq!(Span::unknown().offset_in(source), None);
    }
}
