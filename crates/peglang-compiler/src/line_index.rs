//! Byte-offset to (line, column) conversion, used when lowering rowan
//! `TextRange` spans into `peglang_core::Location`s.

use peglang_core::Location;

pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn location(&self, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - self.line_starts[line] + 1;
        Location::new(line as u32 + 1, column, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_line_and_column() {
        let index = LineIndex::new("abc\ndef\nghi");
        assert_eq!(index.location(0), Location::new(1, 1, 0));
        assert_eq!(index.location(4), Location::new(2, 1, 4));
        assert_eq!(index.location(9), Location::new(3, 2, 9));
    }
}
