//! Byte offset <-> LSP position conversion.
//!
//! The checker works in UTF-8 byte offsets; LSP positions count UTF-16
//! code units within a line.

use lsp_types::{Position, Range};

pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { text, line_starts }
    }

    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let column = self.text[self.line_starts[line]..offset]
            .encode_utf16()
            .count();
        Position::new(line as u32, column as u32)
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range::new(self.position(start), self.position(end))
    }

    /// Byte offset of `position`. Columns past the end of a line clamp to
    /// the line end; lines past the end clamp to the end of the text.
    pub fn offset(&self, position: Position) -> usize {
        let Some(&line_start) = self.line_starts.get(position.line as usize) else {
            return self.text.len();
        };
        let mut units = 0u32;
        for (i, ch) in self.text[line_start..].char_indices() {
            if ch == '\n' || units >= position.character {
                return line_start + i;
            }
            units += ch.len_utf16() as u32;
        }
        self.text.len()
    }
}
