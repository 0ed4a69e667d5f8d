//! Byte-range edits over one source file.
//!
//! Passes never print ASTs; they describe rewrites as insert/replace/delete
//! operations on the original text, which is what keeps comments and
//! whitespace intact. `apply` materializes the new text and panics on
//! overlapping edits — overlap is a bug in a pass, not a recoverable
//! condition.
//!
//! The `*_line` operations are whitespace- and comment-aware: deleting a
//! statement that owns its line takes the trailing line comment and the
//! leading indentation with it, and copying a line re-indents it at the
//! destination.

use crate::syntax::ast::{Ast, NodeId, NodeKind};
use crate::syntax::token::Pos;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

pub struct EditBuffer {
    edits: Vec<Edit>,
    base: u32,
    text: String,
}

impl EditBuffer {
    pub fn new(base: u32, text: String) -> EditBuffer {
        EditBuffer {
            edits: Vec::new(),
            base,
            text,
        }
    }

    pub fn num_edits(&self) -> usize {
        self.edits.len()
    }

    /// File-local byte offset of a position.
    fn tx(&self, pos: Pos) -> usize {
        debug_assert!(pos.0 >= self.base);
        (pos.0 - self.base) as usize
    }

    fn pos(&self, off: usize) -> Pos {
        Pos(self.base + off as u32)
    }

    /// Node end position, adjusted for the two statement kinds whose
    /// syntactic extent needs the source text to pin down: a labeled empty
    /// statement ends just after its colon, and an empty statement covers
    /// its semicolon only when one was actually written.
    pub fn end_of(&self, ast: &Ast, x: NodeId) -> Pos {
        match ast.kind(x) {
            NodeKind::Labeled { colon, stmt, .. } => {
                if matches!(ast.kind(*stmt), NodeKind::Empty { .. }) {
                    colon.offset(1)
                } else {
                    self.end_of(ast, *stmt)
                }
            }
            NodeKind::Empty { semicolon, .. } => {
                let i = self.tx(*semicolon);
                if self.text[i..].starts_with(';') {
                    semicolon.offset(1)
                } else {
                    *semicolon
                }
            }
            _ => ast.end(x),
        }
    }

    /// Rewind `start` past any immediately preceding line comments. The
    /// result, if changed, is always the start of a non-blank line.
    pub fn before_comments(&self, start: Pos) -> Pos {
        let bytes = self.text.as_bytes();
        let mut i = self.tx(start);
        // Back up over the current line's indentation.
        while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
            i -= 1;
        }
        if i > 0 && bytes[i - 1] != b'\n' {
            return start;
        }

        // Go backward by lines.
        let mut last_non_blank = i;
        while i > 0 {
            let mut j = i - 1;
            while j > 0 && bytes[j - 1] != b'\n' {
                j -= 1;
            }
            let trim = self.text[j..i].trim();
            if !trim.is_empty() && !trim.starts_with("//") {
                break;
            }
            if !trim.is_empty() {
                last_non_blank = j;
            }
            i = j;
        }
        self.pos(last_non_blank)
    }

    pub fn text_at(&self, start: Pos, end: Pos) -> &str {
        &self.text[self.tx(start)..self.tx(end)]
    }

    pub fn insert(&mut self, pos: Pos, text: impl Into<String>) {
        let p = self.tx(pos);
        self.edits.push(Edit {
            start: p,
            end: p,
            text: text.into(),
        });
    }

    pub fn replace(&mut self, start: Pos, end: Pos, text: impl Into<String>) {
        self.edits.push(Edit {
            start: self.tx(start),
            end: self.tx(end),
            text: text.into(),
        });
    }

    pub fn delete(&mut self, start: Pos, end: Pos) {
        self.edits.push(Edit {
            start: self.tx(start),
            end: self.tx(end),
            text: String::new(),
        });
    }

    /// Extend `[start, end)` through trailing spaces and a trailing line
    /// comment; when that consumes the whole line, also take the newline
    /// and the leading indentation.
    fn line_extent(&self, startp: Pos, endp: Pos) -> (usize, usize) {
        let bytes = self.text.as_bytes();
        let mut start = self.tx(startp);
        let mut end = self.tx(endp);
        let mut i = end;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r') {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'/' {
            if let Some(j) = self.text[i..].find('\n') {
                i += j;
            }
        }
        if i == bytes.len() || bytes[i] == b'\n' {
            end = (i + 1).min(bytes.len());
            let mut j = start;
            while j > 0 && matches!(bytes[j - 1], b' ' | b'\t') {
                j -= 1;
            }
            if j == 0 || bytes[j - 1] == b'\n' {
                start = j;
            }
        }
        (start, end)
    }

    /// Delete `[start, end)` along with the rest of its line when nothing
    /// else lives there.
    pub fn delete_line(&mut self, startp: Pos, endp: Pos) {
        let (start, end) = self.line_extent(startp, endp);
        self.edits.push(Edit {
            start,
            end,
            text: String::new(),
        });
    }

    /// Copy the line holding `[start, end)` (with its trailing comment) to
    /// just before `insertp`, re-indented to the destination.
    pub fn copy_line(&mut self, startp: Pos, endp: Pos, insertp: Pos) {
        let bytes = self.text.as_bytes();
        let start = self.tx(startp);
        let mut end = self.tx(endp);
        let mut i = end;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r') {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'/' {
            if let Some(j) = self.text[i..].find('\n') {
                i += j;
            }
        }
        if i == bytes.len() || bytes[i] == b'\n' {
            end = (i + 1).min(bytes.len());
        }
        let mut text = self.text[start..end].to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }

        let mut insert = self.tx(insertp);
        let mut j = insert;
        while j > 0 && matches!(bytes[j - 1], b' ' | b'\t') {
            j -= 1;
        }
        if j == 0 || bytes[j - 1] == b'\n' {
            text = format!("{}{}", &self.text[j..insert], text);
            insert = j;
        }
        self.edits.push(Edit {
            start: insert,
            end: insert,
            text,
        });
    }

    /// Apply all edits left to right. Panics on overlap.
    pub fn apply(&mut self) -> String {
        self.edits.sort();
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for e in &self.edits {
            if e.start < last {
                panic!(
                    "overlapping edits: [{}, {}) {:?} begins before {}",
                    e.start, e.end, e.text, last
                );
            }
            out.push_str(&self.text[last..e.start]);
            out.push_str(&e.text);
            last = e.end;
        }
        out.push_str(&self.text[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> EditBuffer {
        EditBuffer::new(0, text.to_string())
    }

    #[test]
    fn insert_replace_delete() {
        let mut b = buf("abcdef");
        b.insert(Pos(2), "XY");
        b.replace(Pos(3), Pos(5), "Z");
        b.delete(Pos(5), Pos(6));
        assert_eq!(b.apply(), "abXYcZ");
    }

    #[test]
    fn edits_sort_by_position() {
        let mut b = buf("hello world");
        b.replace(Pos(6), Pos(11), "there");
        b.replace(Pos(0), Pos(5), "well");
        assert_eq!(b.apply(), "well there");
    }

    #[test]
    #[should_panic(expected = "overlapping edits")]
    fn overlap_panics() {
        let mut b = buf("abcdef");
        b.delete(Pos(1), Pos(4));
        b.delete(Pos(3), Pos(5));
        b.apply();
    }

    #[test]
    fn delete_line_takes_comment_and_indent() {
        let src = "a\n\tvar x int // moved\nb\n";
        let mut b = buf(src);
        // "var x int" spans bytes 3..12.
        assert_eq!(&src[3..12], "var x int");
        b.delete_line(Pos(3), Pos(12));
        assert_eq!(b.apply(), "a\nb\n");
    }

    #[test]
    fn delete_line_keeps_shared_line() {
        let src = "a; b\n";
        let mut b = buf(src);
        // Deleting only "a" must not take the line.
        b.delete_line(Pos(0), Pos(1));
        assert_eq!(b.apply(), "; b\n");
    }

    #[test]
    fn copy_line_reindents_at_destination() {
        let src = "\tvar x int\n\t\tx = 1\n";
        let mut b = buf(src);
        // Copy "var x int" (bytes 1..10) before "x = 1" (byte 13).
        assert_eq!(&src[1..10], "var x int");
        assert_eq!(&src[13..18], "x = 1");
        b.copy_line(Pos(1), Pos(10), Pos(13));
        assert_eq!(b.apply(), "\tvar x int\n\t\tvar x int\n\t\tx = 1\n");
    }

    #[test]
    fn before_comments_rewinds_comment_block() {
        let src = "x = 1\n\n// one\n// two\n\ty()\n";
        let b = buf(src);
        let y_start = src.find("y()").unwrap();
        let p = b.before_comments(Pos(y_start as u32));
        assert_eq!(p, Pos(src.find("// one").unwrap() as u32));
    }

    #[test]
    fn before_comments_stops_at_code() {
        let src = "x = 1\ny()\n";
        let b = buf(src);
        let y_start = src.find("y()").unwrap();
        assert_eq!(b.before_comments(Pos(y_start as u32)), Pos(y_start as u32));
    }
}
