//! Position-tracking scanner over markup bytes

use crate::error::Pos;

/// Scanner that keeps line and column in step with the byte offset
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    offset: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn current(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    /// Unread input
    pub fn rest(&self) -> &'a [u8] {
        self.input.get(self.offset..).unwrap_or_default()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Step over one byte; a no-op at the end of input
    pub fn advance(&mut self) {
        let Some(b) = self.current() else {
            return;
        };
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    pub fn advance_by(&mut self, count: usize) {
        (0..count).for_each(|_| self.advance());
    }

    /// Consume `expected` if it is next
    pub fn consume(&mut self, expected: u8) -> bool {
        let matched = self.current() == Some(expected);
        if matched {
            self.advance();
        }
        matched
    }

    /// Consume the longest run of bytes matching `pred`
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.offset;
        while self.current().is_some_and(&pred) {
            self.advance();
        }
        self.input.get(start..self.offset).unwrap_or_default()
    }

    /// Consume everything up to and including `terminator`, returning what
    /// came before it; `None` leaves the cursor at the end of input
    pub fn take_until(&mut self, terminator: &[u8]) -> Option<&'a [u8]> {
        let start = self.offset;
        while !self.is_eof() {
            if self.starts_with(terminator) {
                let taken = self.input.get(start..self.offset);
                self.advance_by(terminator.len());
                return taken;
            }
            self.advance();
        }
        None
    }

    pub fn skip_whitespace(&mut self) {
        self.take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
    }

    pub const fn position(&self) -> Pos {
        Pos::new(self.offset, self.line, self.col)
    }

    pub const fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }
}
