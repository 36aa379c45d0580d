//! Seekable, backtracking character reader over one source file.
//!
//! The reader decodes UTF-8 one character at a time and keeps the current
//! line and column alongside the byte offset, so a saved [`Position`] can be
//! restored exactly. Saved positions live on a stack: [`SourceReader::mark`]
//! pushes, [`SourceReader::rewind`] pops and repositions, and
//! [`SourceReader::commit`] pops without moving.

use std::fs::File;
use std::io::{self, BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace};

/// Error produced by the reader. Never folded into end-of-file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 { offset: u64 },
    #[error("reader is closed")]
    Closed,
    #[error("cannot move {delta} bytes from byte offset {from}")]
    SeekOutOfBounds { from: u64, delta: i64 },
}

/// One unit of input: a decoded character or the end-of-file marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Char(char),
    Eof,
}

/// A cursor position. `line` and `column` are 1-based; columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: u64,
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// The beginning of a file.
    pub const ORIGIN: Self = Self {
        offset: 0,
        line: 1,
        column: 1,
    };
}

/// Reader with mark/rewind support over any seekable byte source.
#[derive(Debug)]
pub struct SourceReader<R> {
    inner: Option<BufReader<R>>,
    position: Position,
    cursor_stack: Vec<Position>,
    at_eof: bool,
}

impl SourceReader<File> {
    /// Open a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        Ok(Self::new(File::open(path)?))
    }
}

impl SourceReader<Cursor<Vec<u8>>> {
    /// Read from an in-memory string.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.into().into_bytes()))
    }
}

impl<R: Read + Seek> SourceReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Some(BufReader::new(inner)),
            position: Position::ORIGIN,
            cursor_stack: Vec::new(),
            at_eof: false,
        }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Whether a read has hit the end of the input since the last reposition.
    #[must_use]
    pub const fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Number of saved positions on the cursor stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor_stack.len()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Advance by one character.
    pub fn read(&mut self) -> Result<Unit, ReadError> {
        let offset = self.position.offset;
        let inner = self.inner.as_mut().ok_or(ReadError::Closed)?;
        match decode_char(inner, offset)? {
            Some((ch, width)) => {
                self.advance(ch, width);
                Ok(Unit::Char(ch))
            }
            None => {
                self.at_eof = true;
                Ok(Unit::Eof)
            }
        }
    }

    /// Return the rest of the current line, terminator included, without
    /// moving the cursor.
    pub fn peek_line(&mut self) -> Result<String, ReadError> {
        let was_at_eof = self.at_eof;
        self.mark();
        let mut line = String::new();
        let result = loop {
            match self.read() {
                Ok(Unit::Char(ch)) => {
                    line.push(ch);
                    if ch == '\n' {
                        break Ok(());
                    }
                }
                Ok(Unit::Eof) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.rewind()?;
        self.at_eof = was_at_eof;
        result.map(|()| line)
    }

    /// Advance by `n` characters without keeping them. The position before
    /// the skip is pushed, so [`rewind`](Self::rewind) undoes it.
    pub fn skip(&mut self, n: usize) -> Result<usize, ReadError> {
        self.mark();
        let mut skipped = 0;
        while skipped < n {
            match self.read()? {
                Unit::Char(_) => skipped += 1,
                Unit::Eof => break,
            }
        }
        Ok(skipped)
    }

    /// Move the cursor by `n` bytes.
    ///
    /// Line and column have to be recomputed, so a backward seek restarts
    /// from the origin and a forward seek reads through. This is slow for
    /// large `n`; the scanner only uses [`mark`](Self::mark) and
    /// [`rewind`](Self::rewind).
    ///
    /// On failure the cursor is left where it was.
    pub fn seek(&mut self, n: i64) -> Result<(), ReadError> {
        let start = self.position;
        let was_at_eof = self.at_eof;
        let from = start.offset;
        let Some(target) = from.checked_add_signed(n) else {
            return Err(ReadError::SeekOutOfBounds { from, delta: n });
        };

        let failure = match self.seek_to(target, n < 0) {
            Ok(true) => return Ok(()),
            Ok(false) => ReadError::SeekOutOfBounds { from, delta: n },
            Err(e) => e,
        };
        self.reposition(start)?;
        self.at_eof = was_at_eof;
        Err(failure)
    }

    /// Read through to byte `target`. `Ok(false)` means input ended first or
    /// `target` falls inside a multi-byte character.
    fn seek_to(&mut self, target: u64, backward: bool) -> Result<bool, ReadError> {
        if backward {
            self.reposition(Position::ORIGIN)?;
        }
        while self.position.offset < target {
            if self.read()? == Unit::Eof {
                return Ok(false);
            }
        }
        Ok(self.position.offset == target)
    }

    /// Save the current position.
    pub fn mark(&mut self) {
        self.cursor_stack.push(self.position);
    }

    /// Drop the most recent mark without moving. Returns `false` when there
    /// was nothing to drop.
    pub fn commit(&mut self) -> bool {
        self.cursor_stack.pop().is_some()
    }

    /// Return to the most recent mark. An empty stack is a no-op and
    /// returns `false`.
    pub fn rewind(&mut self) -> Result<bool, ReadError> {
        let Some(saved) = self.cursor_stack.pop() else {
            debug!(offset = self.position.offset, "rewind with empty cursor stack");
            return Ok(false);
        };
        self.reposition(saved)?;
        Ok(true)
    }

    /// Release the underlying handle. Later reads fail with [`ReadError::Closed`].
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            trace!(offset = self.position.offset, "reader closed");
        }
        self.cursor_stack.clear();
    }

    fn reposition(&mut self, target: Position) -> Result<(), ReadError> {
        let from = self.position.offset;
        let inner = self.inner.as_mut().ok_or(ReadError::Closed)?;
        match (i64::try_from(target.offset), i64::try_from(from)) {
            (Ok(to), Ok(current)) => inner.seek_relative(to - current)?,
            _ => {
                inner.seek(SeekFrom::Start(target.offset))?;
            }
        }
        self.position = target;
        self.at_eof = false;
        Ok(())
    }

    const fn advance(&mut self, ch: char, width: usize) {
        self.position.offset += width as u64;
        if ch == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
    }
}

/// Decode the next UTF-8 character. `Ok(None)` means end of input.
fn decode_char<R: Read>(inner: &mut R, offset: u64) -> Result<Option<(char, usize)>, ReadError> {
    let mut buf = [0u8; 4];
    if read_byte(inner, &mut buf[0])? == 0 {
        return Ok(None);
    }
    let width = utf8_width(buf[0]).ok_or(ReadError::InvalidUtf8 { offset })?;
    if width > 1 {
        inner.read_exact(&mut buf[1..width]).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                ReadError::InvalidUtf8 { offset }
            } else {
                ReadError::Io(e)
            }
        })?;
    }
    std::str::from_utf8(&buf[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .map(|ch| Some((ch, width)))
        .ok_or(ReadError::InvalidUtf8 { offset })
}

fn read_byte<R: Read>(inner: &mut R, byte: &mut u8) -> io::Result<usize> {
    loop {
        match inner.read(std::slice::from_mut(byte)) {
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

const fn utf8_width(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}
