//! Automaton-driven scanner.
//!
//! The scanner marks the reader before every read. When a transition ends
//! the current run, it rewinds so the terminating character is read again
//! from [`State::Start`]; otherwise it commits the mark. Operators are
//! scanned by maximal munch: a symbol run only grows while the text so far
//! is still a known operator.

use std::fmt;
use std::io::{Read, Seek};
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::automaton::{InputClass, State, TransitionTable};
use crate::reader::{Position, ReadError, SourceReader, Unit};
use crate::token::{FileId, Span, Token, TokenType};

/// Classifies a lexical error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
    /// String literal cut off by a newline or end of input.
    UnterminatedString,
    /// Character literal cut off by a newline or end of input.
    UnterminatedCharacter,
    /// `/*` without a closing `*/`.
    UnterminatedComment,
    /// Digits that match no numeric literal form.
    MalformedNumber,
    /// Character literal holding zero or several characters.
    MalformedCharacter,
    /// Backslash escape the language does not define.
    InvalidEscape(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character: {ch:?}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedCharacter => write!(f, "unterminated character literal"),
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
            Self::MalformedNumber => write!(f, "malformed number"),
            Self::MalformedCharacter => {
                write!(f, "character literal must hold exactly one character")
            }
            Self::InvalidEscape(ch) => write!(f, "invalid escape sequence: \\{ch}"),
        }
    }
}

/// Recoverable error produced while scanning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    /// The partial lexeme that was discarded.
    pub lexeme: String,
    /// Source text from the start of the lexeme to the end of its line.
    pub line_text: String,
}

/// Anything the scanner can yield instead of a token.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Scanning continues after a lexical error.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// Scanning stops after a read failure.
    #[error(transparent)]
    Io(#[from] ReadError),
}

/// Everything scanned from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scanned {
    /// Tokens in file order, ending with [`TokenType::EndOfStream`].
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Scan a whole file. Lexical errors are collected; a read failure aborts.
pub fn scan<R: Read + Seek>(
    reader: SourceReader<R>,
    table: &TransitionTable,
    file: FileId,
) -> Result<Scanned, ReadError> {
    let mut scanned = Scanned::default();
    for item in Scanner::new(reader, table, file) {
        match item {
            Ok(token) => scanned.tokens.push(token),
            Err(ScanError::Lex(e)) => scanned.errors.push(e),
            Err(ScanError::Io(e)) => return Err(e),
        }
    }
    debug!(
        %file,
        tokens = scanned.tokens.len(),
        errors = scanned.errors.len(),
        "scan finished"
    );
    Ok(scanned)
}

/// Scan an in-memory string with a freshly built table.
pub fn tokenize(input: &str) -> Result<Scanned, ReadError> {
    scan(
        SourceReader::from_text(input),
        &TransitionTable::build(),
        FileId::default(),
    )
}

/// Lazy, single-pass token stream over one reader.
pub struct Scanner<'t, R> {
    reader: SourceReader<R>,
    table: &'t TransitionTable,
    file: FileId,
    done: bool,
}

impl<'t, R: Read + Seek> Scanner<'t, R> {
    pub const fn new(reader: SourceReader<R>, table: &'t TransitionTable, file: FileId) -> Self {
        Self {
            reader,
            table,
            file,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.reader.close();
    }

    /// Run the automaton for one lexeme. `Ok(None)` means a comment was
    /// skipped and nothing is emitted.
    fn scan_lexeme(&mut self) -> Result<Option<Token>, ScanError> {
        let mut state = State::Start;
        let mut lexeme = String::new();
        let mut start = self.reader.position();

        loop {
            self.reader.mark();
            let unit = self.reader.read()?;
            let (ch, class) = match unit {
                Unit::Char(ch) => (Some(ch), InputClass::of(ch)),
                Unit::Eof => (None, InputClass::Eof),
            };
            let mut next = self.table.next(state, class);

            if let Some(ch) = ch {
                if state == State::Symbol && next == State::Symbol && !extends_symbol(&lexeme, ch) {
                    next = State::Start;
                } else if state == State::Literal && class == InputClass::Quote {
                    lexeme.push(ch);
                    self.reader.commit();
                    if closes_literal(&lexeme) {
                        return self.finish_literal(lexeme, start).map(Some);
                    }
                    continue;
                }
            }

            match next {
                State::Start if state == State::Start => {
                    self.reader.commit();
                    start = self.reader.position();
                }
                State::Start => {
                    self.reader.rewind()?;
                    return self.finish_run(state, lexeme, start);
                }
                State::Stop => {
                    self.reader.commit();
                    return Ok(Some(self.token(TokenType::EndOfStream, String::new(), start)));
                }
                State::Error => {
                    self.reader.commit();
                    return Err(self.unexpected(state, ch, lexeme, start)?.into());
                }
                accumulating => {
                    if let Some(ch) = ch {
                        lexeme.push(ch);
                    }
                    self.reader.commit();
                    state = accumulating;
                }
            }
        }
    }

    fn finish_run(
        &mut self,
        state: State,
        lexeme: String,
        start: Position,
    ) -> Result<Option<Token>, ScanError> {
        let kind = match state {
            State::Word => match TokenType::keyword(&lexeme) {
                Some(kind) => kind,
                None if self.next_is('(')? => TokenType::MethodIdentifier,
                None => TokenType::Identifier,
            },
            State::Number => match classify_number(&lexeme) {
                Some(kind) => kind,
                None => return Err(self.error(LexErrorKind::MalformedNumber, lexeme, start)?.into()),
            },
            State::Symbol => match lexeme.as_str() {
                "//" => {
                    self.skip_line_comment()?;
                    return Ok(None);
                }
                "/*" => {
                    self.skip_block_comment(lexeme, start)?;
                    return Ok(None);
                }
                text => TokenType::symbol(text).unwrap_or(TokenType::Undefined),
            },
            _ => TokenType::Undefined,
        };
        Ok(Some(self.token(kind, lexeme, start)))
    }

    fn finish_literal(&mut self, lexeme: String, start: Position) -> Result<Token, ScanError> {
        if let Some(kind) = literal_problem(&lexeme) {
            return Err(self.error(kind, lexeme, start)?.into());
        }
        let kind = if lexeme.starts_with('\'') {
            TokenType::CharacterLiteral
        } else {
            TokenType::StringLiteral
        };
        Ok(self.token(kind, lexeme, start))
    }

    /// One-character lookahead that leaves the cursor where it was.
    fn next_is(&mut self, expected: char) -> Result<bool, ReadError> {
        self.reader.mark();
        let found = self.reader.read()? == Unit::Char(expected);
        self.reader.rewind()?;
        Ok(found)
    }

    fn skip_line_comment(&mut self) -> Result<(), ReadError> {
        loop {
            match self.reader.read()? {
                Unit::Char('\n') | Unit::Eof => return Ok(()),
                Unit::Char(_) => {}
            }
        }
    }

    fn skip_block_comment(&mut self, opener: String, start: Position) -> Result<(), ScanError> {
        let mut previous = None;
        loop {
            match self.reader.read()? {
                Unit::Eof => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedComment,
                        span: span_of(start),
                        line_text: opener.clone(),
                        lexeme: opener,
                    }
                    .into());
                }
                Unit::Char('/') if previous == Some('*') => return Ok(()),
                Unit::Char(ch) => previous = Some(ch),
            }
        }
    }

    fn unexpected(
        &mut self,
        state: State,
        ch: Option<char>,
        lexeme: String,
        start: Position,
    ) -> Result<LexError, ReadError> {
        if state == State::Literal {
            let kind = if lexeme.starts_with('\'') {
                LexErrorKind::UnterminatedCharacter
            } else {
                LexErrorKind::UnterminatedString
            };
            return Ok(LexError {
                kind,
                span: span_of(start),
                line_text: lexeme.clone(),
                lexeme,
            });
        }
        let ch = ch.unwrap_or(char::REPLACEMENT_CHARACTER);
        self.error(LexErrorKind::UnexpectedCharacter(ch), ch.to_string(), start)
    }

    /// Build an error for a lexeme that has been consumed, quoting the rest
    /// of its line.
    fn error(
        &mut self,
        kind: LexErrorKind,
        lexeme: String,
        start: Position,
    ) -> Result<LexError, ReadError> {
        let rest = self.reader.peek_line()?;
        let line_text = format!("{lexeme}{}", rest.trim_end_matches(['\r', '\n']));
        Ok(LexError {
            kind,
            span: span_of(start),
            lexeme,
            line_text,
        })
    }

    const fn token(&self, kind: TokenType, lexeme: String, start: Position) -> Token {
        Token::new(kind, lexeme, self.file, start.line, start.column)
    }
}

impl<R: Read + Seek> Iterator for Scanner<'_, R> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.scan_lexeme() {
                Ok(None) => {}
                Ok(Some(token)) => {
                    trace!(
                        kind = %token.kind,
                        lexeme = %token.lexeme,
                        line = token.line,
                        column = token.column,
                        "token"
                    );
                    if token.kind == TokenType::EndOfStream {
                        self.finish();
                    }
                    return Some(Ok(token));
                }
                Err(ScanError::Io(e)) => {
                    self.finish();
                    return Some(Err(ScanError::Io(e)));
                }
                Err(lex) => {
                    debug!(file = %self.file, error = %lex, "lexical error");
                    return Some(Err(lex));
                }
            }
        }
    }
}

impl<R: Read + Seek> FusedIterator for Scanner<'_, R> {}

const fn span_of(position: Position) -> Span {
    Span::new(position.line, position.column)
}

/// Whether appending `ch` keeps the run a known operator or comment opener.
fn extends_symbol(lexeme: &str, ch: char) -> bool {
    let mut candidate = String::with_capacity(lexeme.len() + ch.len_utf8());
    candidate.push_str(lexeme);
    candidate.push(ch);
    TokenType::symbol(&candidate).is_some() || candidate == "//" || candidate == "/*"
}

/// Whether the last character of `lexeme` is an unescaped copy of its
/// opening quote.
fn closes_literal(lexeme: &str) -> bool {
    let mut chars = lexeme.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        return false;
    };
    open == close && chars.rev().take_while(|&c| c == '\\').count() % 2 == 0
}

/// Check escapes and, for character literals, the length of a closed
/// literal (quotes included).
fn literal_problem(lexeme: &str) -> Option<LexErrorKind> {
    let body = &lexeme[1..lexeme.len() - 1];
    let mut length = 0;
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n' | 't' | 'r' | '0' | '\\' | '\'' | '"') | None => {}
                Some(other) => return Some(LexErrorKind::InvalidEscape(other)),
            }
        }
        length += 1;
    }
    (lexeme.starts_with('\'') && length != 1).then_some(LexErrorKind::MalformedCharacter)
}

fn classify_number(text: &str) -> Option<TokenType> {
    fn digits(text: &str, valid: fn(&char) -> bool) -> bool {
        !text.is_empty() && text.chars().all(|c| valid(&c))
    }

    let radix: [(&str, TokenType, fn(&char) -> bool); 4] = [
        ("0x", TokenType::HexLiteral, char::is_ascii_hexdigit),
        ("0X", TokenType::HexLiteral, char::is_ascii_hexdigit),
        ("0o", TokenType::OctalLiteral, |c| matches!(*c, '0'..='7')),
        ("0b", TokenType::BinaryLiteral, |c| matches!(*c, '0' | '1')),
    ];
    for (prefix, kind, valid) in radix {
        if let Some(rest) = text.strip_prefix(prefix) {
            return digits(rest, valid).then_some(kind);
        }
    }

    let decimal = char::is_ascii_digit as fn(&char) -> bool;
    if digits(text, decimal) {
        return Some(TokenType::IntegerLiteral);
    }

    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (text, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, fraction)) => digits(whole, decimal) && digits(fraction, decimal),
        None => exponent.is_some() && digits(mantissa, decimal),
    };
    let exponent_ok = exponent.is_none_or(|e| digits(e, decimal));
    (mantissa_ok && exponent_ok).then_some(TokenType::RealLiteral)
}
