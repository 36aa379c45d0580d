//! The lexical automaton: states, input classes, and the transition table.
//!
//! The table is a fixed two-dimensional array indexed by `(State,
//! InputClass)`. Construction starts every cell at [`State::Error`] and then
//! fills in the defined transitions, so the function is total by
//! construction.

use std::fmt;

/// Scanner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Start,
    Word,
    Number,
    Literal,
    Symbol,
    Error,
    Stop,
}

impl State {
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::Word,
        Self::Number,
        Self::Literal,
        Self::Symbol,
        Self::Error,
        Self::Stop,
    ];

    /// Whether the scanner appends input while in this state.
    #[must_use]
    pub const fn is_accumulating(self) -> bool {
        matches!(self, Self::Word | Self::Number | Self::Literal | Self::Symbol)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Word => "word",
            Self::Number => "number",
            Self::Literal => "literal",
            Self::Symbol => "symbol",
            Self::Error => "error",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Classification of one input unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClass {
    /// ASCII letters and `_`.
    Letter,
    Digit,
    Dot,
    /// `"` or `'`.
    Quote,
    /// Characters that can begin or continue an operator.
    Symbol,
    /// Blanks other than the line feed.
    Whitespace,
    Newline,
    Eof,
    /// Anything the language has no use for outside literals.
    Other,
}

impl InputClass {
    pub const ALL: [Self; 9] = [
        Self::Letter,
        Self::Digit,
        Self::Dot,
        Self::Quote,
        Self::Symbol,
        Self::Whitespace,
        Self::Newline,
        Self::Eof,
        Self::Other,
    ];

    /// Classify a character. End of input is [`InputClass::Eof`].
    #[must_use]
    pub const fn of(ch: char) -> Self {
        match ch {
            'a'..='z' | 'A'..='Z' | '_' => Self::Letter,
            '0'..='9' => Self::Digit,
            '.' => Self::Dot,
            '"' | '\'' => Self::Quote,
            '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' | '^' | '~' | '('
            | ')' | '{' | '}' | '[' | ']' | ';' | ',' | ':' | '?' => Self::Symbol,
            ' ' | '\t' | '\r' | '\x0C' | '\u{FEFF}' => Self::Whitespace,
            '\n' => Self::Newline,
            _ => Self::Other,
        }
    }
}

const STATES: usize = State::ALL.len();
const CLASSES: usize = InputClass::ALL.len();

/// Total transition function over `(State, InputClass)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    cells: [[State; CLASSES]; STATES],
}

impl TransitionTable {
    /// Build the table. Pairs without an explicit rule go to [`State::Error`].
    #[must_use]
    pub fn build() -> Self {
        use InputClass as C;
        use State as S;

        let mut table = Self {
            cells: [[S::Error; CLASSES]; STATES],
        };

        table.set_row(
            S::Start,
            &[
                (C::Letter, S::Word),
                (C::Digit, S::Number),
                (C::Dot, S::Symbol),
                (C::Quote, S::Literal),
                (C::Symbol, S::Symbol),
                (C::Whitespace, S::Start),
                (C::Newline, S::Start),
                (C::Eof, S::Stop),
            ],
        );
        table.set_row(
            S::Word,
            &[
                (C::Letter, S::Word),
                (C::Digit, S::Word),
                (C::Dot, S::Start),
                (C::Quote, S::Start),
                (C::Symbol, S::Start),
                (C::Whitespace, S::Start),
                (C::Newline, S::Start),
                (C::Eof, S::Start),
                (C::Other, S::Start),
            ],
        );
        table.set_row(
            S::Number,
            &[
                (C::Letter, S::Number),
                (C::Digit, S::Number),
                (C::Dot, S::Number),
                (C::Quote, S::Start),
                (C::Symbol, S::Start),
                (C::Whitespace, S::Start),
                (C::Newline, S::Start),
                (C::Eof, S::Start),
                (C::Other, S::Start),
            ],
        );
        // Newline and end of input inside a literal leave it unterminated.
        table.set_row(
            S::Literal,
            &[
                (C::Letter, S::Literal),
                (C::Digit, S::Literal),
                (C::Dot, S::Literal),
                (C::Quote, S::Start),
                (C::Symbol, S::Literal),
                (C::Whitespace, S::Literal),
                (C::Other, S::Literal),
            ],
        );
        table.set_row(
            S::Symbol,
            &[
                (C::Letter, S::Start),
                (C::Digit, S::Start),
                (C::Dot, S::Symbol),
                (C::Quote, S::Start),
                (C::Symbol, S::Symbol),
                (C::Whitespace, S::Start),
                (C::Newline, S::Start),
                (C::Eof, S::Start),
                (C::Other, S::Start),
            ],
        );
        for class in InputClass::ALL {
            table.set(S::Stop, class, S::Stop);
        }

        table
    }

    #[must_use]
    pub const fn next(&self, state: State, class: InputClass) -> State {
        self.cells[state as usize][class as usize]
    }

    fn set_row(&mut self, from: State, row: &[(InputClass, State)]) {
        for &(class, to) in row {
            self.set(from, class, to);
        }
    }

    const fn set(&mut self, from: State, class: InputClass, to: State) {
        self.cells[from as usize][class as usize] = to;
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::build()
    }
}
