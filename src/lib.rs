//! Front end for the Cherry language.
//!
//! Raw source text becomes a checked syntax tree in three stages per file:
//! an automaton-driven scanner over a backtracking reader, a
//! recursive-descent parser, and scope and declaration checks. The
//! orchestrator runs one pipeline per file on a bounded worker pool.
//!
//! # Quick start
//!
//! ## Check a single source string
//!
//! ```
//! let tree = cherry_rs::parse_str("int twice(int x) { return x * 2; }").unwrap();
//! assert_eq!(tree.functions().next().unwrap().name, "twice");
//! ```
//!
//! ## Check a batch of files concurrently
//!
//! ```
//! use cherry_rs::{FileId, Orchestrator, Session, SourceFile};
//!
//! let session = Session::default();
//! let files = vec![
//!     SourceFile::from_text(FileId(0), "a.ch", "int a = 1;"),
//!     SourceFile::from_text(FileId(1), "b.ch", "int b = ;"),
//! ];
//! let report = Orchestrator::new(&session).run(files).unwrap();
//! assert_eq!(report.succeeded(), 1);
//! assert_eq!(report.failed(), 1);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod automaton;
pub mod flags;
pub mod intake;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod scanner;
pub mod semantic;
pub mod session;
mod stack;
pub mod token;

pub use ast::{
    Block, ClassDecl, Expr, ExprKind, FunctionDecl, Import, Item, Member, Param, ParseTree, Stmt,
    TypeName, TypeRef, VariableDecl,
};
pub use automaton::{InputClass, State, TransitionTable};
pub use flags::{Flag, FlagIntake, RaisedFlags};
pub use intake::{ConfigError, FileIntake, Intake, check_extension};
pub use orchestrator::{Orchestrator, PoolError, Report};
pub use parser::{MAX_NESTING, ParseError, ParseErrorKind, parse};
pub use pipeline::{FileFailure, FileOutcome, Origin, ParsePipeline, SourceFile, Stage, UsageError};
pub use reader::{ReadError, SourceReader};
pub use scanner::{LexError, LexErrorKind, ScanError, Scanned, Scanner, scan, tokenize};
pub use semantic::{SemanticError, SemanticErrorKind, check};
pub use session::Session;
pub use token::{Category, FileId, Span, Token, TokenType};

/// Unified error type covering every stage of a single source string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Read(#[from] ReadError),
    /// The first lexical error.
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// The first semantic error; all of them are in the vector.
    #[error("{}", .0.first().map(ToString::to_string).unwrap_or_default())]
    Semantic(Vec<SemanticError>),
}

/// Scan, parse, and check a source string in one step. Any lexical error
/// fails the input.
pub fn parse_str(input: &str) -> Result<ParseTree, Error> {
    let scanned = tokenize(input)?;
    if let Some(e) = scanned.errors.into_iter().next() {
        return Err(e.into());
    }
    let tree = parse(&scanned.tokens)?;
    check(&tree).map_err(Error::Semantic)?;
    Ok(tree)
}
