//! Per-file pipeline: scan, parse, then check.
//!
//! A pipeline owns everything it touches except the transition table, so
//! any number of them can run at once.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::ast::ParseTree;
use crate::automaton::TransitionTable;
use crate::parser::{self, ParseError};
use crate::reader::{ReadError, SourceReader};
use crate::scanner::{self, LexError, Scanned};
use crate::semantic::{self, SemanticError};
use crate::token::{FileId, Span, Token};

/// Where a file's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Path(PathBuf),
    /// In-memory source, used by tests and tools.
    Text(String),
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    /// Display name used in diagnostics.
    pub name: String,
    pub origin: Origin,
}

impl SourceFile {
    pub fn from_path(id: FileId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.display().to_string(),
            origin: Origin::Path(path),
        }
    }

    pub fn from_text(id: FileId, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            origin: Origin::Text(text.into()),
        }
    }
}

/// Pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Scanning,
    Parsing,
    SemanticCheck,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Scanning => "scanning",
            Self::Parsing => "parsing",
            Self::SemanticCheck => "semantic check",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Misuse of the pipeline API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// The parse tree was requested before the pipeline finished successfully.
    #[error("no parse tree: pipeline is {0}")]
    NotDone(Stage),
    #[error("pipeline already ran and is {0}")]
    AlreadyRan(Stage),
}

/// Why a file produced no parse tree.
#[derive(Debug, thiserror::Error)]
pub enum FileFailure {
    #[error("cannot read file: {0}")]
    Read(#[from] ReadError),
    /// Lexical errors under `--strict`.
    #[error("{} lexical error(s)", .0.len())]
    Lex(Vec<LexError>),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<SemanticError>),
}

impl FileFailure {
    /// The stage the failure belongs to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Read(_) | Self::Lex(_) => Stage::Scanning,
            Self::Parse(_) => Stage::Parsing,
            Self::Semantic(_) => Stage::SemanticCheck,
        }
    }

    /// One `(location, message)` pair per underlying error. Read failures
    /// have no location.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<(Option<Span>, String)> {
        match self {
            Self::Read(e) => vec![(None, e.to_string())],
            Self::Lex(errors) => errors
                .iter()
                .map(|e| (Some(e.span), e.kind.to_string()))
                .collect(),
            Self::Parse(e) => vec![(Some(e.span), e.kind.to_string())],
            Self::Semantic(errors) => errors
                .iter()
                .map(|e| (Some(e.span), e.kind.to_string()))
                .collect(),
        }
    }
}

/// Final result of one pipeline.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: SourceFile,
    /// Scanned tokens. Empty unless the pipeline kept them.
    pub tokens: Vec<Token>,
    /// Lexical errors that did not fail the file.
    pub warnings: Vec<LexError>,
    pub result: Result<ParseTree, FileFailure>,
}

impl FileOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives one file from raw text to a checked [`ParseTree`].
#[derive(Debug)]
pub struct ParsePipeline {
    source: SourceFile,
    strict: bool,
    keep_tokens: bool,
    stage: Stage,
    tokens: Vec<Token>,
    warnings: Vec<LexError>,
    result: Option<Result<ParseTree, FileFailure>>,
}

impl ParsePipeline {
    #[must_use]
    pub const fn new(source: SourceFile) -> Self {
        Self {
            source,
            strict: false,
            keep_tokens: false,
            stage: Stage::Created,
            tokens: Vec::new(),
            warnings: Vec::new(),
            result: None,
        }
    }

    /// Fail the file on lexical errors instead of keeping them as warnings.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Keep the token stream after parsing instead of dropping it once the
    /// tree is built.
    #[must_use]
    pub const fn keep_tokens(mut self, keep: bool) -> Self {
        self.keep_tokens = keep;
        self
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Scanned tokens. Once the pipeline has run they are only present
    /// under [`ParsePipeline::keep_tokens`].
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn warnings(&self) -> &[LexError] {
        &self.warnings
    }

    /// Run every stage to completion. A pipeline runs once.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::AlreadyRan`] on a second call. Failures of the
    /// file itself are recorded, not returned.
    pub fn run(&mut self, table: &TransitionTable) -> Result<(), UsageError> {
        if self.stage != Stage::Created {
            return Err(UsageError::AlreadyRan(self.stage));
        }
        let result = self.execute(table);
        self.result = Some(result);
        Ok(())
    }

    /// The checked tree, available once the pipeline is [`Stage::Done`].
    pub fn parse_tree(&self) -> Result<&ParseTree, UsageError> {
        match &self.result {
            Some(Ok(tree)) => Ok(tree),
            _ => Err(UsageError::NotDone(self.stage)),
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&FileFailure> {
        self.result.as_ref().and_then(|r| r.as_ref().err())
    }

    /// Hand the result onward. Fails if the pipeline never ran.
    pub fn into_outcome(self) -> Result<FileOutcome, UsageError> {
        let Some(result) = self.result else {
            return Err(UsageError::NotDone(self.stage));
        };
        Ok(FileOutcome {
            source: self.source,
            tokens: self.tokens,
            warnings: self.warnings,
            result,
        })
    }

    /// Run if needed, then hand the result onward.
    #[must_use]
    pub fn complete(mut self, table: &TransitionTable) -> FileOutcome {
        let result = match self.result.take() {
            Some(result) => result,
            None => self.execute(table),
        };
        FileOutcome {
            source: self.source,
            tokens: self.tokens,
            warnings: self.warnings,
            result,
        }
    }

    fn execute(&mut self, table: &TransitionTable) -> Result<ParseTree, FileFailure> {
        let result = self.stages(table);
        if !self.keep_tokens {
            self.tokens = Vec::new();
        }
        self.stage = if result.is_ok() {
            Stage::Done
        } else {
            Stage::Failed
        };
        match &result {
            Ok(_) => debug!(file = %self.source.name, "pipeline done"),
            Err(e) => debug!(file = %self.source.name, stage = %e.stage(), error = %e, "pipeline failed"),
        }
        result
    }

    fn stages(&mut self, table: &TransitionTable) -> Result<ParseTree, FileFailure> {
        self.enter(Stage::Scanning);
        let Scanned { tokens, errors } = self.scan(table)?;
        self.tokens = tokens;
        if !errors.is_empty() {
            if self.strict {
                return Err(FileFailure::Lex(errors));
            }
            for e in &errors {
                warn!(file = %self.source.name, error = %e, "lexical error");
            }
            self.warnings = errors;
        }

        self.enter(Stage::Parsing);
        let tree = parser::parse(&self.tokens)?;

        self.enter(Stage::SemanticCheck);
        semantic::check(&tree).map_err(FileFailure::Semantic)?;

        Ok(tree)
    }

    fn scan(&self, table: &TransitionTable) -> Result<Scanned, ReadError> {
        let id = self.source.id;
        match &self.source.origin {
            Origin::Path(path) => scanner::scan(SourceReader::open(path)?, table, id),
            Origin::Text(text) => scanner::scan(SourceReader::from_text(text.as_str()), table, id),
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(file = %self.source.name, from = %self.stage, to = %stage, "stage");
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn pipeline(text: &str) -> ParsePipeline {
        ParsePipeline::new(SourceFile::from_text(FileId(7), "test.ch", text))
    }

    #[test]
    fn successful_run() {
        let mut p = pipeline("int main() { return 0; }").keep_tokens(true);
        assert_eq!(p.stage(), Stage::Created);
        p.run(&TransitionTable::build()).expect("first run");
        assert_eq!(p.stage(), Stage::Done);
        let tree = p.parse_tree().expect("tree");
        assert_eq!(tree.file, FileId(7));
        assert_eq!(tree.functions().count(), 1);
        assert_eq!(p.tokens().last().map(Token::kind), Some(TokenType::EndOfStream));
        assert!(p.failure().is_none());
    }

    #[test]
    fn tree_unavailable_before_run() {
        let p = pipeline("int x;");
        assert_eq!(p.parse_tree().err(), Some(UsageError::NotDone(Stage::Created)));
        assert_eq!(
            p.into_outcome().err(),
            Some(UsageError::NotDone(Stage::Created))
        );
    }

    #[test]
    fn second_run_is_rejected() {
        let table = TransitionTable::build();
        let mut p = pipeline("int x;");
        p.run(&table).expect("first run");
        assert_eq!(p.run(&table), Err(UsageError::AlreadyRan(Stage::Done)));
    }

    #[test]
    fn parse_failure() {
        let mut p = pipeline("int x = ;");
        p.run(&TransitionTable::build()).expect("run");
        assert_eq!(p.stage(), Stage::Failed);
        assert_eq!(p.parse_tree().err(), Some(UsageError::NotDone(Stage::Failed)));
        let failure = p.failure().expect("failure");
        assert_eq!(failure.stage(), Stage::Parsing);
        assert!(matches!(failure, FileFailure::Parse(_)));
    }

    #[test]
    fn semantic_failure_downgrades_tree() {
        let outcome = pipeline("void f() { undefined = 1; break; }").complete(&TransitionTable::build());
        match outcome.result {
            Err(FileFailure::Semantic(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected semantic failure, got {other:?}"),
        }
    }

    #[test]
    fn lexical_errors_are_warnings_by_default() {
        let outcome = pipeline("int x = 1; $\nint y;").complete(&TransitionTable::build());
        assert!(outcome.is_ok());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn lexical_errors_fail_under_strict() {
        let outcome = pipeline("int x = 1; $\nint y;")
            .strict(true)
            .complete(&TransitionTable::build());
        match outcome.result {
            Err(ref failure @ FileFailure::Lex(_)) => {
                assert_eq!(failure.stage(), Stage::Scanning);
                assert_eq!(
                    failure.diagnostics(),
                    [(
                        Some(Span::new(1, 12)),
                        "unexpected character: '$'".to_string()
                    )]
                );
            }
            other => panic!("expected lexical failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_failure() {
        let source = SourceFile::from_path(FileId(0), "/nonexistent/dir/missing.ch");
        let outcome = ParsePipeline::new(source).complete(&TransitionTable::build());
        assert!(matches!(outcome.result, Err(FileFailure::Read(_))));
        assert!(outcome.tokens.is_empty());
    }

    #[test]
    fn tokens_dropped_after_parsing_by_default() {
        let table = TransitionTable::build();
        let mut p = pipeline("int main() { return 0; }");
        p.run(&table).expect("run");
        assert_eq!(p.stage(), Stage::Done);
        assert!(p.tokens().is_empty());

        let outcome = pipeline("int x = ;").complete(&table);
        assert!(!outcome.is_ok());
        assert!(outcome.tokens.is_empty());

        let outcome = pipeline("int x = ;").keep_tokens(true).complete(&table);
        assert_eq!(outcome.tokens.len(), 5);
    }

    #[test]
    fn deep_nesting_fails_the_file() {
        let deep = format!("int a = {}1{};", "(".repeat(100_000), ")".repeat(100_000));
        let outcome = pipeline(&deep).complete(&TransitionTable::build());
        match outcome.result {
            Err(FileFailure::Parse(ref e)) => assert!(matches!(
                e.kind,
                crate::parser::ParseErrorKind::NestingTooDeep { .. }
            )),
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn complete_reuses_finished_result() {
        let table = TransitionTable::build();
        let mut p = pipeline("int x;");
        p.run(&table).expect("run");
        let outcome = p.complete(&table);
        assert!(outcome.is_ok());
        assert_eq!(outcome.source.name, "test.ch");
    }
}
