//! Batches of files on disk through intake, session, and orchestrator.

mod common;

use cherry_rs::{
    ConfigError, FileFailure, FileId, FileIntake, FlagIntake, MAX_NESTING, Orchestrator,
    ParseErrorKind, Session, SourceFile, Stage,
};

use common::{SAMPLE, write_sources};

fn session(args: &[&str]) -> Session {
    let (flags, errors) = FlagIntake::raise(args);
    assert!(errors.is_empty(), "flag errors: {errors:?}");
    Session::new(flags)
}

#[test]
fn mixed_batch_from_disk() {
    let (dir, paths) = write_sources(&[
        ("good.ch", SAMPLE),
        ("syntax.ry", "int main() { return 0 }"),
        ("scope.cherry", "void f() { g(); }"),
        ("notes.txt", "not source"),
    ]);
    let missing = dir.path().join("missing.ch");

    let mut names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    names.push(missing.display().to_string());
    let intake = FileIntake::accept(&names);

    assert_eq!(intake.rejected.len(), 1);
    assert!(matches!(
        &intake.rejected[0],
        ConfigError::RejectedFile { name, .. } if name.ends_with("notes.txt")
    ));
    let ids: Vec<_> = intake.files.iter().map(|f| f.id).collect();
    assert_eq!(ids, [FileId(0), FileId(1), FileId(2), FileId(3)]);

    let session = session(&["--jobs=4"]);
    let report = Orchestrator::new(&session).run(intake.files).expect("run");
    let stages: Vec<_> = report
        .outcomes()
        .iter()
        .map(|o| o.result.as_ref().err().map(FileFailure::stage))
        .collect();
    assert_eq!(
        stages,
        [
            None,
            Some(Stage::Parsing),
            Some(Stage::SemanticCheck),
            Some(Stage::Scanning),
        ]
    );
    assert!(matches!(
        report.outcomes()[3].result,
        Err(FileFailure::Read(_))
    ));
    assert!(!report.is_success());

    let trees = report.into_trees();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[&FileId(0)].file, FileId(0));
}

#[test]
fn strict_session_fails_lexical_errors() {
    let batch = || {
        vec![
            SourceFile::from_text(FileId(0), "a.ch", "int a = 1; @"),
            SourceFile::from_text(FileId(1), "b.ch", "int b = 2;"),
        ]
    };

    let lenient = session(&[]);
    let report = Orchestrator::new(&lenient).run(batch()).expect("run");
    assert!(report.is_success());
    assert_eq!(report.outcomes()[0].warnings.len(), 1);

    let strict = session(&["--strict", "-j2"]);
    let report = Orchestrator::new(&strict).run(batch()).expect("run");
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcomes()[0].result,
        Err(FileFailure::Lex(ref errors)) if errors.len() == 1
    ));
    assert!(report.outcomes()[1].is_ok());
}

#[test]
fn one_session_serves_many_runs() {
    let session = session(&[]);
    let first: *const _ = session.table();
    for round in 0..3 {
        let files = (0..8)
            .map(|i| {
                let text = format!("int x{round} = {i};");
                SourceFile::from_text(FileId(i), format!("f{i}.ch"), text)
            })
            .collect();
        let report = Orchestrator::new(&session).run(files).expect("run");
        assert_eq!(report.succeeded(), 8);
    }
    assert!(std::ptr::eq(first, session.table()));
}

#[test]
fn dump_tokens_keeps_tokens_through_failures() {
    let (_dir, paths) = write_sources(&[("broken.ch", "int x = ;")]);
    let files = || vec![SourceFile::from_path(FileId(0), &paths[0])];

    let dumping = session(&["--sequential", "--dump-tokens"]);
    let report = Orchestrator::new(&dumping).run(files()).expect("run");
    let outcome = &report.outcomes()[0];
    assert!(!outcome.is_ok());
    // int, x, =, ;, end of stream
    assert_eq!(outcome.tokens.len(), 5);

    let plain = session(&["--sequential"]);
    let report = Orchestrator::new(&plain).run(files()).expect("run");
    assert!(report.outcomes()[0].tokens.is_empty());
}

#[test]
fn deeply_nested_file_fails_alone() {
    let depth = 100_000;
    let deep = format!("int b = {}1{};", "(".repeat(depth), ")".repeat(depth));
    let (_dir, paths) = write_sources(&[("good.ch", "int a = 1;"), ("deep.ch", &deep)]);
    let files: Vec<_> = paths
        .iter()
        .zip(0..)
        .map(|(path, i)| SourceFile::from_path(FileId(i), path))
        .collect();

    let session = session(&["--jobs=2"]);
    let report = Orchestrator::new(&session).run(files).expect("run");
    assert!(report.outcomes()[0].is_ok());
    match &report.outcomes()[1].result {
        Err(FileFailure::Parse(e)) => {
            assert_eq!(e.kind, ParseErrorKind::NestingTooDeep { limit: MAX_NESTING });
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}
