//! End-to-end runs of the `cherry` binary.

mod common;

use std::process::{Command, Output};

use common::{SAMPLE, write_sources};

fn cherry(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cherry"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run cherry")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn no_arguments_prints_usage() {
    let output = cherry(&[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Usage: cherry"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = cherry(&["--frobnicate", "main.ch"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unknown flag '--frobnicate'"));
}

#[test]
fn only_rejected_files_is_a_usage_error() {
    let output = cherry(&["notes.txt"]);
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("'notes.txt' rejected"), "{err}");
    assert!(err.contains("no input files"), "{err}");
}

#[test]
fn valid_files_succeed() {
    let (_dir, paths) = write_sources(&[
        ("main.ch", SAMPLE),
        ("util.ry", "int one() { return 1; }"),
    ]);
    let args: Vec<&str> = paths.iter().filter_map(|p| p.to_str()).collect();
    let output = cherry(&args);
    let err = stderr(&output);
    assert_eq!(output.status.code(), Some(0), "{err}");
    assert!(err.contains("2 file(s) ok, 0 failed"), "{err}");
}

#[test]
fn one_bad_file_fails_the_run() {
    let (_dir, paths) = write_sources(&[
        ("good.ch", "int a = 1;"),
        ("bad.ch", "void f() {\n    x = 1;\n}"),
    ]);
    let bad = paths[1].to_str().expect("utf-8 path");
    let output = cherry(&[paths[0].to_str().expect("utf-8 path"), bad, "--jobs=2"]);
    let err = stderr(&output);
    assert_eq!(output.status.code(), Some(1), "{err}");
    assert!(
        err.contains(&format!("{bad}:2:5: error: use of undeclared name 'x'")),
        "{err}"
    );
    assert!(err.contains("failed during semantic check"), "{err}");
    assert!(err.contains("1 file(s) ok, 1 failed"), "{err}");
}

#[test]
fn dump_tokens_goes_to_stdout() {
    let (_dir, paths) = write_sources(&[("tiny.ch", "int x;")]);
    let output = cherry(&["--dump-tokens", paths[0].to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0));
    let out = String::from_utf8_lossy(&output.stdout);
    assert!(out.contains("1:1\tint\tint"), "{out}");
    assert!(out.contains("1:5\t<identifier>\tx"), "{out}");
}

#[test]
fn strict_turns_warnings_into_failures() {
    let (_dir, paths) = write_sources(&[("odd.ch", "int x; #")]);
    let path = paths[0].to_str().expect("utf-8 path");

    let lenient = cherry(&[path]);
    assert_eq!(lenient.status.code(), Some(0));
    assert!(stderr(&lenient).contains("warning: unexpected character: '#'"));

    let strict = cherry(&["--strict", path]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(stderr(&strict).contains("failed during scanning"));
}
