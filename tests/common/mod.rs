#![allow(dead_code)]

use std::path::PathBuf;

use cherry_rs::{ParseTree, Token, TokenType, check, parse, tokenize};
use tempfile::TempDir;

/// Scan `input`, asserting it has no lexical errors.
pub fn tokens(input: &str) -> Vec<Token> {
    let scanned = tokenize(input).expect("tokenize failed");
    assert!(
        scanned.errors.is_empty(),
        "unexpected lexical errors: {:?}\n--- input ---\n{input}",
        scanned.errors
    );
    scanned.tokens
}

/// Token types of `input` without the trailing end-of-stream token.
pub fn kinds(input: &str) -> Vec<TokenType> {
    tokens(input)
        .iter()
        .map(Token::kind)
        .filter(|&k| k != TokenType::EndOfStream)
        .collect()
}

/// Scan, parse, and check `input`, panicking with context on any failure.
pub fn checked_tree(input: &str) -> ParseTree {
    let tokens = tokens(input);
    let tree = parse(&tokens)
        .unwrap_or_else(|e| panic!("parse failed: {e}\n--- input ---\n{input}"));
    if let Err(errors) = check(&tree) {
        let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
        panic!(
            "semantic check failed:\n{}\n--- input ---\n{input}",
            messages.join("\n")
        );
    }
    tree
}

/// Write `(name, contents)` pairs into a fresh temporary directory.
pub fn write_sources(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().expect("create temp dir");
    let paths = files
        .iter()
        .map(|(name, contents)| {
            let path = dir.path().join(name);
            std::fs::write(&path, contents).expect("write source");
            path
        })
        .collect();
    (dir, paths)
}

/// A small program touching every statement form.
pub const SAMPLE: &str = "\
import std.io.console;

const int LIMIT = 3;

class Shape {
    double area() { return 0.0; }
}

class Square extends Shape {
    double side = 1.0;
    double area() { return side * side; }
}

int main(string[] args) {
    Square s = new Square();
    int total = 0;
    for (int i = 0; i < LIMIT; i++) {
        if (i % 2 == 0) { continue; }
        total += i;
    }
    while (total > 0) {
        total--;
        if (total == 1) break;
    }
    do { total = total + 1; } while (total < 2);
    console.print(sqrt(s.area()));
    return total;
}
";
