//! Scan a Cherry source file and print its tokens.
//!
//! Usage: `cargo run --example scan_file -- path/to/file.ch`

use cherry_rs::{FileId, SourceReader, TransitionTable, scan};

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: scan_file <file.ch>");
        std::process::exit(2);
    };

    let reader = match SourceReader::open(&path) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    let scanned = match scan(reader, &TransitionTable::build(), FileId(0)) {
        Ok(scanned) => scanned,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    for token in &scanned.tokens {
        println!(
            "{:>4}:{:<3} {:<20} {}",
            token.line, token.column, token.kind, token.lexeme
        );
    }
    for e in &scanned.errors {
        eprintln!("{path}: {e}");
        eprintln!("    {}", e.line_text);
    }
}
