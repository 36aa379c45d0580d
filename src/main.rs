//! CLI driver: scan, parse, and check Cherry source files concurrently.

use std::process::ExitCode;

use cherry_rs::{
    FileIntake, FileOutcome, Flag, FlagIntake, Orchestrator, RaisedFlags, Session, Span,
};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::from(2);
    }

    let (flag_args, file_args): (Vec<&String>, Vec<&String>) =
        args.iter().partition(|a| a.starts_with('-'));

    let (flags, flag_errors) = FlagIntake::raise(flag_args);
    init_logging(&flags);
    if !flag_errors.is_empty() {
        for e in &flag_errors {
            eprintln!("error: {e}");
        }
        return ExitCode::from(2);
    }

    let intake = FileIntake::accept(file_args);
    for e in &intake.rejected {
        eprintln!("warning: {e}");
    }
    if intake.files.is_empty() {
        eprintln!("error: no input files");
        return ExitCode::from(2);
    }

    let session = Session::new(flags);
    let report = match Orchestrator::new(&session).run(intake.files) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    for outcome in report.outcomes() {
        print_outcome(outcome, session.flags());
    }
    eprintln!(
        "{} file(s) ok, {} failed",
        report.succeeded(),
        report.failed()
    );

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_usage() {
    eprintln!("Usage: cherry [flags] <files...>");
    eprintln!();
    eprintln!("Files must end in .ch, .ry, or .cherry.");
    eprintln!();
    eprintln!("Flags:");
    for flag in Flag::ALL {
        let short = flag.short().map_or_else(String::new, |c| format!("-{c}, "));
        let value = if flag.takes_value() { "=N" } else { "" };
        let name = format!("{short}--{}{value}", flag.long());
        eprintln!("  {name:<20}{}", flag.help());
    }
    eprintln!();
    eprintln!("RUST_LOG overrides the log level set by -v and -q.");
}

/// Send logs to stderr. `RUST_LOG` wins over `--verbose` and `--quiet`.
fn init_logging(flags: &RaisedFlags) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default = if flags.is_raised(Flag::Verbose) {
        "debug"
    } else if flags.is_raised(Flag::Quiet) {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn print_outcome(outcome: &FileOutcome, flags: &RaisedFlags) {
    let name = &outcome.source.name;

    if flags.is_raised(Flag::DumpTokens) {
        println!("== tokens: {name}");
        for token in &outcome.tokens {
            println!(
                "{}:{}\t{}\t{}",
                token.line, token.column, token.kind, token.lexeme
            );
        }
    }

    for warning in &outcome.warnings {
        print_diagnostic(name, Some(warning.span), "warning", &warning.kind.to_string());
        eprintln!("    {}", warning.line_text);
    }

    match &outcome.result {
        Ok(tree) => {
            if flags.is_raised(Flag::DumpTree) {
                println!("== tree: {name}");
                println!("{tree:#?}");
            }
            eprintln!(
                "{name}: ok ({} import(s), {} item(s))",
                tree.imports.len(),
                tree.items.len()
            );
        }
        Err(failure) => {
            for (span, message) in failure.diagnostics() {
                print_diagnostic(name, span, "error", &message);
            }
            eprintln!("{name}: failed during {}", failure.stage());
        }
    }
}

fn print_diagnostic(name: &str, span: Option<Span>, level: &str, message: &str) {
    match span {
        Some(span) => eprintln!("{name}:{}:{}: {level}: {message}", span.line, span.column),
        None => eprintln!("{name}: {level}: {message}"),
    }
}
