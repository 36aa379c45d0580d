//! Demonstrate the error each stage reports for invalid Cherry input.

fn report(input: &str) {
    match cherry_rs::parse_str(input) {
        Ok(tree) => println!("Parsed OK: {} item(s)", tree.items.len()),
        Err(cherry_rs::Error::Read(e)) => println!("Read error: {e}"),
        Err(cherry_rs::Error::Lex(e)) => {
            println!("Lex error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
        Err(cherry_rs::Error::Parse(e)) => {
            println!("Parse error: {e}");
            println!("  Kind: {:?}", e.kind);
        }
        Err(cherry_rs::Error::Semantic(errors)) => {
            println!("{} semantic error(s):", errors.len());
            for e in errors {
                println!("  {e}");
            }
        }
    }
}

fn main() {
    // Unterminated string literal
    report("string s = \"unclosed;\n");
    println!();

    // Missing semicolon
    report("int a = 1\nint b = 2;\n");
    println!();

    // Scope problems
    report("void f() {\n    x = 1;\n    break;\n}\n");
    println!();

    report("int twice(int n) { return n * 2; }\n");
}
