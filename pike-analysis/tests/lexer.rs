use pike_analysis::{analyze_source, AnalyzeOptions, Lexer, LexerError, Token};

fn texts(source: &str) -> Vec<String> {
    Lexer::from_text(source)
        .tokenize()
        .expect("tokenize")
        .into_iter()
        .map(|token| token.text)
        .collect()
}

fn meaningful(source: &str) -> Vec<String> {
    texts(source)
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .collect()
}

#[test]
fn tokens_concatenate_back_to_source() {
    let source = "int main() {\n  // greet\n  write(\"hi\\n\"); /* done */\n  return 0;\n}\n";
    assert_eq!(texts(source).concat(), source);
}

#[test]
fn lexes_pike_operators_by_longest_match() {
    assert_eq!(
        meaningful("x <<= 1; y ||= z; o->f(); A::b; r[1..2]; f(mixed ... rest);"),
        vec![
            "x", "<<=", "1", ";", "y", "||=", "z", ";", "o", "->", "f", "(", ")", ";", "A", "::",
            "b", ";", "r", "[", "1", "..", "2", "]", ";", "f", "(", "mixed", "...", "rest", ")",
            ";",
        ]
    );
}

#[test]
fn numbers_keep_their_suffixes() {
    assert_eq!(
        meaningful("0x1F 0b101 3.25 1e10 2.5e-3 7"),
        vec!["0x1F", "0b101", "3.25", "1e10", "2.5e-3", "7"]
    );
}

#[test]
fn directives_are_single_tokens() {
    let tokens = meaningful("#include <stdio.h>\n#define TWICE(x) \\\n  ((x) * 2)\nint y;\n");
    assert_eq!(tokens[0], "#include <stdio.h>");
    assert_eq!(tokens[1], "#define TWICE(x) \\\n  ((x) * 2)");
    assert_eq!(&tokens[2..], ["int", "y", ";"]);
}

#[test]
fn multiline_strings_span_lines() {
    let tokens = Lexer::from_text("string s = #\"a\nb\"; s;")
        .tokenize()
        .expect("tokenize");
    let literal = tokens
        .iter()
        .find(|token| token.text.starts_with('#'))
        .expect("literal");
    assert_eq!(literal.text, "#\"a\nb\"");
    let last: &Token = tokens.iter().rev().find(|token| token.text == "s").expect("s");
    assert_eq!(last.line, 2);
    assert_eq!(last.column, Some(4));
}

#[test]
fn reports_columns_per_line() {
    let tokens = Lexer::from_text("int a;\n  string b;")
        .tokenize()
        .expect("tokenize");
    let b = tokens.iter().find(|token| token.text == "b").expect("b");
    assert_eq!(b.line, 2);
    assert_eq!(b.column, Some(9));
}

#[test]
fn unterminated_string_is_a_lexer_error() {
    let err = Lexer::from_text("string s = \"open;\nwrite(s);")
        .tokenize()
        .expect_err("unterminated string");
    let lexer_error = err.downcast_ref::<LexerError>().expect("lexer error");
    assert!(matches!(lexer_error, LexerError::UnterminatedString { .. }));
    assert_eq!(lexer_error.line(), 1);
    assert_eq!(lexer_error.column(), 12);
}

#[test]
fn unterminated_comment_is_a_lexer_error() {
    let err = Lexer::from_text("int x;\n/* never closed")
        .tokenize()
        .expect_err("unterminated comment");
    let lexer_error = err.downcast_ref::<LexerError>().expect("lexer error");
    assert_eq!(
        lexer_error,
        &LexerError::UnterminatedComment { line: 2, column: 1 }
    );
}

#[test]
fn analysis_of_untokenizable_source_is_empty() {
    let report = analyze_source("string s; write(s); \"", "broken.pike", &AnalyzeOptions::default());
    assert!(report.diagnostics.is_empty());
    assert!(matches!(
        report.lexer_error,
        Some(LexerError::UnterminatedString { line: 1, .. })
    ));
}
