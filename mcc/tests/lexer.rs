use mcc::syntax::lexer::Lexer;
use mcc::syntax::token::TokenKind::{self, *};

fn kinds(code: &str) -> Vec<TokenKind> {
    Lexer::new(code)
        .tokenize()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("int x; class Foo extends Bar"),
        vec![
            KwInt,
            Ident("x".into()),
            Semicolon,
            KwClass,
            Ident("Foo".into()),
            KwExtends,
            Ident("Bar".into()),
        ]
    );
}

#[test]
fn two_char_operators_win_over_single() {
    assert_eq!(
        kinds("a <= b == c && d || e != f"),
        vec![
            Ident("a".into()),
            LAngleEqual,
            Ident("b".into()),
            EqualEqual,
            Ident("c".into()),
            AmpAmp,
            Ident("d".into()),
            PipePipe,
            Ident("e".into()),
            ExclEqual,
            Ident("f".into()),
        ]
    );
}

#[test]
fn number_literals() {
    assert_eq!(kinds("0 42 0x2A"), vec![Number(0), Number(42), Number(42)]);
}

#[test]
fn char_literals_with_escapes() {
    assert_eq!(
        kinds(r"'A' '\n' '\0' '\\'"),
        vec![Char('A'), Char('\n'), Char('\0'), Char('\\')]
    );
}

#[test]
fn string_literal_with_escapes() {
    assert_eq!(
        kinds(r#""Hello\n""#),
        vec![Text("Hello\n".into())]
    );
}

#[test]
fn comments_become_comment_tokens() {
    let kinds = kinds("x // trailing\n/* block\nspanning */ y");
    assert_eq!(
        kinds,
        vec![
            Ident("x".into()),
            Comment("trailing".into()),
            Comment("block\nspanning".into()),
            Ident("y".into()),
        ]
    );
}

#[test]
fn preprocessor_lines_are_skipped() {
    assert_eq!(kinds("#include \"io.h\"\nint x;"), vec![KwInt, Ident("x".into()), Semicolon]);
}

#[test]
fn positions_are_line_and_column() {
    let tokens = Lexer::new("int\n  x;").tokenize();
    assert_eq!((tokens[0].pos.line, tokens[0].pos.col), (1, 1));
    assert_eq!((tokens[1].pos.line, tokens[1].pos.col), (2, 3));
}

#[test]
fn unknown_input_becomes_error_token() {
    assert!(matches!(kinds("$")[0], Error(_)));
}
