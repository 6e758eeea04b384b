//! Lexer and parser for Kestrel
//!
//! Source files and macro output share one entry point: everything is lexed
//! into a [`TokenStream`] and handed to [`Parser`].

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use lexer::{lex, lex_at};
pub use parser::{MAX_NESTING, Parser};

use ks_intern::Interner;
use ks_span::{FileId, FileSpan};
use ks_syntax::{Body, ExprId, Item, SourceFile, TokenStream};

/// Parses a whole source file
///
/// # Errors
///
/// Returns the first lexical or syntax error.
pub fn parse_source(
    file: FileId,
    source: &str,
    interner: &Interner,
) -> Result<SourceFile, ParseError> {
    let tokens = lex(file, source, interner)?;
    let items = Parser::new(&tokens.tokens, interner).parse_items()?;
    tracing::trace!(%file, items = items.len(), "parsed source file");
    Ok(SourceFile { file, items })
}

/// Parses a token stream as a sequence of items
///
/// # Errors
///
/// Returns the first syntax error.
pub fn parse_items(
    stream: &TokenStream,
    interner: &Interner,
    end: FileSpan,
) -> Result<Vec<Item>, ParseError> {
    Parser::new(&stream.tokens, interner)
        .with_end_span(end)
        .parse_items()
}

/// Parses a token stream as exactly one expression, allocated into `body`
///
/// # Errors
///
/// Returns the first syntax error, or `TrailingTokens` if input remains.
pub fn parse_expr(
    stream: &TokenStream,
    interner: &Interner,
    end: FileSpan,
    body: &mut Body,
) -> Result<ExprId, ParseError> {
    let mut parser = Parser::new(&stream.tokens, interner).with_end_span(end);
    let id = parser.parse_expr(body)?;
    parser.expect_eof()?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use ks_syntax::{Expr, ItemKind, ModContent, PathSegment, Printer, Stmt, TemplatePart};

    fn parse(source: &str) -> (SourceFile, Interner) {
        let interner = Interner::new();
        let file = parse_source(FileId(0), source, &interner).unwrap();
        (file, interner)
    }

    fn round_trip(source: &str) -> String {
        let (file, interner) = parse(source);
        Printer::new(&interner).items(&file.items)
    }

    #[test]
    fn greetings_program() {
        let actual = round_trip(
            r#"
            const NAMES = ["Stranger", "Jane", "John", "Mio"];
            pub const GREETINGS = {
                let out = [];
                let i = 0;
                while i < 4 {
                    out = out + [`Hello {NAMES[i]}`];
                    i += 1;
                }
                out
            };
            "#,
        );
        expect![[r#"
            const NAMES = ["Stranger", "Jane", "John", "Mio"];
            pub const GREETINGS = {
                let out = [];
                let i = 0;
                while i < 4 {
                    out = out + [`Hello {NAMES[i]}`];
                    i += 1;
                }
                out
            };
        "#]]
        .assert_eq(&actual);
    }

    #[test]
    fn const_fn_with_recursion() {
        let actual = round_trip(
            "const fn fib(n) { if n <= 1 { n } else { fib(n - 1) + fib(n - 2) } }",
        );
        expect![[r#"
            const fn fib(n) {
                if n <= 1 {
                    n
                } else {
                    fib(n - 1) + fib(n - 2)
                }
            }
        "#]]
        .assert_eq(&actual);
    }

    #[test]
    fn modules_and_nested_use_trees() {
        let (file, interner) = parse(
            "mod a { pub mod b { pub fn f() {} } }\nmod ext;\nuse a::b::{self, f as g};",
        );
        let ItemKind::Mod(decl) = &file.items[0].kind else {
            panic!("expected module");
        };
        assert!(matches!(decl.content, ModContent::Inline(ref items) if items.len() == 1));
        assert!(matches!(
            &file.items[1].kind,
            ItemKind::Mod(decl) if decl.content == ModContent::External
        ));

        let ItemKind::Use(entries) = &file.items[2].kind else {
            panic!("expected use");
        };
        let rendered: Vec<_> = entries
            .iter()
            .map(|entry| {
                let binding = entry.binding().map(|sym| interner.resolve(&sym));
                (entry.path.display(&interner), binding)
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("a::b".to_string(), Some("b".to_string())),
                ("a::b::f".to_string(), Some("g".to_string())),
            ]
        );
    }

    #[test]
    fn precedence_follows_rust() {
        let interner = Interner::new();
        let tokens = lex(FileId(0), "1 + 2 * 3 << 1 == 14 || !false && x", &interner).unwrap();
        let mut body = Body::new(FileSpan::synthetic());
        let root = parse_expr(&tokens, &interner, FileSpan::synthetic(), &mut body).unwrap();
        let Expr::Binary { op, .. } = body.expr(root) else {
            panic!("expected binary");
        };
        assert_eq!(*op, ks_syntax::BinaryOp::Or);
    }

    #[test]
    fn macro_calls_in_item_and_expression_position() {
        let (file, interner) = parse(
            "use std::experiments::stringy_math;\nstringify!(a b);\nconst X = stringy_math!(add 10 sub 5);",
        );
        let ItemKind::MacroCall(call) = &file.items[1].kind else {
            panic!("expected item macro");
        };
        assert_eq!(call.input.to_source(&interner), "a b");

        let ItemKind::Const(decl) = &file.items[2].kind else {
            panic!("expected const");
        };
        let Expr::MacroCall(call) = decl.body.expr(decl.body.root) else {
            panic!("expected macro call");
        };
        assert_eq!(call.path.display(&interner), "stringy_math");
        assert_eq!(call.input.len(), 4);
        assert_eq!(decl.body.pending_macro_calls(), vec![decl.body.root]);
    }

    #[test]
    fn template_parts_are_split() {
        let (file, interner) = parse(r#"const T = `a\{ {1 + 2} {"}"} b`;"#);
        let ItemKind::Const(decl) = &file.items[0].kind else {
            panic!("expected const");
        };
        let Expr::Template { parts, .. } = decl.body.expr(decl.body.root) else {
            panic!("expected template");
        };
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], TemplatePart::Text("a{ ".to_string()));
        assert_eq!(parts[4], TemplatePart::Text(" b".to_string()));
        let TemplatePart::Expr(sum) = parts[1] else {
            panic!("expected expression part");
        };
        expect!["1 + 2"].assert_eq(&Printer::new(&interner).expr(&decl.body, sum));
    }

    #[test]
    fn template_expression_spans_point_into_the_file() {
        let (file, _) = parse("const T = `x{y}`;");
        let ItemKind::Const(decl) = &file.items[0].kind else {
            panic!("expected const");
        };
        let Expr::Template { parts, .. } = decl.body.expr(decl.body.root) else {
            panic!("expected template");
        };
        let TemplatePart::Expr(y) = parts[1] else {
            panic!("expected expression part");
        };
        assert_eq!(decl.body.expr(y).span().range(), 13..14);
    }

    #[test]
    fn block_statements_and_tail() {
        let (file, _) = parse("fn f() { let a = 1; if a { 2 } else { 3 } loop { break a; } a }");
        let ItemKind::Fn(decl) = &file.items[0].kind else {
            panic!("expected fn");
        };
        let Expr::Block { stmts, tail, .. } = decl.body.expr(decl.body.root) else {
            panic!("expected block");
        };
        assert_eq!(stmts.len(), 3);
        assert!(matches!(decl.body.stmt(stmts[0]), Stmt::Let { .. }));
        assert!(tail.is_some());
    }

    #[test]
    fn paths_with_keywords() {
        let (file, _) = parse("use super::x as y;\nuse crate::a::b;");
        let ItemKind::Use(entries) = &file.items[0].kind else {
            panic!("expected use");
        };
        assert_eq!(entries[0].path.segments[0], PathSegment::Super);
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let interner = Interner::new();
        let err = parse_source(FileId(0), "const A = 1", &interner).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = parse_source(FileId(0), "fn f() { 1 2 }", &interner).unwrap_err();
        expect!["expected `;` or `}`, found number"].assert_eq(&err.to_string());
    }

    #[test]
    fn trailing_tokens_after_expression() {
        let interner = Interner::new();
        let tokens = lex(FileId(0), "1 2", &interner).unwrap();
        let mut body = Body::new(FileSpan::synthetic());
        let err = parse_expr(&tokens, &interner, FileSpan::synthetic(), &mut body).unwrap_err();
        assert!(matches!(err, ParseError::TrailingTokens { .. }));
    }

    #[test]
    fn assignment_needs_a_place() {
        let interner = Interner::new();
        let err = parse_source(FileId(0), "fn f() { 1 = 2; }", &interner).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let interner = Interner::new();
        let depth = 100_000;
        let sources = [
            format!("const X = {}1{};", "(".repeat(depth), ")".repeat(depth)),
            format!("const X = {}1;", "-".repeat(depth)),
            format!("const X = {}1;", "x = ".repeat(depth)),
            format!("mod m {{ {} }}", "mod m { ".repeat(depth) + &"}".repeat(depth)),
            format!(
                "const fn f(x) {{ {} {{ 0 }} }}",
                "if x { 1 } else ".repeat(depth)
            ),
        ];
        for source in &sources {
            let err = parse_source(FileId(0), source, &interner).unwrap_err();
            assert!(
                matches!(err, ParseError::NestingTooDeep { limit: MAX_NESTING, .. }),
                "{err}"
            );
        }

        let tokens = lex(FileId(0), &"[".repeat(depth), &interner);
        assert!(tokens.is_err());
        let tokens = lex(
            FileId(0),
            &format!("{}1{}", "[".repeat(depth), "]".repeat(depth)),
            &interner,
        )
        .unwrap();
        let mut body = Body::new(FileSpan::synthetic());
        let err = parse_expr(&tokens, &interner, FileSpan::synthetic(), &mut body).unwrap_err();
        expect!["nesting exceeds the limit of 128 levels"].assert_eq(&err.to_string());
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let source = format!("const X = {}1{};", "(".repeat(100), ")".repeat(100));
        let (file, _) = parse(&source);
        assert_eq!(file.items.len(), 1);
    }

    #[test]
    fn attributes_are_rejected() {
        let interner = Interner::new();
        let err = parse_source(FileId(0), "#[test] fn f() {}", &interner).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedAttribute { .. }));
        assert_eq!(err.span().range(), 0..7);
        expect!["attributes are not supported"].assert_eq(&err.to_string());

        let err = parse_source(FileId(0), "#![no_std]", &interner).unwrap_err();
        assert_eq!(err.span().range(), 0..10);

        let err = parse_source(FileId(0), "fn f() { #[inline] let a = 1; }", &interner).unwrap_err();
        assert_eq!(err.span().range(), 9..18);
    }

    #[test]
    fn byte_literals_round_trip() {
        expect![[r#"
            const B = b'a' + b'\x7f';
        "#]]
        .assert_eq(&round_trip(r"const B = b'a' + b'\x7f';"));
    }

    #[test]
    fn parse_expr_tokens_returns_consumed_tokens() {
        let interner = Interner::new();
        let tokens = lex(FileId(0), "add 10 * 2 sub 5", &interner).unwrap();
        let mut parser = Parser::new(&tokens.tokens, &interner);
        parser.parse_ident().unwrap();
        let arg = parser.parse_expr_tokens().unwrap();
        assert_eq!(arg.to_source(&interner), "10 * 2");
        let (next, _) = parser.parse_ident().unwrap();
        assert_eq!(interner.resolve(&next), "sub");
    }
}
