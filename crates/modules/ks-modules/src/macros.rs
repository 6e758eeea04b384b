//! `std::macros`

use ks_macro::{MacroContext, MacroError};
use ks_module::{ContextError, Module};
use ks_syntax::{Keyword, Punct, Token, TokenKind, TokenStream, format_float};

/// Builds the `std::macros` module
///
/// # Errors
///
/// Never fails for a fresh module; the signature matches registration.
pub fn module() -> Result<Module, ContextError> {
    let mut module = Module::with_crate_item("std", ["macros"]);
    module.macro_("stringify", stringify)?;
    module.macro_("concat", concat)?;
    module.macro_("make_const", make_const)?;
    Ok(module)
}

/// String literal of the input tokens
fn stringify(ctx: &MacroContext<'_>, input: &TokenStream) -> Result<TokenStream, MacroError> {
    Ok(TokenStream::from(
        ctx.string(input.to_source(ctx.interner())),
    ))
}

/// Comma-separated literals joined into one string literal
fn concat(ctx: &MacroContext<'_>, input: &TokenStream) -> Result<TokenStream, MacroError> {
    let mut out = String::new();
    let mut tokens = input.iter().peekable();

    while let Some(token) = tokens.next() {
        let negative = token.is_punct(Punct::Minus);
        let token = if negative {
            tokens
                .next()
                .ok_or_else(|| ctx.error(token.span, "expected a number after `-`"))?
        } else {
            token
        };
        if negative {
            out.push('-');
        }

        match &token.kind {
            TokenKind::Str(text) if !negative => out.push_str(text),
            TokenKind::Char(ch) if !negative => out.push(*ch),
            TokenKind::Integer(value) => out.push_str(&value.to_string()),
            TokenKind::Float(value) => out.push_str(&format_float(*value)),
            TokenKind::Keyword(Keyword::True) if !negative => out.push_str("true"),
            TokenKind::Keyword(Keyword::False) if !negative => out.push_str("false"),
            other => {
                return Err(ctx.error(
                    token.span,
                    format!("expected a literal, found {}", other.describe(ctx.interner())),
                ));
            }
        }

        match tokens.next() {
            None => break,
            Some(Token {
                kind: TokenKind::Punct(Punct::Comma),
                ..
            }) => {}
            Some(other) => return Err(ctx.error(other.span, "expected `,` between literals")),
        }
    }

    Ok(TokenStream::from(ctx.string(out)))
}

/// `make_const!(NAME, expr)` becomes the item `pub const NAME = expr;`
fn make_const(ctx: &MacroContext<'_>, input: &TokenStream) -> Result<TokenStream, MacroError> {
    let mut parser = ctx.parser(input);
    let (name, _) = parser.parse_ident()?;
    parser.expect_punct(Punct::Comma)?;
    let value = parser.parse_expr_tokens()?;
    parser.eat_punct(Punct::Comma);
    parser.expect_eof()?;

    let mut out = ctx.quote("pub const")?;
    out.push(ctx.ident(&ctx.resolve(name)));
    out.push(ctx.punct(Punct::Eq));
    out.extend(value);
    out.push(ctx.punct(Punct::Semi));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{expand_expr, expand_items};
    use expect_test::expect;

    #[test]
    fn stringify_renders_tokens() {
        let expanded = expand_expr("macros", "stringify!(a + b::c(1, 2))").unwrap();
        expect![[r#""a + b::c(1, 2)""#]].assert_eq(&expanded);
    }

    #[test]
    fn concat_joins_literals() {
        let expanded = expand_expr("macros", r#"concat!("a", 1, 'c', -2, 1.5, true,)"#).unwrap();
        expect![[r#""a1c-21.5true""#]].assert_eq(&expanded);
    }

    #[test]
    fn concat_rejects_non_literals() {
        let err = expand_expr("macros", "concat!(x)").unwrap_err();
        expect!["expected a literal, found identifier `x`"].assert_eq(&err.to_string());
    }

    #[test]
    fn make_const_produces_an_item() {
        let expanded = expand_items("macros", "make_const!(ANSWER, 6 * 7);").unwrap();
        expect![[r#"
            pub const ANSWER = 6 * 7;
        "#]]
        .assert_eq(&expanded);
    }

    #[test]
    fn make_const_needs_a_name() {
        assert!(expand_items("macros", "make_const!(1, 2);").is_err());
    }
}
