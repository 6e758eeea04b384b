//! `std::experiments`

use ks_macro::{MacroContext, MacroError};
use ks_module::{ContextError, Module};
use ks_syntax::{Delimiter, Punct, TokenStream};

/// Builds the `std::experiments` module
///
/// # Errors
///
/// Never fails for a fresh module; the signature matches registration.
pub fn module() -> Result<Module, ContextError> {
    let mut module = Module::with_crate_item("std", ["experiments"]);
    module.macro_("stringy_math", stringy_math)?;
    Ok(module)
}

/// `stringy_math!(add 10 sub 5)` becomes `((0) + 10) - 5`
///
/// Each operation wraps the expression built so far in parentheses and
/// applies the operator to the next argument expression.
fn stringy_math(ctx: &MacroContext<'_>, input: &TokenStream) -> Result<TokenStream, MacroError> {
    let mut parser = ctx.parser(input);
    let mut output = TokenStream::from(ctx.integer(0));

    while !parser.is_eof() {
        let (op, op_span) = parser.parse_ident()?;
        let punct = match ctx.resolve(op).as_str() {
            "add" => Punct::Plus,
            "sub" => Punct::Minus,
            "mul" => Punct::Star,
            "div" => Punct::Slash,
            other => {
                return Err(ctx.error(op_span, format!("unsupported operation `{other}`")));
            }
        };
        let arg = parser.parse_expr_tokens()?;

        let mut next = ctx.group(Delimiter::Paren, output);
        next.push(ctx.punct(punct));
        next.extend(arg);
        output = next;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::expand_expr;
    use expect_test::expect;
    use ks_macro::MacroError;

    #[test]
    fn add_then_sub_nests_left() {
        let expanded = expand_expr("experiments", "stringy_math!(add 10 sub 5)").unwrap();
        expect!["((0) + 10) - 5"].assert_eq(&expanded);
    }

    #[test]
    fn every_operation() {
        let expanded =
            expand_expr("experiments", "stringy_math!(add 10 sub 5 mul 2 div 3)").unwrap();
        expect!["((((0) + 10) - 5) * 2) / 3"].assert_eq(&expanded);
    }

    #[test]
    fn arguments_can_be_expressions() {
        let expanded = expand_expr("experiments", "stringy_math!(add (1 + 2) mul x)").unwrap();
        expect!["((0) + (1 + 2)) * x"].assert_eq(&expanded);
    }

    #[test]
    fn empty_input_is_zero() {
        let expanded = expand_expr("experiments", "stringy_math!()").unwrap();
        expect!["0"].assert_eq(&expanded);
    }

    #[test]
    fn unknown_operation_fails() {
        let err = expand_expr("experiments", "stringy_math!(pow 2)").unwrap_err();
        expect!["unsupported operation `pow`"].assert_eq(&err.to_string());
    }

    #[test]
    fn missing_argument_fails() {
        let err = expand_expr("experiments", "stringy_math!(add)").unwrap_err();
        assert!(matches!(err, MacroError::Failed { .. }));
    }
}
