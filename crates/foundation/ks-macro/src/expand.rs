//! Macro expansion engine

use crate::{MacroContext, MacroError};
use ks_intern::Interner;
use ks_syntax::{Body, Expr, ExprId, Item, MacroCall, Path, TokenStream};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Signature of a native macro implementation
pub type MacroHandler =
    dyn Fn(&MacroContext<'_>, &TokenStream) -> Result<TokenStream, MacroError> + Send + Sync;

/// Shared handle to a native macro
pub type NativeMacro = Arc<MacroHandler>;

/// Default nesting limit for expansions that produce further invocations
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Source of macro implementations
///
/// Only the host registers macros; source code cannot define them.
pub trait MacroRegistry {
    /// Looks up a macro by its fully qualified path, e.g. `std::macros::stringify`
    fn lookup_macro(&self, path: &str) -> Option<NativeMacro>;
}

impl<R: MacroRegistry + ?Sized> MacroRegistry for &R {
    fn lookup_macro(&self, path: &str) -> Option<NativeMacro> {
        (**self).lookup_macro(path)
    }
}

/// Invokes native macros and re-parses their output
pub struct MacroExpander<'a> {
    /// Available macros
    registry: &'a dyn MacroRegistry,
    /// String interner
    interner: &'a Interner,
    /// Maximum expansion depth
    max_depth: usize,
    /// Number of successful expansions
    expanded: usize,
}

impl<'a> MacroExpander<'a> {
    /// Creates an expander with the default depth limit
    #[must_use]
    pub fn new(registry: &'a dyn MacroRegistry, interner: &'a Interner) -> Self {
        Self {
            registry,
            interner,
            max_depth: DEFAULT_MAX_DEPTH,
            expanded: 0,
        }
    }

    /// Sets the nesting limit
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of invocations expanded so far
    #[must_use]
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    /// Runs the macro registered at `path` on the invocation's input
    ///
    /// `depth` is the number of expansions that led to this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No macro is registered under `path`
    /// - `depth` reached the limit
    /// - The implementation fails
    pub fn invoke(
        &mut self,
        path: &str,
        call: &MacroCall,
        depth: usize,
    ) -> Result<TokenStream, MacroError> {
        let handler = self
            .registry
            .lookup_macro(path)
            .ok_or_else(|| MacroError::Undefined {
                path: path.to_string(),
                span: call.span,
            })?;

        if depth >= self.max_depth {
            return Err(MacroError::RecursionLimit {
                path: path.to_string(),
                limit: self.max_depth,
                span: call.span,
            });
        }

        let ctx = MacroContext::new(call.span, self.interner);
        let output = handler(&ctx, &call.input)?;
        self.expanded += 1;
        tracing::trace!(
            macro_path = path,
            depth,
            input = call.input.len(),
            output = output.len(),
            "expanded macro"
        );
        Ok(output)
    }

    /// Expands an item-position invocation into items
    ///
    /// # Errors
    ///
    /// Same as [`Self::invoke`], plus `MalformedOutput` if the output is not
    /// a sequence of items.
    pub fn expand_items(
        &mut self,
        path: &str,
        call: &MacroCall,
        depth: usize,
    ) -> Result<Vec<Item>, MacroError> {
        let output = self.invoke(path, call, depth)?;
        ks_parser::parse_items(&output, self.interner, call.span).map_err(|source| {
            MacroError::MalformedOutput {
                path: path.to_string(),
                source,
                span: call.span,
            }
        })
    }

    /// Expands an expression-position invocation into `body`
    ///
    /// Returns the id of the produced expression; the caller decides where it
    /// goes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::invoke`], plus `MalformedOutput` if the output is not
    /// exactly one expression.
    pub fn expand_expr(
        &mut self,
        path: &str,
        call: &MacroCall,
        depth: usize,
        body: &mut Body,
    ) -> Result<ExprId, MacroError> {
        let output = self.invoke(path, call, depth)?;
        ks_parser::parse_expr(&output, self.interner, call.span, body).map_err(|source| {
            MacroError::MalformedOutput {
                path: path.to_string(),
                source,
                span: call.span,
            }
        })
    }

    /// Expands every expression macro in `body`, including invocations that
    /// expansion itself produces
    ///
    /// `resolve` maps the path written at the invocation to the registered
    /// macro path. Each invocation's arena slot is overwritten with the parsed
    /// output.
    ///
    /// # Errors
    ///
    /// Stops at the first failing invocation.
    pub fn expand_body<F>(&mut self, body: &mut Body, mut resolve: F) -> Result<usize, MacroError>
    where
        F: FnMut(&Path, &MacroCall) -> Result<String, MacroError>,
    {
        let mut depths: FxHashMap<ExprId, usize> = FxHashMap::default();
        let mut count = 0;

        loop {
            let pending = body.pending_macro_calls();
            if pending.is_empty() {
                return Ok(count);
            }

            for slot in pending {
                let Expr::MacroCall(call) = body.expr(slot).clone() else {
                    continue;
                };
                let depth = depths.get(&slot).copied().unwrap_or(0);
                let path = resolve(&call.path, &call)?;

                let first_new = body.exprs.len();
                let produced = self.expand_expr(&path, &call, depth, body)?;
                body.splice(produced, slot);
                count += 1;

                let nested: Vec<ExprId> = body
                    .exprs
                    .iter()
                    .skip(first_new)
                    .filter(|(_, expr)| matches!(expr, Expr::MacroCall(_)))
                    .map(|(id, _)| id)
                    .chain(matches!(body.expr(slot), Expr::MacroCall(_)).then_some(slot))
                    .collect();
                for id in nested {
                    depths.insert(id, depth + 1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use ks_span::{FileId, FileSpan};
    use ks_syntax::{ItemKind, LiteralKind, Printer, Punct, TokenKind};
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct Registry {
        macros: FxHashMap<String, NativeMacro>,
    }

    impl Registry {
        fn with(mut self, path: &str, handler: NativeMacro) -> Self {
            self.macros.insert(path.to_string(), handler);
            self
        }
    }

    impl MacroRegistry for Registry {
        fn lookup_macro(&self, path: &str) -> Option<NativeMacro> {
            self.macros.get(path).cloned()
        }
    }

    fn parse_body(source: &str, interner: &Interner) -> Body {
        let tokens = ks_parser::lex(FileId(0), source, interner).unwrap();
        let mut body = Body::new(FileSpan::synthetic());
        body.root =
            ks_parser::parse_expr(&tokens, interner, FileSpan::synthetic(), &mut body).unwrap();
        body
    }

    fn by_name(path: &Path, _: &MacroCall, interner: &Interner) -> Result<String, MacroError> {
        Ok(path.display(interner))
    }

    #[test]
    fn expression_macros_are_spliced_in_place() {
        let interner = Interner::new();
        let registry = Registry::default().with(
            "double",
            Arc::new(|ctx: &MacroContext<'_>, input: &TokenStream| -> Result<TokenStream, MacroError> {
                let mut out = ctx.group(ks_syntax::Delimiter::Paren, input.clone());
                out.push(ctx.punct(Punct::Star));
                out.push(ctx.integer(2));
                Ok(out)
            }),
        );
        let mut body = parse_body("1 + double!(3 + 4)", &interner);

        let mut expander = MacroExpander::new(&registry, &interner);
        let count = expander
            .expand_body(&mut body, |path, call| by_name(path, call, &interner))
            .unwrap();

        assert_eq!(count, 1);
        assert!(body.is_expanded());
        expect!["1 + (3 + 4) * 2"].assert_eq(&Printer::new(&interner).expr(&body, body.root));
    }

    #[test]
    fn macros_producing_macros_are_expanded_until_done() {
        let interner = Interner::new();
        let registry = Registry::default()
            .with(
                "outer",
                Arc::new(|ctx: &MacroContext<'_>, _: &TokenStream| ctx.quote("inner!() + 1")),
            )
            .with(
                "inner",
                Arc::new(|ctx: &MacroContext<'_>, _: &TokenStream| ctx.quote("41")),
            );
        let mut body = parse_body("outer!()", &interner);

        let mut expander = MacroExpander::new(&registry, &interner);
        expander
            .expand_body(&mut body, |path, call| by_name(path, call, &interner))
            .unwrap();

        assert_eq!(expander.expanded(), 2);
        expect!["41 + 1"].assert_eq(&Printer::new(&interner).expr(&body, body.root));
    }

    #[test]
    fn self_reproducing_macro_hits_the_depth_limit() {
        let interner = Interner::new();
        let registry = Registry::default().with(
            "forever",
            Arc::new(|ctx: &MacroContext<'_>, _: &TokenStream| ctx.quote("forever!()")),
        );
        let mut body = parse_body("forever!()", &interner);

        let mut expander = MacroExpander::new(&registry, &interner).with_max_depth(8);
        let err = expander
            .expand_body(&mut body, |path, call| by_name(path, call, &interner))
            .unwrap_err();

        assert!(matches!(err, MacroError::RecursionLimit { limit: 8, .. }));
        assert_eq!(expander.expanded(), 8);
    }

    #[test]
    fn unparsable_output_is_malformed() {
        let interner = Interner::new();
        let registry = Registry::default().with(
            "broken",
            Arc::new(|ctx: &MacroContext<'_>, _: &TokenStream| ctx.quote("1 +")),
        );
        let mut body = parse_body("broken!()", &interner);
        let call_span = body.expr(body.root).span();

        let mut expander = MacroExpander::new(&registry, &interner);
        let err = expander
            .expand_body(&mut body, |path, call| by_name(path, call, &interner))
            .unwrap_err();

        assert!(matches!(err, MacroError::MalformedOutput { ref path, .. } if path == "broken"));
        assert_eq!(err.span(), call_span);
    }

    #[test]
    fn unknown_macro_is_undefined() {
        let interner = Interner::new();
        let registry = Registry::default();
        let mut body = parse_body("missing!(1)", &interner);

        let mut expander = MacroExpander::new(&registry, &interner);
        let err = expander
            .expand_body(&mut body, |path, call| by_name(path, call, &interner))
            .unwrap_err();
        expect!["undefined macro `missing`"].assert_eq(&err.to_string());
    }

    #[test]
    fn item_output_is_parsed_as_items() {
        let interner = Interner::new();
        let registry = Registry::default().with(
            "define",
            Arc::new(|ctx: &MacroContext<'_>, input: &TokenStream| -> Result<TokenStream, MacroError> {
                let mut out = ctx.quote("pub const")?;
                out.extend(input.clone());
                out.extend(ctx.quote("= 1;")?);
                Ok(out)
            }),
        );
        let tokens = ks_parser::lex(FileId(0), "define!(ONE);", &interner).unwrap();
        let items = ks_parser::parse_items(&tokens, &interner, FileSpan::synthetic()).unwrap();
        let ItemKind::MacroCall(call) = &items[0].kind else {
            panic!("expected macro call");
        };

        let mut expander = MacroExpander::new(&registry, &interner);
        let produced = expander.expand_items("define", call, 0).unwrap();

        let ItemKind::Const(decl) = &produced[0].kind else {
            panic!("expected const");
        };
        assert_eq!(interner.resolve(&decl.name), "ONE");
        assert_eq!(
            decl.body.expr(decl.body.root),
            &Expr::Literal {
                kind: LiteralKind::Integer(1),
                span: call.span
            }
        );
        assert!(matches!(
            call.input.tokens[0].kind,
            TokenKind::Ident(_)
        ));
    }
}
