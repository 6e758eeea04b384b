//! Native modules shipped with Kestrel
//!
//! - `std::experiments`: `stringy_math!`
//! - `std::macros`: `stringify!`, `concat!`, `make_const!`
//! - `std::io`: `println`, `print`, `dbg`

mod experiments;
mod io;
mod macros;

pub use experiments::module as experiments;
pub use io::module as io;
pub use macros::module as macros;

use ks_module::{Context, ContextError};

/// Context with every standard module installed
///
/// # Errors
///
/// Only if a host module installed earlier conflicts, which cannot happen
/// for a fresh context.
pub fn default_context() -> Result<Context, ContextError> {
    let mut context = Context::new();
    install_std(&mut context)?;
    Ok(context)
}

/// Installs the standard modules into an existing context
///
/// # Errors
///
/// `ContextError::ConflictingItem` if the host already registered a
/// conflicting `std` item.
pub fn install_std(context: &mut Context) -> Result<(), ContextError> {
    context.install(experiments()?)?;
    context.install(macros()?)?;
    context.install(io()?)?;
    tracing::debug!("installed std modules");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use ks_intern::Interner;
    use ks_macro::{MacroError, MacroExpander};
    use ks_span::{FileId, FileSpan};
    use ks_syntax::{Body, Item, Printer};

    /// Expands `source` as an expression, resolving `name!` to `std::<module>::name`
    pub fn expand_expr(module: &str, source: &str) -> Result<String, MacroError> {
        let interner = Interner::new();
        let context = crate::default_context().unwrap();
        let tokens = ks_parser::lex(FileId(0), source, &interner).unwrap();
        let mut body = Body::new(FileSpan::synthetic());
        body.root =
            ks_parser::parse_expr(&tokens, &interner, FileSpan::synthetic(), &mut body).unwrap();

        let mut expander = MacroExpander::new(&context, &interner);
        expander.expand_body(&mut body, |path, _| {
            Ok(format!("std::{module}::{}", path.display(&interner)))
        })?;
        Ok(Printer::new(&interner).expr(&body, body.root))
    }

    /// Expands the single item macro in `source` and prints the produced items
    pub fn expand_items(module: &str, source: &str) -> Result<String, MacroError> {
        let interner = Interner::new();
        let context = crate::default_context().unwrap();
        let tokens = ks_parser::lex(FileId(0), source, &interner).unwrap();
        let items = ks_parser::parse_items(&tokens, &interner, FileSpan::synthetic()).unwrap();
        let Some(Item {
            kind: ks_syntax::ItemKind::MacroCall(call),
            ..
        }) = items.first()
        else {
            panic!("expected an item macro");
        };

        let path = format!("std::{module}::{}", call.path.display(&interner));
        let produced = MacroExpander::new(&context, &interner).expand_items(&path, call, 0)?;
        Ok(Printer::new(&interner).items(&produced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_macro::MacroRegistry;

    #[test]
    fn default_context_registers_std() {
        let context = default_context().unwrap();
        assert!(
            context
                .lookup_macro("std::experiments::stringy_math")
                .is_some()
        );
        assert!(context.lookup_macro("std::macros::stringify").is_some());
        assert!(context.function("std::io::println").is_some());
        assert!(context.lookup_macro("std::io::println").is_none());
    }

    #[test]
    fn std_cannot_be_installed_twice() {
        let mut context = default_context().unwrap();
        assert!(install_std(&mut context).is_err());
    }
}
