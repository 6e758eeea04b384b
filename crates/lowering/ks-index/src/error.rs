//! Errors raised while indexing

use ks_macro::MacroError;
use ks_parser::ParseError;
use ks_resolve::ResolutionError;
use ks_span::FileSpan;

/// Any error that stops indexing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    /// A loaded module file does not parse
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A macro invocation failed
    #[error(transparent)]
    Macro(#[from] MacroError),
    /// A name could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl IndexError {
    /// Returns the span where the error occurred
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Parse(err) => err.span(),
            Self::Macro(err) => err.span(),
            Self::Resolution(err) => err.span(),
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic<F: Copy>(
        &self,
        file_id: F,
    ) -> codespan_reporting::diagnostic::Diagnostic<F> {
        match self {
            Self::Parse(err) => err.to_codespan_diagnostic(file_id),
            Self::Macro(err) => err.to_codespan_diagnostic(file_id),
            Self::Resolution(err) => err.to_codespan_diagnostic(file_id),
        }
    }
}
