//! Macro expansion error types

use ks_parser::ParseError;
use ks_span::FileSpan;

/// Error type for macro expansion
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MacroError {
    /// No native macro is registered under the resolved path
    #[error("undefined macro `{path}`")]
    Undefined {
        /// Macro path as written or resolved
        path: String,
        /// Invocation site
        span: FileSpan,
    },
    /// The macro implementation reported an error
    #[error("{message}")]
    Failed {
        /// Message from the implementation
        message: String,
        /// Location chosen by the implementation
        span: FileSpan,
    },
    /// The tokens returned by the macro do not parse at the invocation site
    #[error("macro `{path}` produced invalid output: {source}")]
    MalformedOutput {
        /// Macro path
        path: String,
        /// Why the output was rejected
        #[source]
        source: ParseError,
        /// Invocation site
        span: FileSpan,
    },
    /// Nested expansion went deeper than allowed
    #[error("recursion limit of {limit} reached while expanding `{path}`")]
    RecursionLimit {
        /// Macro path
        path: String,
        /// Configured limit
        limit: usize,
        /// Invocation site
        span: FileSpan,
    },
}

impl MacroError {
    /// Returns the span where the error occurred
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Undefined { span, .. }
            | Self::Failed { span, .. }
            | Self::MalformedOutput { span, .. }
            | Self::RecursionLimit { span, .. } => *span,
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic<F: Copy>(
        &self,
        file_id: F,
    ) -> codespan_reporting::diagnostic::Diagnostic<F> {
        use codespan_reporting::diagnostic::{Diagnostic, Label};

        let label = match self {
            Self::Undefined { .. } => "no macro with this name is in scope",
            Self::Failed { .. } => "macro failed here",
            Self::MalformedOutput { .. } => "in this macro invocation",
            Self::RecursionLimit { .. } => "expansion started here",
        };
        let mut diag = Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(vec![
                Label::primary(file_id, self.span().range()).with_message(label),
            ]);
        if let Self::RecursionLimit { .. } = self {
            diag = diag.with_notes(vec![
                "raise `macros.max_depth` in Kestrel.toml if the nesting is intended".to_string(),
            ]);
        }
        diag
    }
}

/// Errors from parsing a macro's own input are reported at the offending token
impl From<ParseError> for MacroError {
    fn from(err: ParseError) -> Self {
        Self::Failed {
            message: err.to_string(),
            span: err.span(),
        }
    }
}
