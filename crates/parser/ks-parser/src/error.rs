//! Rich error reporting for the lexer and parser
//!
//! Note: the `label` fields are read by miette's `#[derive(Diagnostic)]`
//! expansion, which the unused-field lints cannot see through.

#![allow(unused_assignments, reason = "miette's derive reads the `label` fields")]

use ks_span::FileSpan;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

// Re-export codespan types for convenience
pub use codespan_reporting;

/// Parse error with rich diagnostic information
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum ParseError {
    /// Input the lexer does not recognise
    #[error("invalid token `{text}`")]
    #[diagnostic(code(parser::invalid_token))]
    InvalidToken {
        /// Offending text
        text: String,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("not a valid token")]
        label: SourceSpan,
    },

    /// Malformed literal (bad escape, integer out of range, ...)
    #[error("invalid {construct}: {message}")]
    #[diagnostic(code(parser::invalid_literal))]
    InvalidLiteral {
        /// Kind of literal
        construct: String,
        /// What went wrong
        message: String,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("{message}")]
        label: SourceSpan,
    },

    /// Syntax error with unexpected input
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(parser::unexpected_token), help("this token is not valid here"))]
    UnexpectedToken {
        /// What the parser wanted
        expected: String,
        /// What was found
        found: String,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("expected {expected}")]
        label: SourceSpan,
    },

    /// Input ended too early
    #[error("expected {expected}, found end of input")]
    #[diagnostic(code(parser::unexpected_eof))]
    UnexpectedEof {
        /// What the parser wanted
        expected: String,
        /// Location of the last token
        at: FileSpan,
        /// Label location
        #[label("input ends here")]
        label: SourceSpan,
    },

    /// Unclosed delimiter
    #[error("this file contains an unclosed delimiter `{opening_char}`")]
    #[diagnostic(code(parser::unclosed_delimiter))]
    UnclosedDelimiter {
        /// The opening character
        opening_char: char,
        /// Opening delimiter location
        at: FileSpan,
        /// Label location
        #[label("unclosed delimiter")]
        label: SourceSpan,
    },

    /// Closing delimiter without a matching opener
    #[error("unexpected closing delimiter `{closing_char}`")]
    #[diagnostic(code(parser::unmatched_delimiter))]
    UnmatchedDelimiter {
        /// The closing character
        closing_char: char,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("unexpected closing delimiter")]
        label: SourceSpan,
    },

    /// Invalid syntax construct
    #[error("invalid {construct}")]
    #[diagnostic(code(parser::invalid_syntax))]
    InvalidSyntax {
        /// Type of construct (e.g., "assignment target", "use path")
        construct: String,
        /// Detailed explanation
        #[help]
        suggestion: Option<String>,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("{construct} is invalid")]
        label: SourceSpan,
    },

    /// Expressions, blocks or modules nested past the parser's limit
    #[error("nesting exceeds the limit of {limit} levels")]
    #[diagnostic(code(parser::nesting_too_deep), help("split the expression into smaller parts"))]
    NestingTooDeep {
        /// Deepest accepted nesting
        limit: usize,
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("nested too deeply")]
        label: SourceSpan,
    },

    /// `#[...]` or `#![...]` attribute
    #[error("attributes are not supported")]
    #[diagnostic(code(parser::unsupported_attribute))]
    UnsupportedAttribute {
        /// Source location
        at: FileSpan,
        /// Label location
        #[label("unsupported attribute")]
        label: SourceSpan,
    },

    /// Source longer than a span can address
    #[error("source of {len} bytes is larger than the 4 GiB limit")]
    #[diagnostic(code(parser::source_too_large))]
    SourceTooLarge {
        /// Source length in bytes
        len: usize,
        /// Last addressable offset
        at: FileSpan,
        /// Label location
        #[label("source too large")]
        label: SourceSpan,
    },

    /// Tokens left over after a complete expression
    #[error("unexpected trailing tokens")]
    #[diagnostic(code(parser::trailing_tokens), help("expected exactly one expression"))]
    TrailingTokens {
        /// First leftover token
        at: FileSpan,
        /// Label location
        #[label("unexpected trailing tokens")]
        label: SourceSpan,
    },
}

impl ParseError {
    pub(crate) fn invalid_token(text: impl Into<String>, at: FileSpan) -> Self {
        Self::InvalidToken {
            text: text.into(),
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn invalid_literal(
        construct: impl Into<String>,
        message: impl Into<String>,
        at: FileSpan,
    ) -> Self {
        Self::InvalidLiteral {
            construct: construct.into(),
            message: message.into(),
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn unexpected(
        expected: impl Into<String>,
        found: impl Into<String>,
        at: FileSpan,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn eof(expected: impl Into<String>, at: FileSpan) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn unclosed(opening_char: char, at: FileSpan) -> Self {
        Self::UnclosedDelimiter {
            opening_char,
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn unmatched(closing_char: char, at: FileSpan) -> Self {
        Self::UnmatchedDelimiter {
            closing_char,
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn invalid_syntax(
        construct: impl Into<String>,
        suggestion: Option<String>,
        at: FileSpan,
    ) -> Self {
        Self::InvalidSyntax {
            construct: construct.into(),
            suggestion,
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn nesting(limit: usize, at: FileSpan) -> Self {
        Self::NestingTooDeep {
            limit,
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn attribute(at: FileSpan) -> Self {
        Self::UnsupportedAttribute {
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn too_large(len: usize, at: FileSpan) -> Self {
        Self::SourceTooLarge {
            len,
            at,
            label: at.range().into(),
        }
    }

    pub(crate) fn trailing(at: FileSpan) -> Self {
        Self::TrailingTokens {
            at,
            label: at.range().into(),
        }
    }

    /// Returns the span where the error occurred
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::InvalidToken { at, .. }
            | Self::InvalidLiteral { at, .. }
            | Self::UnexpectedToken { at, .. }
            | Self::UnexpectedEof { at, .. }
            | Self::UnclosedDelimiter { at, .. }
            | Self::UnmatchedDelimiter { at, .. }
            | Self::InvalidSyntax { at, .. }
            | Self::NestingTooDeep { at, .. }
            | Self::UnsupportedAttribute { at, .. }
            | Self::SourceTooLarge { at, .. }
            | Self::TrailingTokens { at, .. } => *at,
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic<F: Copy>(
        &self,
        file_id: F,
    ) -> codespan_reporting::diagnostic::Diagnostic<F> {
        use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label};

        let range = self.span().range();
        let mut diag = CodespanDiagnostic::error().with_message(self.to_string());
        if let Some(code) = self.code() {
            diag = diag.with_code(code.to_string());
        }

        match self {
            Self::InvalidToken { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("not a valid token"),
            ]),
            Self::InvalidLiteral { message, .. } => {
                diag.with_labels(vec![Label::primary(file_id, range).with_message(message)])
            }
            Self::UnexpectedToken { expected, .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message(format!("expected {expected}")),
            ]),
            Self::UnexpectedEof { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("input ends here"),
            ]),
            Self::UnclosedDelimiter { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("unclosed delimiter"),
            ]),
            Self::UnmatchedDelimiter { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("unexpected closing delimiter"),
            ]),
            Self::InvalidSyntax {
                construct,
                suggestion,
                ..
            } => {
                diag = diag.with_labels(vec![
                    Label::primary(file_id, range).with_message(format!("{construct} is invalid")),
                ]);
                if let Some(suggestion) = suggestion {
                    diag = diag.with_notes(vec![suggestion.clone()]);
                }
                diag
            }
            Self::NestingTooDeep { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("nested too deeply"),
            ]),
            Self::UnsupportedAttribute { .. } => diag.with_labels(vec![
                Label::primary(file_id, range).with_message("unsupported attribute"),
            ]),
            Self::SourceTooLarge { .. } => diag,
            Self::TrailingTokens { .. } => diag
                .with_labels(vec![
                    Label::primary(file_id, range).with_message("unexpected trailing tokens"),
                ])
                .with_notes(vec!["expected exactly one expression".to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_span::{FileId, Span};

    #[test]
    fn codespan_diagnostic_carries_code_and_range() {
        let at = FileSpan::new(FileId(0), Span::new(4, 5));
        let err = ParseError::unexpected("`;`", "`}`", at);
        let diag = err.to_codespan_diagnostic(0usize);

        assert_eq!(diag.message, "expected `;`, found `}`");
        assert_eq!(diag.code.as_deref(), Some("parser::unexpected_token"));
        assert_eq!(diag.labels[0].range, 4..5);
        assert_eq!(err.span(), at);
    }

    #[test]
    fn attribute_diagnostic_has_its_own_code() {
        let at = FileSpan::new(FileId(0), Span::new(0, 7));
        let diag = ParseError::attribute(at).to_codespan_diagnostic(0usize);
        assert_eq!(diag.message, "attributes are not supported");
        assert_eq!(diag.code.as_deref(), Some("parser::unsupported_attribute"));
        assert_eq!(diag.labels[0].range, 0..7);
    }

    #[test]
    fn invalid_syntax_suggestion_becomes_note() {
        let at = FileSpan::new(FileId(0), Span::new(0, 3));
        let err = ParseError::invalid_syntax(
            "assignment target",
            Some("only names can be assigned".to_string()),
            at,
        );
        let diag = err.to_codespan_diagnostic(7usize);
        assert_eq!(diag.notes, vec!["only names can be assigned".to_string()]);
        assert_eq!(diag.labels[0].file_id, 7);
    }
}
