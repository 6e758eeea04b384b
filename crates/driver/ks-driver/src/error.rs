//! Errors of a whole compilation

use codespan_reporting::diagnostic::Diagnostic;
use ks_const_eval::EvaluationError;
use ks_index::IndexError;
use ks_parser::ParseError;
use ks_span::FileSpan;
use std::path::PathBuf;
use thiserror::Error;

/// Any error that stops a compilation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The entry file could not be read
    #[error("failed to load `{}`: {message}", path.display())]
    Load {
        /// Path of the file
        path: PathBuf,
        /// Underlying IO error
        message: String,
    },

    /// Lexing or parsing failed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Item collection, macro expansion or name resolution failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A constant could not be evaluated
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl CompileError {
    /// Location of the error; synthetic for load failures
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Load { .. } => FileSpan::synthetic(),
            Self::Parse(err) => err.span(),
            Self::Index(err) => err.span(),
            Self::Evaluation(err) => err.span(),
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic<F: Copy>(&self, file_id: F) -> Diagnostic<F> {
        match self {
            Self::Load { .. } => Diagnostic::error().with_message(self.to_string()),
            Self::Parse(err) => err.to_codespan_diagnostic(file_id),
            Self::Index(err) => err.to_codespan_diagnostic(file_id),
            Self::Evaluation(err) => err.to_codespan_diagnostic(file_id),
        }
    }
}
