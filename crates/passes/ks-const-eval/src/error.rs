//! Const evaluation errors

use ks_resolve::ResolutionError;
use ks_span::FileSpan;
use thiserror::Error;

/// Errors that can occur during const evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Native functions only run in the virtual machine
    #[error("cannot call native function `{name}` in a constant context")]
    NativeCall {
        /// Path of the native function
        name: String,
        /// Location of the call
        span: FileSpan,
    },

    /// Call to a function not declared `const fn`
    #[error("cannot call non-const function `{name}` in a constant context")]
    NotConst {
        /// Path of the function
        name: String,
        /// Location of the call
        span: FileSpan,
    },

    /// Unsupported operation in const context
    #[error("unsupported operation in const context: {operation}")]
    Unsupported {
        /// Description of the unsupported operation
        operation: String,
        /// Location of the operation
        span: FileSpan,
    },

    /// Evaluation took too many steps
    #[error("constant evaluation exceeded {limit} steps")]
    BudgetExceeded {
        /// Configured step budget
        limit: u64,
        /// Expression being evaluated when the budget ran out
        span: FileSpan,
    },

    /// Const function calls nested too deeply
    #[error("constant evaluation exceeded a call depth of {limit}")]
    CallDepthExceeded {
        /// Configured depth limit
        limit: usize,
        /// Location of the call
        span: FileSpan,
    },

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero {
        /// Location of the division operation
        span: FileSpan,
    },

    /// Integer overflow
    #[error("integer overflow in const evaluation")]
    Overflow {
        /// Location of the overflow
        span: FileSpan,
    },

    /// Type mismatch in const operation
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type description
        expected: String,
        /// Got type description
        got: String,
        /// Location of the mismatch
        span: FileSpan,
    },

    /// Invalid binary operation on const values
    #[error("invalid binary operation: {left_type} {op} {right_type}")]
    InvalidBinaryOp {
        /// Left operand type
        left_type: String,
        /// Operator
        op: String,
        /// Right operand type
        right_type: String,
        /// Location of the operation
        span: FileSpan,
    },

    /// Invalid unary operation on const value
    #[error("invalid unary operation: {op}{operand_type}")]
    InvalidUnaryOp {
        /// Operator
        op: String,
        /// Operand type
        operand_type: String,
        /// Location of the operation
        span: FileSpan,
    },

    /// Wrong number of arguments to a const function
    #[error("`{name}` takes {expected} arguments but {got} were supplied")]
    ArityMismatch {
        /// Path of the function
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
        /// Location of the call
        span: FileSpan,
    },

    /// Index outside a vec or tuple
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Length of the indexed value
        len: usize,
        /// Location of the indexing
        span: FileSpan,
    },

    /// Object without the requested field
    #[error("object has no field `{field}`")]
    MissingField {
        /// Requested field
        field: String,
        /// Location of the access
        span: FileSpan,
    },

    /// Local variable that is not in scope
    #[error("cannot find value `{name}` in this scope")]
    UndefinedVariable {
        /// Variable name
        name: String,
        /// Location of the use
        span: FileSpan,
    },

    /// Constant whose value depends on itself
    #[error("cycle detected when evaluating constant `{name}`")]
    ConstCycle {
        /// Path of the constant
        name: String,
        /// Definition site
        span: FileSpan,
    },

    /// Item path that does not resolve
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl EvaluationError {
    /// Returns the span where the error occurred
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::NativeCall { span, .. }
            | Self::NotConst { span, .. }
            | Self::Unsupported { span, .. }
            | Self::BudgetExceeded { span, .. }
            | Self::CallDepthExceeded { span, .. }
            | Self::DivisionByZero { span }
            | Self::Overflow { span }
            | Self::TypeMismatch { span, .. }
            | Self::InvalidBinaryOp { span, .. }
            | Self::InvalidUnaryOp { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::IndexOutOfBounds { span, .. }
            | Self::MissingField { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::ConstCycle { span, .. } => *span,
            Self::Resolution(err) => err.span(),
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic<F: Copy>(
        &self,
        file_id: F,
    ) -> codespan_reporting::diagnostic::Diagnostic<F> {
        use codespan_reporting::diagnostic::{Diagnostic, Label};

        if let Self::Resolution(err) = self {
            return err.to_codespan_diagnostic(file_id);
        }

        let notes = match self {
            Self::NativeCall { .. } => {
                vec!["native functions only run in the virtual machine".to_string()]
            }
            Self::NotConst { .. } => vec!["declare the function with `const fn`".to_string()],
            Self::BudgetExceeded { .. } => {
                vec!["raise `const_eval.max_steps` in Kestrel.toml if the work is intended".to_string()]
            }
            Self::CallDepthExceeded { .. } => vec![
                "raise `const_eval.max_call_depth` in Kestrel.toml if the recursion is intended"
                    .to_string(),
            ],
            _ => Vec::new(),
        };

        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(vec![
                Label::primary(file_id, self.span().range())
                    .with_message("while evaluating this constant expression"),
            ])
            .with_notes(notes)
    }
}
