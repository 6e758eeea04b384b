//! Compile-time constant evaluation
//!
//! Runs `const` items and `const fn` bodies directly on their syntax tree,
//! after macro expansion. Evaluation is deterministic and has no side
//! effects: native functions are never called.
//!
//! Supported:
//! - Literals, vec, tuple and object construction, indexing and field access
//! - `let`, assignment and compound assignment to locals
//! - `if`, `while`, `loop`, `break` with a value, `continue`, `return`
//! - Calls to `const fn` items and reads of other `const` items
//! - Template strings, string and vec concatenation
//! - Checked integer arithmetic, float arithmetic, comparisons, logic and
//!   bitwise operators
//!
//! Recursion is allowed; a step budget and a call depth limit keep every
//! evaluation finite.

mod error;
mod evaluator;
mod ops;

pub use error::EvaluationError;
pub use evaluator::{
    ConstEvaluator, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS, EVAL_STACK_SIZE, EvalLimits,
    MAX_CALL_DEPTH,
};
