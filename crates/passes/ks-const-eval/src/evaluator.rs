//! Tree-walking evaluator for constant items

use crate::error::EvaluationError;
use crate::ops;
use indexmap::IndexMap;
use ks_index::Index;
use ks_intern::{Interner, Symbol};
use ks_resolve::{ItemId, ItemKind, ModuleId, ResolutionError, Resolver};
use ks_span::FileSpan;
use ks_syntax::{BinaryOp, Body, Expr, ExprId, LiteralKind, Path, Stmt, StmtId, TemplatePart};
use ks_value::Value;
use rustc_hash::{FxHashMap, FxHashSet};

/// Default number of evaluation steps per top-level request
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Default nesting limit for `const fn` calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Highest accepted `max_call_depth`; larger limits are clamped
///
/// Calls recurse on the native stack. Depths above the default need a
/// thread with [`EVAL_STACK_SIZE`] bytes of stack.
pub const MAX_CALL_DEPTH: usize = 512;

/// Stack that holds [`MAX_CALL_DEPTH`] nested calls
pub const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Bounds that keep every evaluation finite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Expressions evaluated before giving up
    pub max_steps: u64,
    /// Nested `const fn` calls before giving up
    pub max_call_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Local variables of one body
struct Frame<'a> {
    body: &'a Body,
    module: ModuleId,
    scopes: Vec<FxHashMap<Symbol, Value>>,
}

impl<'a> Frame<'a> {
    fn new(body: &'a Body, module: ModuleId) -> Self {
        Self {
            body,
            module,
            scopes: vec![FxHashMap::default()],
        }
    }

    fn lookup(&self, name: Symbol) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    fn declare(&mut self, name: Symbol, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    fn assign(&mut self, name: Symbol, value: Value) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(&name) {
                *slot = value;
                return true;
            }
        }
        false
    }
}

/// Non-local exits while walking a body
enum Unwind {
    Break(Value, FileSpan),
    Continue(FileSpan),
    Return(Value, FileSpan),
    Error(EvaluationError),
}

impl From<EvaluationError> for Unwind {
    fn from(err: EvaluationError) -> Self {
        Self::Error(err)
    }
}

impl From<ResolutionError> for Unwind {
    fn from(err: ResolutionError) -> Self {
        Self::Error(err.into())
    }
}

type Eval<T> = Result<T, Unwind>;

/// Evaluates `const` items and `const fn` calls of an [`Index`]
///
/// Constant values are memoised, so every constant is evaluated at most
/// once per evaluator.
pub struct ConstEvaluator<'a> {
    index: &'a Index,
    interner: &'a Interner,
    limits: EvalLimits,
    memo: FxHashMap<ItemId, Value>,
    in_progress: FxHashSet<ItemId>,
    steps: u64,
    depth: usize,
}

impl<'a> ConstEvaluator<'a> {
    /// Create a new const evaluator with default limits
    #[must_use]
    pub fn new(index: &'a Index, interner: &'a Interner) -> Self {
        Self {
            index,
            interner,
            limits: EvalLimits::default(),
            memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            steps: 0,
            depth: 0,
        }
    }

    /// Overrides the evaluation limits
    ///
    /// `max_call_depth` is clamped to [`MAX_CALL_DEPTH`].
    #[must_use]
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        if limits.max_call_depth > MAX_CALL_DEPTH {
            tracing::warn!(
                requested = limits.max_call_depth,
                limit = MAX_CALL_DEPTH,
                "clamping const fn call depth"
            );
        }
        self.limits = EvalLimits {
            max_call_depth: limits.max_call_depth.min(MAX_CALL_DEPTH),
            ..limits
        };
        self
    }

    /// Evaluates the constant `item`, or the constant an import names
    ///
    /// # Errors
    ///
    /// Returns an `EvaluationError` if the initializer fails or calls
    /// something that cannot run at compile time.
    pub fn eval_const(&mut self, item: ItemId) -> Result<Value, EvaluationError> {
        self.steps = 0;
        self.depth = 0;
        let item = self.index.symbols.target(item);
        let span = self.index.tree.item(item).span;
        self.const_value(item, span)
    }

    /// Calls the `const fn` `item` with already evaluated arguments
    ///
    /// # Errors
    ///
    /// Returns an `EvaluationError` if `item` is not a `const fn`, the
    /// argument count is wrong, or the body fails.
    pub fn call_const_fn(
        &mut self,
        item: ItemId,
        args: Vec<Value>,
    ) -> Result<Value, EvaluationError> {
        self.steps = 0;
        self.depth = 0;
        let item = self.index.symbols.target(item);
        let span = self.index.tree.item(item).span;
        self.call(item, args, span)
    }

    /// Evaluates every constant in declaration order
    ///
    /// # Errors
    ///
    /// Returns every distinct error if any constant fails.
    pub fn eval_all(&mut self) -> Result<IndexMap<String, Value>, Vec<EvaluationError>> {
        let index = self.index;
        let mut values = IndexMap::new();
        let mut errors: Vec<EvaluationError> = Vec::new();

        for (id, data) in index.tree.items() {
            if data.kind != ItemKind::Const || data.span.is_synthetic() {
                continue;
            }
            match self.eval_const(id) {
                Ok(value) => {
                    values.insert(data.path.clone(), value);
                }
                Err(err) => {
                    if !errors.contains(&err) {
                        errors.push(err);
                    }
                }
            }
        }

        if errors.is_empty() {
            tracing::debug!(constants = values.len(), "evaluated constants");
            Ok(values)
        } else {
            Err(errors)
        }
    }

    fn const_value(&mut self, item: ItemId, use_site: FileSpan) -> Result<Value, EvaluationError> {
        if let Some(value) = self.memo.get(&item) {
            return Ok(value.clone());
        }

        let index = self.index;
        let data = index.tree.item(item);
        let Some(decl) = index.const_decl(item) else {
            return Err(EvaluationError::TypeMismatch {
                expected: "constant".to_string(),
                got: data.kind.describe().to_string(),
                span: use_site,
            });
        };
        if !self.in_progress.insert(item) {
            return Err(EvaluationError::ConstCycle {
                name: data.path.clone(),
                span: data.span,
            });
        }

        let mut frame = Frame::new(&decl.body, data.parent);
        let result = self.eval(&mut frame, decl.body.root);
        self.in_progress.remove(&item);

        let value = finish(result, false)?;
        tracing::trace!(constant = %data.path, value = %value.repr(), "evaluated constant");
        self.memo.insert(item, value.clone());
        Ok(value)
    }

    /// Only `const fn` items can run at compile time
    fn check_callable(&self, item: ItemId, span: FileSpan) -> Result<(), EvaluationError> {
        let data = self.index.tree.item(item);
        match data.kind {
            ItemKind::ConstFn => Ok(()),
            ItemKind::Function => Err(EvaluationError::NotConst {
                name: data.path.clone(),
                span,
            }),
            ItemKind::NativeFunction { .. } => Err(EvaluationError::NativeCall {
                name: data.path.clone(),
                span,
            }),
            _ => Err(EvaluationError::TypeMismatch {
                expected: "function".to_string(),
                got: data.kind.describe().to_string(),
                span,
            }),
        }
    }

    fn call(
        &mut self,
        item: ItemId,
        args: Vec<Value>,
        span: FileSpan,
    ) -> Result<Value, EvaluationError> {
        self.check_callable(item, span)?;
        let index = self.index;
        let data = index.tree.item(item);
        let Some(decl) = index.fn_decl(item) else {
            return Err(EvaluationError::Unsupported {
                operation: format!("call to `{}` without a body", data.path),
                span,
            });
        };

        if decl.params.len() != args.len() {
            return Err(EvaluationError::ArityMismatch {
                name: data.path.clone(),
                expected: decl.params.len(),
                got: args.len(),
                span,
            });
        }
        if self.depth >= self.limits.max_call_depth {
            return Err(EvaluationError::CallDepthExceeded {
                limit: self.limits.max_call_depth,
                span,
            });
        }

        tracing::trace!(function = %data.path, depth = self.depth, "calling const fn");
        let mut frame = Frame::new(&decl.body, data.parent);
        for (param, arg) in decl.params.iter().zip(args) {
            frame.declare(param.name, arg);
        }

        self.depth += 1;
        let result = self.eval(&mut frame, decl.body.root);
        self.depth -= 1;
        finish(result, true)
    }

    fn tick(&mut self, span: FileSpan) -> Result<(), EvaluationError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvaluationError::BudgetExceeded {
                limit: self.limits.max_steps,
                span,
            });
        }
        Ok(())
    }

    fn resolve(&self, frame: &Frame<'a>, path: &Path, span: FileSpan) -> Eval<ItemId> {
        let resolver = Resolver::new(&self.index.tree, self.interner);
        match resolver.resolve_path(frame.module, path, span) {
            Ok(item) => Ok(item),
            Err(ResolutionError::Undefined { .. }) if path.as_ident().is_some() => {
                Err(EvaluationError::UndefinedVariable {
                    name: path.display(self.interner),
                    span,
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    #[allow(clippy::too_many_lines, reason = "One arm per expression kind")]
    fn eval(&mut self, frame: &mut Frame<'a>, id: ExprId) -> Eval<Value> {
        let body = frame.body;
        let expr = body.expr(id);
        self.tick(expr.span())?;

        match expr {
            Expr::Literal { kind, .. } => Ok(literal(kind)),
            Expr::Template { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(inner) => {
                            let value = self.eval(frame, *inner)?;
                            out.push_str(&value.to_string());
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Path { path, span } => {
                if let Some(value) = path.as_ident().and_then(|name| frame.lookup(name)) {
                    return Ok(value.clone());
                }
                let item = self.resolve(frame, path, *span)?;
                let data = self.index.tree.item(item);
                match data.kind {
                    ItemKind::Const => Ok(self.const_value(item, *span)?),
                    _ => Err(EvaluationError::Unsupported {
                        operation: format!(
                            "using {} `{}` as a value",
                            data.kind.describe(),
                            data.path
                        ),
                        span: *span,
                    }
                    .into()),
                }
            }
            Expr::Call { callee, args, span } => {
                let Expr::Path { path, .. } = body.expr(*callee) else {
                    return Err(EvaluationError::Unsupported {
                        operation: "calling a computed value".to_string(),
                        span: *span,
                    }
                    .into());
                };
                let item = Resolver::new(&self.index.tree, self.interner).resolve_path(
                    frame.module,
                    path,
                    path.span,
                )?;
                self.check_callable(item, *span)?;
                let args = self.eval_all_of(frame, args)?;
                Ok(self.call(item, args, *span)?)
            }
            Expr::MethodCall { method, span, .. } => Err(EvaluationError::Unsupported {
                operation: format!("method call `.{}()`", self.interner.resolve(method)),
                span: *span,
            }
            .into()),
            Expr::Field { base, field, span } => {
                let name = self.interner.resolve(field);
                match self.eval(frame, *base)? {
                    Value::Object(mut fields) => fields.swap_remove(&name).ok_or_else(|| {
                        EvaluationError::MissingField { field: name, span: *span }.into()
                    }),
                    other => Err(EvaluationError::TypeMismatch {
                        expected: "object".to_string(),
                        got: other.type_name().to_string(),
                        span: *span,
                    }
                    .into()),
                }
            }
            Expr::Index { base, index, span } => {
                let base = self.eval(frame, *base)?;
                let index = self.eval(frame, *index)?;
                Ok(index_value(base, index, *span)?)
            }
            Expr::Unary { op, operand, span } => {
                let value = self.eval(frame, *operand)?;
                Ok(ops::unary(*op, value, *span)?)
            }
            Expr::Binary { op: op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs, span } => {
                let lhs = self.eval(frame, *lhs)?;
                match (op, expect_bool(lhs, *span)?) {
                    (BinaryOp::And, false) => Ok(Value::Bool(false)),
                    (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                    _ => {
                        let rhs = self.eval(frame, *rhs)?;
                        Ok(Value::Bool(expect_bool(rhs, *span)?))
                    }
                }
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let lhs = self.eval(frame, *lhs)?;
                let rhs = self.eval(frame, *rhs)?;
                Ok(ops::binary(*op, lhs, rhs, *span)?)
            }
            Expr::Assign { op, target, value, span } => {
                let name = match body.expr(*target) {
                    Expr::Path { path, .. } => path.as_ident(),
                    _ => None,
                };
                let Some(name) = name else {
                    return Err(EvaluationError::Unsupported {
                        operation: "assignment to anything but a local variable".to_string(),
                        span: *span,
                    }
                    .into());
                };
                let interner = self.interner;
                let undefined = || EvaluationError::UndefinedVariable {
                    name: interner.resolve(&name),
                    span: *span,
                };

                let mut value = self.eval(frame, *value)?;
                if let Some(op) = op {
                    let current = frame.lookup(name).cloned().ok_or_else(undefined)?;
                    value = ops::binary(*op, current, value, *span)?;
                }
                if !frame.assign(name, value) {
                    return Err(undefined().into());
                }
                Ok(Value::Unit)
            }
            Expr::Block { stmts, tail, .. } => {
                frame.scopes.push(FxHashMap::default());
                let result = self.block(frame, stmts, *tail);
                frame.scopes.pop();
                result
            }
            Expr::If { condition, then_branch, else_branch, span } => {
                let condition = self.eval(frame, *condition)?;
                if expect_bool(condition, *span)? {
                    self.eval(frame, *then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval(frame, *else_branch)
                } else {
                    Ok(Value::Unit)
                }
            }
            Expr::While { condition, body, span } => {
                loop {
                    let value = self.eval(frame, *condition)?;
                    if !expect_bool(value, *span)? {
                        break;
                    }
                    match self.eval(frame, *body) {
                        Ok(_) | Err(Unwind::Continue(_)) => {}
                        Err(Unwind::Break(..)) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Unit)
            }
            Expr::Loop { body, .. } => loop {
                match self.eval(frame, *body) {
                    Ok(_) | Err(Unwind::Continue(_)) => {}
                    Err(Unwind::Break(value, _)) => return Ok(value),
                    Err(other) => return Err(other),
                }
            },
            Expr::Break { value, span } => {
                let value = match value {
                    Some(value) => self.eval(frame, *value)?,
                    None => Value::Unit,
                };
                Err(Unwind::Break(value, *span))
            }
            Expr::Continue { span } => Err(Unwind::Continue(*span)),
            Expr::Return { value, span } => {
                let value = match value {
                    Some(value) => self.eval(frame, *value)?,
                    None => Value::Unit,
                };
                Err(Unwind::Return(value, *span))
            }
            Expr::Vec { elements, .. } => Ok(Value::Vec(self.eval_all_of(frame, elements)?)),
            Expr::Tuple { elements, .. } => Ok(Value::Tuple(self.eval_all_of(frame, elements)?)),
            Expr::Object { fields, .. } => {
                let mut object = IndexMap::with_capacity(fields.len());
                for (name, value) in fields {
                    let value = self.eval(frame, *value)?;
                    object.insert(self.interner.resolve(name), value);
                }
                Ok(Value::Object(object))
            }
            Expr::Paren { inner, .. } => self.eval(frame, *inner),
            Expr::MacroCall(call) => Err(EvaluationError::Unsupported {
                operation: format!("unexpanded macro `{}!`", call.path.display(self.interner)),
                span: call.span,
            }
            .into()),
        }
    }

    fn block(&mut self, frame: &mut Frame<'a>, stmts: &[StmtId], tail: Option<ExprId>) -> Eval<Value> {
        let body = frame.body;
        for &stmt in stmts {
            match body.stmt(stmt) {
                Stmt::Let { name, value, .. } => {
                    let value = self.eval(frame, *value)?;
                    frame.declare(*name, value);
                }
                Stmt::Expr { expr, .. } => {
                    self.eval(frame, *expr)?;
                }
            }
        }
        match tail {
            Some(tail) => self.eval(frame, tail),
            None => Ok(Value::Unit),
        }
    }

    fn eval_all_of(&mut self, frame: &mut Frame<'a>, exprs: &[ExprId]) -> Eval<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for &expr in exprs {
            values.push(self.eval(frame, expr)?);
        }
        Ok(values)
    }
}

/// Turns the outcome of a whole body into its value
fn finish(result: Eval<Value>, in_function: bool) -> Result<Value, EvaluationError> {
    match result {
        Ok(value) => Ok(value),
        Err(Unwind::Return(value, _)) if in_function => Ok(value),
        Err(Unwind::Return(_, span)) => Err(EvaluationError::Unsupported {
            operation: "`return` outside of a function".to_string(),
            span,
        }),
        Err(Unwind::Break(_, span)) => Err(EvaluationError::Unsupported {
            operation: "`break` outside of a loop".to_string(),
            span,
        }),
        Err(Unwind::Continue(span)) => Err(EvaluationError::Unsupported {
            operation: "`continue` outside of a loop".to_string(),
            span,
        }),
        Err(Unwind::Error(err)) => Err(err),
    }
}

fn literal(kind: &LiteralKind) -> Value {
    match kind {
        LiteralKind::Unit => Value::Unit,
        LiteralKind::Bool(value) => Value::Bool(*value),
        LiteralKind::Integer(value) => Value::Integer(*value),
        LiteralKind::Float(value) => Value::Float(*value),
        LiteralKind::Str(value) => Value::String(value.clone()),
        LiteralKind::Char(value) => Value::Char(*value),
        LiteralKind::Byte(value) => Value::Integer(i64::from(*value)),
    }
}

fn expect_bool(value: Value, span: FileSpan) -> Result<bool, EvaluationError> {
    match value {
        Value::Bool(value) => Ok(value),
        other => Err(EvaluationError::TypeMismatch {
            expected: "bool".to_string(),
            got: other.type_name().to_string(),
            span,
        }),
    }
}

fn index_value(base: Value, index: Value, span: FileSpan) -> Result<Value, EvaluationError> {
    match (base, index) {
        (Value::Vec(mut items) | Value::Tuple(mut items), Value::Integer(index)) => {
            let len = items.len();
            match usize::try_from(index) {
                Ok(position) if position < len => Ok(items.swap_remove(position)),
                _ => Err(EvaluationError::IndexOutOfBounds { index, len, span }),
            }
        }
        (Value::Object(mut fields), Value::String(key)) => fields
            .swap_remove(&key)
            .ok_or(EvaluationError::MissingField { field: key, span }),
        (Value::Vec(_) | Value::Tuple(_), other) => Err(EvaluationError::TypeMismatch {
            expected: "integer index".to_string(),
            got: other.type_name().to_string(),
            span,
        }),
        (Value::Object(_), other) => Err(EvaluationError::TypeMismatch {
            expected: "string key".to_string(),
            got: other.type_name().to_string(),
            span,
        }),
        (other, _) => Err(EvaluationError::TypeMismatch {
            expected: "vec, tuple or object".to_string(),
            got: other.type_name().to_string(),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use ks_index::{Indexer, StaticLoader};
    use ks_span::FileId;
    use std::thread;

    fn index(source: &str) -> (Index, Interner) {
        let interner = Interner::new();
        let context = ks_modules::default_context().unwrap();
        let file = ks_parser::parse_source(FileId(0), source, &interner).unwrap();
        let index = Indexer::new(&context, &interner, &mut StaticLoader::new())
            .index(file)
            .unwrap();
        (index, interner)
    }

    fn eval_named(source: &str, name: &str) -> Result<Value, EvaluationError> {
        let (index, interner) = index(source);
        let item = index.symbols.get(name).unwrap();
        ConstEvaluator::new(&index, &interner).eval_const(item)
    }

    fn strings(value: &Value) -> Vec<&str> {
        value
            .as_vec()
            .unwrap()
            .iter()
            .map(|value| value.as_str().unwrap())
            .collect()
    }

    #[test]
    fn greetings_from_a_const_fn() {
        let value = eval_named(
            r#"
            const fn greeting(name) { `Hello {name}` }
            pub const GREETINGS = [
                greeting("Stranger"),
                greeting("Jane"),
                greeting("John"),
                greeting("Mio"),
            ];
            "#,
            "GREETINGS",
        )
        .unwrap();

        assert_eq!(
            strings(&value),
            ["Hello Stranger", "Hello Jane", "Hello John", "Hello Mio"]
        );
    }

    #[test]
    fn greetings_from_a_while_loop() {
        let value = eval_named(
            r#"
            const NAMES = ["Stranger", "Jane", "John", "Mio"];
            pub const GREETINGS = {
                let out = [];
                let i = 0;
                while i < 4 {
                    out = out + [`Hello {NAMES[i]}`];
                    i += 1;
                }
                out
            };
            "#,
            "GREETINGS",
        )
        .unwrap();

        assert_eq!(
            strings(&value),
            ["Hello Stranger", "Hello Jane", "Hello John", "Hello Mio"]
        );
    }

    #[test]
    fn recursive_fibonacci() {
        let (index, interner) =
            index("const fn fib(n) { if n <= 1 { n } else { fib(n - 1) + fib(n - 2) } }");
        let fib = index.symbols.get("fib").unwrap();
        let mut evaluator = ConstEvaluator::new(&index, &interner);

        assert_eq!(evaluator.call_const_fn(fib, vec![Value::Integer(15)]), Ok(Value::Integer(610)));
        assert_eq!(evaluator.call_const_fn(fib, vec![Value::Integer(0)]), Ok(Value::Integer(0)));
    }

    #[test]
    fn iterative_fibonacci_with_loop_and_break() {
        let value = eval_named(
            "const fn fib(n) {
                 let a = 0;
                 let b = 1;
                 let i = 0;
                 loop {
                     if i == n { break a; }
                     let next = a + b;
                     a = b;
                     b = next;
                     i += 1;
                 }
             }
             const FIB = fib(15);",
            "FIB",
        );
        assert_eq!(value, Ok(Value::Integer(610)));
    }

    #[test]
    fn stringy_math_expands_before_evaluation() {
        let value = eval_named(
            "use std::experiments::stringy_math;
             const VALUE = stringy_math!(add 10 sub 5);",
            "VALUE",
        );
        assert_eq!(value, Ok(Value::Integer(5)));
    }

    #[test]
    fn constants_are_read_across_modules() {
        let value = eval_named(
            "mod config {
                 pub const BASE = 40;
                 pub const fn offset() { super::EXTRA }
             }
             const EXTRA = 2;
             const ANSWER = config::BASE + config::offset();",
            "ANSWER",
        );
        assert_eq!(value, Ok(Value::Integer(42)));
    }

    #[test]
    fn early_return_and_continue() {
        let value = eval_named(
            "const fn sum_odd(limit) {
                 let total = 0;
                 let i = 0;
                 while true {
                     i += 1;
                     if i > limit { return total; }
                     if i % 2 == 0 { continue; }
                     total += i;
                 }
             }
             const SUM = sum_odd(9);",
            "SUM",
        );
        assert_eq!(value, Ok(Value::Integer(25)));
    }

    #[test]
    fn byte_literals_are_integers() {
        assert_eq!(
            eval_named(r"const X = b'a' + b'\x01';", "X"),
            Ok(Value::Integer(98))
        );
    }

    #[test]
    fn objects_and_tuples() {
        let value = eval_named(
            r#"const PAIR = {
                 let point = #{x: 1, y: 2};
                 let pair = (point.x, point["y"]);
                 pair[0] * 10 + pair[1]
             };"#,
            "PAIR",
        );
        assert_eq!(value, Ok(Value::Integer(12)));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let value = eval_named(
            "const fn boom() { 1 / 0 }
             const SAFE = false && boom() == 1 || true;",
            "SAFE",
        );
        assert_eq!(value, Ok(Value::Bool(true)));
    }

    #[test]
    fn native_calls_are_rejected() {
        let err = eval_named(
            r#"const PRINTED = std::io::println("hi");"#,
            "PRINTED",
        )
        .unwrap_err();
        expect!["cannot call native function `std::io::println` in a constant context"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn plain_functions_are_rejected() {
        let err = eval_named("fn runtime() { 1 } const X = runtime();", "X").unwrap_err();
        assert!(matches!(err, EvaluationError::NotConst { ref name, .. } if name == "runtime"));
    }

    #[test]
    fn arithmetic_errors() {
        let err = eval_named("const X = 1 / (2 - 2);", "X").unwrap_err();
        assert!(matches!(err, EvaluationError::DivisionByZero { .. }));

        let err = eval_named("const X = 9223372036854775807 + 1;", "X").unwrap_err();
        assert!(matches!(err, EvaluationError::Overflow { .. }));

        let err = eval_named(r#"const X = "a" * 2;"#, "X").unwrap_err();
        expect!["invalid binary operation: string * integer"].assert_eq(&err.to_string());
    }

    #[test]
    fn constant_cycles_are_detected() {
        let err = eval_named("const A = B + 1; const B = A + 1;", "A").unwrap_err();
        expect!["cycle detected when evaluating constant `A`"].assert_eq(&err.to_string());
    }

    #[test]
    fn infinite_loops_exhaust_the_budget() {
        let (index, interner) = index("const SPIN = loop {};");
        let item = index.symbols.get("SPIN").unwrap();
        let err = ConstEvaluator::new(&index, &interner)
            .with_limits(EvalLimits {
                max_steps: 1_000,
                max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            })
            .eval_const(item)
            .unwrap_err();
        assert_eq!(err.to_string(), "constant evaluation exceeded 1000 steps");
    }

    #[test]
    fn unbounded_recursion_hits_the_depth_limit() {
        let (index, interner) = index("const fn down(n) { down(n + 1) } const X = down(0);");
        let item = index.symbols.get("X").unwrap();
        let err = ConstEvaluator::new(&index, &interner)
            .with_limits(EvalLimits {
                max_steps: DEFAULT_MAX_STEPS,
                max_call_depth: 16,
            })
            .eval_const(item)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::CallDepthExceeded { limit: 16, .. }));
    }

    #[test]
    fn configured_depth_is_clamped_to_what_the_stack_holds() {
        let (index, interner) = index(
            "const fn down(n) { if n == 0 { 0 } else { down(n - 1) } }
             const X = down(20000);",
        );
        let item = index.symbols.get("X").unwrap();
        let result = thread::scope(|scope| {
            thread::Builder::new()
                .stack_size(EVAL_STACK_SIZE)
                .spawn_scoped(scope, || {
                    ConstEvaluator::new(&index, &interner)
                        .with_limits(EvalLimits {
                            max_steps: DEFAULT_MAX_STEPS,
                            max_call_depth: 100_000,
                        })
                        .eval_const(item)
                })
                .unwrap()
                .join()
                .unwrap()
        });
        assert!(matches!(
            result,
            Err(EvaluationError::CallDepthExceeded { limit: MAX_CALL_DEPTH, .. })
        ));
    }

    #[test]
    fn argument_count_must_match() {
        let err = eval_named("const fn pair(a, b) { (a, b) } const X = pair(1);", "X")
            .unwrap_err();
        expect!["`pair` takes 2 arguments but 1 were supplied"].assert_eq(&err.to_string());
    }

    #[test]
    fn indexing_past_the_end() {
        let err = eval_named("const X = [1, 2, 3][3];", "X").unwrap_err();
        assert!(matches!(err, EvaluationError::IndexOutOfBounds { index: 3, len: 3, .. }));
    }

    #[test]
    fn unknown_names() {
        let err = eval_named("const fn f() { missing } const X = f();", "X").unwrap_err();
        expect!["cannot find value `missing` in this scope"].assert_eq(&err.to_string());

        let err = eval_named("mod a {} const X = a::missing;", "X").unwrap_err();
        assert!(matches!(err, EvaluationError::Resolution(ResolutionError::Undefined { .. })));
    }

    #[test]
    fn eval_all_keeps_declaration_order() {
        let (index, interner) = index(
            "const B = A * 2;
             const A = 21;
             mod nested { pub const C = `{super::B}!`; }",
        );
        let values = ConstEvaluator::new(&index, &interner).eval_all().unwrap();
        let rendered: Vec<_> = values
            .iter()
            .map(|(path, value)| format!("{path} = {}", value.repr()))
            .collect();
        expect![[r#"
            [
                "B = 42",
                "A = 21",
                "nested::C = \"42!\"",
            ]
        "#]]
        .assert_debug_eq(&rendered);
    }
}
