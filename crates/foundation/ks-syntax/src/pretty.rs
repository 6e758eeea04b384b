//! Source-like rendering of the syntax tree
//!
//! Used by `kestrel expand` and by snapshot tests of macro output.

use crate::ast::{
    Body, Expr, ExprId, Item, ItemKind, LiteralKind, ModContent, Stmt, TemplatePart, UseEntry,
    Visibility,
};
use crate::token::{format_byte, format_float};
use ks_intern::Interner;

const INDENT: &str = "    ";

/// Pretty printer for items and expressions
pub struct Printer<'a> {
    interner: &'a Interner,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    /// Creates a printer
    #[must_use]
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            out: String::new(),
            indent: 0,
        }
    }

    /// Renders a list of items
    #[must_use]
    pub fn items(mut self, items: &[Item]) -> String {
        for item in items {
            self.item(item);
        }
        self.out
    }

    /// Renders one expression of a body
    #[must_use]
    pub fn expr(mut self, body: &Body, id: ExprId) -> String {
        self.write_expr(body, id);
        self.out
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn name(&self, sym: &ks_intern::Symbol) -> String {
        self.interner.resolve(sym)
    }

    fn item(&mut self, item: &Item) {
        self.line_start();
        if item.visibility == Visibility::Public {
            self.out.push_str("pub ");
        }
        match &item.kind {
            ItemKind::Fn(decl) => {
                if decl.is_const {
                    self.out.push_str("const ");
                }
                let params = decl
                    .params
                    .iter()
                    .map(|param| self.name(&param.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.out.push_str(&format!("fn {}({params}) ", self.name(&decl.name)));
                self.write_expr(&decl.body, decl.body.root);
                self.out.push('\n');
            }
            ItemKind::Const(decl) => {
                self.out.push_str(&format!("const {} = ", self.name(&decl.name)));
                self.write_expr(&decl.body, decl.body.root);
                self.out.push_str(";\n");
            }
            ItemKind::Mod(decl) => {
                self.out.push_str(&format!("mod {}", self.name(&decl.name)));
                match &decl.content {
                    ModContent::External => self.out.push_str(";\n"),
                    ModContent::Inline(items) => {
                        self.out.push_str(" {\n");
                        self.indent += 1;
                        for inner in items {
                            self.item(inner);
                        }
                        self.indent -= 1;
                        self.line_start();
                        self.out.push_str("}\n");
                    }
                }
            }
            ItemKind::Use(entries) => {
                let rendered = entries
                    .iter()
                    .map(|entry| self.use_entry(entry))
                    .collect::<Vec<_>>();
                self.out.push_str(&format!("use {};\n", rendered.join(", ")));
            }
            ItemKind::MacroCall(call) => {
                self.out.push_str(&format!(
                    "{}!({});\n",
                    call.path.display(self.interner),
                    call.input.to_source(self.interner)
                ));
            }
        }
    }

    fn use_entry(&self, entry: &UseEntry) -> String {
        let path = entry.path.display(self.interner);
        match &entry.alias {
            Some(alias) => format!("{path} as {}", self.name(alias)),
            None => path,
        }
    }

    fn comma_separated(&mut self, body: &Body, ids: &[ExprId]) {
        for (index, id) in ids.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(body, *id);
        }
    }

    fn write_expr(&mut self, body: &Body, id: ExprId) {
        match body.expr(id) {
            Expr::Literal { kind, .. } => self.literal(kind),
            Expr::Template { parts, .. } => {
                self.out.push('`');
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => {
                            for ch in text.chars() {
                                match ch {
                                    '`' | '{' | '}' | '\\' => {
                                        self.out.push('\\');
                                        self.out.push(ch);
                                    }
                                    '\n' => self.out.push_str("\\n"),
                                    _ => self.out.push(ch),
                                }
                            }
                        }
                        TemplatePart::Expr(inner) => {
                            self.out.push('{');
                            self.write_expr(body, *inner);
                            self.out.push('}');
                        }
                    }
                }
                self.out.push('`');
            }
            Expr::Path { path, .. } => {
                let rendered = path.display(self.interner);
                self.out.push_str(&rendered);
            }
            Expr::Call { callee, args, .. } => {
                self.write_expr(body, *callee);
                self.out.push('(');
                self.comma_separated(body, args);
                self.out.push(')');
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                self.write_expr(body, *receiver);
                self.out.push_str(&format!(".{}(", self.name(method)));
                self.comma_separated(body, args);
                self.out.push(')');
            }
            Expr::Field { base, field, .. } => {
                self.write_expr(body, *base);
                self.out.push_str(&format!(".{}", self.name(field)));
            }
            Expr::Index { base, index, .. } => {
                self.write_expr(body, *base);
                self.out.push('[');
                self.write_expr(body, *index);
                self.out.push(']');
            }
            Expr::Unary { op, operand, .. } => {
                self.out.push_str(&format!("{op}"));
                self.write_expr(body, *operand);
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.write_expr(body, *lhs);
                self.out.push_str(&format!(" {op} "));
                self.write_expr(body, *rhs);
            }
            Expr::Assign {
                op, target, value, ..
            } => {
                self.write_expr(body, *target);
                match op {
                    Some(op) => {
                        self.out.push_str(&format!(" {op}= "));
                    }
                    None => self.out.push_str(" = "),
                }
                self.write_expr(body, *value);
            }
            Expr::Block { stmts, tail, .. } => {
                self.out.push_str("{\n");
                self.indent += 1;
                for stmt in stmts {
                    self.line_start();
                    match body.stmt(*stmt) {
                        Stmt::Let { name, value, .. } => {
                            self.out.push_str(&format!("let {} = ", self.name(name)));
                            self.write_expr(body, *value);
                            self.out.push(';');
                        }
                        Stmt::Expr { expr, .. } => {
                            self.write_expr(body, *expr);
                            if !body.expr(*expr).is_block_like() {
                                self.out.push(';');
                            }
                        }
                    }
                    self.out.push('\n');
                }
                if let Some(tail) = tail {
                    self.line_start();
                    self.write_expr(body, *tail);
                    self.out.push('\n');
                }
                self.indent -= 1;
                self.line_start();
                self.out.push('}');
            }
            Expr::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.out.push_str("if ");
                self.write_expr(body, *condition);
                self.out.push(' ');
                self.write_expr(body, *then_branch);
                if let Some(otherwise) = else_branch {
                    self.out.push_str(" else ");
                    self.write_expr(body, *otherwise);
                }
            }
            Expr::While {
                condition,
                body: inner,
                ..
            } => {
                self.out.push_str("while ");
                self.write_expr(body, *condition);
                self.out.push(' ');
                self.write_expr(body, *inner);
            }
            Expr::Loop { body: inner, .. } => {
                self.out.push_str("loop ");
                self.write_expr(body, *inner);
            }
            Expr::Break { value, .. } => {
                self.out.push_str("break");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.write_expr(body, *value);
                }
            }
            Expr::Continue { .. } => self.out.push_str("continue"),
            Expr::Return { value, .. } => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.write_expr(body, *value);
                }
            }
            Expr::Vec { elements, .. } => {
                self.out.push('[');
                self.comma_separated(body, elements);
                self.out.push(']');
            }
            Expr::Tuple { elements, .. } => {
                self.out.push('(');
                self.comma_separated(body, elements);
                if elements.len() == 1 {
                    self.out.push(',');
                }
                self.out.push(')');
            }
            Expr::Object { fields, .. } => {
                self.out.push_str("#{");
                for (index, (key, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&format!("{}: ", self.name(key)));
                    self.write_expr(body, *value);
                }
                self.out.push('}');
            }
            Expr::Paren { inner, .. } => {
                self.out.push('(');
                self.write_expr(body, *inner);
                self.out.push(')');
            }
            Expr::MacroCall(call) => {
                self.out.push_str(&format!(
                    "{}!({})",
                    call.path.display(self.interner),
                    call.input.to_source(self.interner)
                ));
            }
        }
    }

    fn literal(&mut self, kind: &LiteralKind) {
        match kind {
            LiteralKind::Unit => self.out.push_str("()"),
            LiteralKind::Bool(value) => {
                self.out.push_str(&value.to_string());
            }
            LiteralKind::Integer(value) => {
                self.out.push_str(&value.to_string());
            }
            LiteralKind::Float(value) => self.out.push_str(&format_float(*value)),
            LiteralKind::Str(value) => {
                self.out.push_str(&format!("{value:?}"));
            }
            LiteralKind::Char(value) => {
                self.out.push_str(&format!("{value:?}"));
            }
            LiteralKind::Byte(value) => self.out.push_str(&format_byte(*value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ConstDecl};
    use expect_test::expect;
    use ks_span::FileSpan;

    fn int(body: &mut Body, value: i64) -> ExprId {
        body.alloc_expr(Expr::Literal {
            kind: LiteralKind::Integer(value),
            span: FileSpan::synthetic(),
        })
    }

    #[test]
    fn parens_are_printed_as_written() {
        let interner = Interner::new();
        let span = FileSpan::synthetic();
        let mut body = Body::new(span);
        let zero = int(&mut body, 0);
        let zero = body.alloc_expr(Expr::Paren { inner: zero, span });
        let ten = int(&mut body, 10);
        let sum = body.alloc_expr(Expr::Binary {
            op: BinaryOp::Add,
            lhs: zero,
            rhs: ten,
            span,
        });
        let sum = body.alloc_expr(Expr::Paren { inner: sum, span });
        let five = int(&mut body, 5);
        let root = body.alloc_expr(Expr::Binary {
            op: BinaryOp::Sub,
            lhs: sum,
            rhs: five,
            span,
        });

        expect!["((0) + 10) - 5"].assert_eq(&Printer::new(&interner).expr(&body, root));
    }

    #[test]
    fn const_item_with_template() {
        let interner = Interner::new();
        let span = FileSpan::synthetic();
        let mut body = Body::new(span);
        let name = body.alloc_expr(Expr::Path {
            path: crate::ast::Path::ident(interner.intern("name"), span),
            span,
        });
        body.root = body.alloc_expr(Expr::Template {
            parts: vec![
                TemplatePart::Text("Hello ".to_string()),
                TemplatePart::Expr(name),
            ],
            span,
        });
        let item = Item {
            visibility: Visibility::Public,
            kind: ItemKind::Const(ConstDecl {
                name: interner.intern("GREETING"),
                name_span: span,
                body,
            }),
            span,
        };

        expect![[r#"
            pub const GREETING = `Hello {name}`;
        "#]]
        .assert_eq(&Printer::new(&interner).items(&[item]));
    }
}
