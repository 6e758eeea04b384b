//! Recursive-descent parser over token slices
//!
//! The same parser reads lexed files and macro output, so nothing here
//! assumes the tokens came from source text.

use crate::ParseError;
use crate::lexer::{decode_escape, lex_at};
use ks_intern::{Interner, Symbol};
use ks_span::FileSpan;
use std::mem;
use ks_syntax::{
    BinaryOp, Body, ConstDecl, Delimiter, Expr, ExprId, FnDecl, Item, ItemKind, Keyword,
    LiteralKind, MacroCall, ModContent, ModDecl, Param, Path, PathSegment, Punct, Stmt,
    TemplatePart, Token, TokenKind, TokenStream, UnaryOp, UseEntry, Visibility,
};

/// Deepest nesting of expressions, blocks, modules and use groups
pub const MAX_NESTING: usize = 128;

/// Token cursor with lookahead and span tracking
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    interner: &'t Interner,
    end: FileSpan,
    depth: usize,
}

impl<'t> Parser<'t> {
    /// Creates a parser over `tokens`
    #[must_use]
    pub fn new(tokens: &'t [Token], interner: &'t Interner) -> Self {
        let end = tokens
            .last()
            .map_or_else(FileSpan::synthetic, |token| token.span);
        Self {
            tokens,
            pos: 0,
            interner,
            end,
            depth: 0,
        }
    }

    /// Span reported for errors at end of input
    #[must_use]
    pub fn with_end_span(mut self, end: FileSpan) -> Self {
        self.end = end;
        self
    }

    /// True once every token has been consumed
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Current token without consuming it
    #[must_use]
    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Token `n` positions ahead without consuming
    #[must_use]
    pub fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n)
    }

    /// Consumes and returns the current token
    ///
    /// # Errors
    ///
    /// Fails at end of input.
    pub fn next_token(&mut self) -> Result<&'t Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| ParseError::eof("token", self.end))?;
        self.pos += 1;
        Ok(token)
    }

    /// Span of the current token, or of the end of input
    #[must_use]
    pub fn current_span(&self) -> FileSpan {
        self.peek().map_or(self.end, |token| token.span)
    }

    fn prev_span(&self) -> FileSpan {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(self.end, |token| token.span)
    }

    fn span_from(&self, start: FileSpan) -> FileSpan {
        start.join(self.prev_span())
    }

    /// Runs `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::nesting(MAX_NESTING, self.current_span()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Rejects `#[...]` and `#![...]`
    fn reject_attribute(&mut self) -> Result<(), ParseError> {
        let bracket = |token: Option<&Token>| {
            token.is_some_and(|token| token.kind == TokenKind::Open(Delimiter::Bracket))
        };
        let is_attribute = self.check_punct(Punct::Pound)
            && (bracket(self.peek_nth(1))
                || (self.peek_nth(1).is_some_and(|token| token.is_punct(Punct::Bang))
                    && bracket(self.peek_nth(2))));
        if !is_attribute {
            return Ok(());
        }

        let start = self.current_span();
        self.pos += 1;
        self.eat_punct(Punct::Bang);
        self.parse_macro_input()?;
        Err(ParseError::attribute(self.span_from(start)))
    }

    /// Error describing what was expected at the current position
    #[must_use]
    pub fn error_expected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::unexpected(
                expected,
                token.kind.describe(self.interner),
                token.span,
            ),
            None => ParseError::eof(expected, self.end),
        }
    }

    /// Fails if any tokens remain
    ///
    /// # Errors
    ///
    /// `ParseError::TrailingTokens` at the first leftover token.
    pub fn expect_eof(&self) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) => Err(ParseError::trailing(token.span)),
            None => Ok(()),
        }
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.peek().is_some_and(|token| token.is_punct(punct))
    }

    /// Consumes the punctuation if present
    pub fn eat_punct(&mut self, punct: Punct) -> bool {
        let found = self.check_punct(punct);
        if found {
            self.pos += 1;
        }
        found
    }

    /// Consumes the punctuation or fails
    ///
    /// # Errors
    ///
    /// `ParseError` if the current token is anything else.
    pub fn expect_punct(&mut self, punct: Punct) -> Result<FileSpan, ParseError> {
        if self.check_punct(punct) {
            self.pos += 1;
            Ok(self.prev_span())
        } else {
            Err(self.error_expected(&format!("`{punct}`")))
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|token| token.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.check_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<FileSpan, ParseError> {
        if self.eat_keyword(keyword) {
            Ok(self.prev_span())
        } else {
            Err(self.error_expected(&format!("`{keyword}`")))
        }
    }

    fn check_open(&self, delim: Delimiter) -> bool {
        self.peek()
            .is_some_and(|token| token.kind == TokenKind::Open(delim))
    }

    fn expect_open(&mut self, delim: Delimiter) -> Result<FileSpan, ParseError> {
        if self.check_open(delim) {
            self.pos += 1;
            Ok(self.prev_span())
        } else {
            Err(self.error_expected(&format!("`{}`", delim.open())))
        }
    }

    fn eat_close(&mut self, delim: Delimiter) -> bool {
        let found = self
            .peek()
            .is_some_and(|token| token.kind == TokenKind::Close(delim));
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_close(&mut self, delim: Delimiter) -> Result<(), ParseError> {
        if self.eat_close(delim) {
            Ok(())
        } else {
            Err(self.error_expected(&format!("`{}`", delim.close())))
        }
    }

    /// Parses a plain identifier
    ///
    /// # Errors
    ///
    /// `ParseError` if the current token is not an identifier.
    pub fn parse_ident(&mut self) -> Result<(Symbol, FileSpan), ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => {
                self.pos += 1;
                Ok((*name, *span))
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    fn parse_path_segment(&mut self) -> Result<PathSegment, ParseError> {
        let segment = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Ident(name)) => PathSegment::Ident(*name),
            Some(TokenKind::Keyword(Keyword::Crate)) => PathSegment::Crate,
            Some(TokenKind::Keyword(Keyword::Super)) => PathSegment::Super,
            Some(TokenKind::Keyword(Keyword::SelfValue)) => PathSegment::SelfModule,
            _ => return Err(self.error_expected("path segment")),
        };
        self.pos += 1;
        Ok(segment)
    }

    fn starts_path_segment(token: Option<&Token>) -> bool {
        matches!(
            token.map(|token| &token.kind),
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Keyword(Keyword::Crate | Keyword::Super | Keyword::SelfValue)
            )
        )
    }

    /// Parses `a::b::c`
    ///
    /// # Errors
    ///
    /// `ParseError` if no path segment is found.
    pub fn parse_path(&mut self) -> Result<Path, ParseError> {
        let start = self.current_span();
        let mut segments = vec![self.parse_path_segment()?];
        while self.check_punct(Punct::ColonColon) && Self::starts_path_segment(self.peek_nth(1)) {
            self.pos += 1;
            segments.push(self.parse_path_segment()?);
        }
        Ok(Path {
            segments,
            span: self.span_from(start),
        })
    }

    /// Collects the tokens of a delimited macro input, without the outer
    /// delimiters
    fn parse_macro_input(&mut self) -> Result<TokenStream, ParseError> {
        let open = self.next_token()?;
        let TokenKind::Open(delim) = open.kind else {
            return Err(ParseError::unexpected(
                "`(`, `[` or `{`",
                open.kind.describe(self.interner),
                open.span,
            ));
        };

        let start = self.pos;
        let mut depth = 1usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Open(_) => depth += 1,
                TokenKind::Close(_) => {
                    depth -= 1;
                    if depth == 0 {
                        let input = self.tokens[start..self.pos].to_vec();
                        self.pos += 1;
                        return Ok(TokenStream { tokens: input });
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(ParseError::unclosed(delim.open(), open.span))
    }

    /// Parses items until the end of input
    ///
    /// # Errors
    ///
    /// Stops at the first `ParseError`.
    pub fn parse_items(&mut self) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        while !self.is_eof() {
            if self.eat_punct(Punct::Semi) {
                continue;
            }
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    /// Parses one item
    ///
    /// # Errors
    ///
    /// `ParseError` on malformed input.
    pub fn parse_item(&mut self) -> Result<Item, ParseError> {
        self.reject_attribute()?;
        let start = self.current_span();
        let visibility = if self.eat_keyword(Keyword::Pub) {
            Visibility::Public
        } else {
            Visibility::Private
        };

        let kind = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Keyword(Keyword::Fn)) => ItemKind::Fn(self.parse_fn(false)?),
            Some(TokenKind::Keyword(Keyword::Const)) => {
                if self
                    .peek_nth(1)
                    .is_some_and(|token| token.is_keyword(Keyword::Fn))
                {
                    self.pos += 1;
                    ItemKind::Fn(self.parse_fn(true)?)
                } else {
                    ItemKind::Const(self.parse_const()?)
                }
            }
            Some(TokenKind::Keyword(Keyword::Mod)) => ItemKind::Mod(self.parse_mod()?),
            Some(TokenKind::Keyword(Keyword::Use)) => {
                self.pos += 1;
                let mut entries = Vec::new();
                self.parse_use_tree(&[], &mut entries)?;
                self.expect_punct(Punct::Semi)?;
                ItemKind::Use(entries)
            }
            Some(
                TokenKind::Ident(_)
                | TokenKind::Keyword(Keyword::Crate | Keyword::Super | Keyword::SelfValue),
            ) => {
                let path = self.parse_path()?;
                self.expect_punct(Punct::Bang)?;
                let input = self.parse_macro_input()?;
                let span = self.span_from(path.span);
                self.eat_punct(Punct::Semi);
                ItemKind::MacroCall(MacroCall { path, input, span })
            }
            _ => return Err(self.error_expected("item")),
        };

        Ok(Item {
            visibility,
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_fn(&mut self, is_const: bool) -> Result<FnDecl, ParseError> {
        self.expect_keyword(Keyword::Fn)?;
        let (name, name_span) = self.parse_ident()?;

        self.expect_open(Delimiter::Paren)?;
        let mut params = Vec::new();
        while !self.eat_close(Delimiter::Paren) {
            let (param, span) = self.parse_ident()?;
            params.push(Param { name: param, span });
            if !self.eat_punct(Punct::Comma) {
                self.expect_close(Delimiter::Paren)?;
                break;
            }
        }

        let mut body = Body::new(self.current_span());
        body.root = self.parse_block(&mut body)?;
        Ok(FnDecl {
            name,
            name_span,
            is_const,
            params,
            body,
        })
    }

    fn parse_const(&mut self) -> Result<ConstDecl, ParseError> {
        self.expect_keyword(Keyword::Const)?;
        let (name, name_span) = self.parse_ident()?;
        self.expect_punct(Punct::Eq)?;
        let mut body = Body::new(self.current_span());
        body.root = self.parse_expr(&mut body)?;
        self.expect_punct(Punct::Semi)?;
        Ok(ConstDecl {
            name,
            name_span,
            body,
        })
    }

    fn parse_mod(&mut self) -> Result<ModDecl, ParseError> {
        self.expect_keyword(Keyword::Mod)?;
        let (name, name_span) = self.parse_ident()?;
        if self.eat_punct(Punct::Semi) {
            return Ok(ModDecl {
                name,
                name_span,
                content: ModContent::External,
            });
        }

        self.expect_open(Delimiter::Brace)?;
        let mut items = Vec::new();
        while !self.eat_close(Delimiter::Brace) {
            if self.is_eof() {
                return Err(self.error_expected("`}`"));
            }
            if self.eat_punct(Punct::Semi) {
                continue;
            }
            items.push(self.nested(Self::parse_item)?);
        }
        Ok(ModDecl {
            name,
            name_span,
            content: ModContent::Inline(items),
        })
    }

    /// Flattens `a::{b, c::d as e}` into one entry per imported name
    fn parse_use_tree(
        &mut self,
        prefix: &[PathSegment],
        out: &mut Vec<UseEntry>,
    ) -> Result<(), ParseError> {
        let start = self.current_span();
        let mut segments = prefix.to_vec();
        loop {
            if self.check_open(Delimiter::Brace) {
                self.pos += 1;
                while !self.eat_close(Delimiter::Brace) {
                    self.nested(|parser| parser.parse_use_tree(&segments, out))?;
                    if !self.eat_punct(Punct::Comma) {
                        self.expect_close(Delimiter::Brace)?;
                        break;
                    }
                }
                return Ok(());
            }
            segments.push(self.parse_path_segment()?);
            if !self.eat_punct(Punct::ColonColon) {
                break;
            }
        }

        if segments.len() > 1 && segments.last() == Some(&PathSegment::SelfModule) {
            segments.pop();
        }
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.parse_ident()?.0)
        } else {
            None
        };
        let span = self.span_from(start);
        if alias.is_none() && !matches!(segments.last(), Some(PathSegment::Ident(_))) {
            return Err(ParseError::invalid_syntax(
                "use path",
                Some("imports of `crate`, `self` or `super` need an `as` name".to_string()),
                span,
            ));
        }
        out.push(UseEntry {
            path: Path { segments, span },
            alias,
            span,
        });
        Ok(())
    }

    /// Parses exactly one expression and returns the tokens it spans
    ///
    /// Macros use this to forward an argument expression unchanged.
    ///
    /// # Errors
    ///
    /// `ParseError` if no valid expression starts here.
    pub fn parse_expr_tokens(&mut self) -> Result<TokenStream, ParseError> {
        let start = self.pos;
        let mut scratch = Body::new(self.current_span());
        self.parse_expr(&mut scratch)?;
        Ok(self.tokens[start..self.pos].iter().cloned().collect())
    }

    /// Parses one expression into `body`
    ///
    /// # Errors
    ///
    /// `ParseError` on malformed input.
    pub fn parse_expr(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        self.nested(|parser| parser.parse_assign(body))
    }

    fn parse_assign(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let target = self.parse_binary(body, 0)?;
        let op = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Punct(punct)) => match punct {
                Punct::Eq => None,
                Punct::PlusEq => Some(BinaryOp::Add),
                Punct::MinusEq => Some(BinaryOp::Sub),
                Punct::StarEq => Some(BinaryOp::Mul),
                Punct::SlashEq => Some(BinaryOp::Div),
                Punct::PercentEq => Some(BinaryOp::Rem),
                _ => return Ok(target),
            },
            _ => return Ok(target),
        };
        self.pos += 1;

        if !matches!(
            body.expr(target),
            Expr::Path { .. } | Expr::Index { .. } | Expr::Field { .. }
        ) {
            return Err(ParseError::invalid_syntax(
                "assignment target",
                Some("only variables, fields and indexes can be assigned".to_string()),
                body.expr(target).span(),
            ));
        }

        let value = self.nested(|parser| parser.parse_assign(body))?;
        Ok(body.alloc_expr(Expr::Assign {
            op,
            target,
            value,
            span: self.span_from(start),
        }))
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let TokenKind::Punct(punct) = self.peek()?.kind else {
            return None;
        };
        Some(match punct {
            Punct::Plus => BinaryOp::Add,
            Punct::Minus => BinaryOp::Sub,
            Punct::Star => BinaryOp::Mul,
            Punct::Slash => BinaryOp::Div,
            Punct::Percent => BinaryOp::Rem,
            Punct::EqEq => BinaryOp::Eq,
            Punct::Ne => BinaryOp::Ne,
            Punct::Lt => BinaryOp::Lt,
            Punct::Le => BinaryOp::Le,
            Punct::Gt => BinaryOp::Gt,
            Punct::Ge => BinaryOp::Ge,
            Punct::AndAnd => BinaryOp::And,
            Punct::OrOr => BinaryOp::Or,
            Punct::Amp => BinaryOp::BitAnd,
            Punct::Pipe => BinaryOp::BitOr,
            Punct::Caret => BinaryOp::BitXor,
            Punct::Shl => BinaryOp::Shl,
            Punct::Shr => BinaryOp::Shr,
            _ => return None,
        })
    }

    /// Precedence climbing; operators of equal precedence associate left
    fn parse_binary(&mut self, body: &mut Body, min_precedence: u8) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let mut lhs = self.parse_unary(body)?;
        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_binary(body, precedence)?;
            lhs = body.alloc_expr(Expr::Binary {
                op,
                lhs,
                rhs,
                span: self.span_from(start),
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let op = if self.eat_punct(Punct::Minus) {
            UnaryOp::Neg
        } else if self.eat_punct(Punct::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_postfix(body);
        };
        let operand = self.nested(|parser| parser.parse_unary(body))?;
        Ok(body.alloc_expr(Expr::Unary {
            op,
            operand,
            span: self.span_from(start),
        }))
    }

    fn parse_postfix(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        let mut expr = self.parse_primary(body)?;
        loop {
            if self.check_open(Delimiter::Paren) {
                self.pos += 1;
                let args = self.parse_comma_list(body, Delimiter::Paren)?;
                expr = body.alloc_expr(Expr::Call {
                    callee: expr,
                    args,
                    span: self.span_from(start),
                });
            } else if self.check_open(Delimiter::Bracket) {
                self.pos += 1;
                let index = self.parse_expr(body)?;
                self.expect_close(Delimiter::Bracket)?;
                expr = body.alloc_expr(Expr::Index {
                    base: expr,
                    index,
                    span: self.span_from(start),
                });
            } else if self.eat_punct(Punct::Dot) {
                let name = match self.peek().map(|token| &token.kind) {
                    Some(TokenKind::Ident(name)) => *name,
                    Some(TokenKind::Integer(index)) => self.interner.intern(&index.to_string()),
                    _ => return Err(self.error_expected("field or method name")),
                };
                self.pos += 1;
                if self.check_open(Delimiter::Paren) {
                    self.pos += 1;
                    let args = self.parse_comma_list(body, Delimiter::Paren)?;
                    expr = body.alloc_expr(Expr::MethodCall {
                        receiver: expr,
                        method: name,
                        args,
                        span: self.span_from(start),
                    });
                } else {
                    expr = body.alloc_expr(Expr::Field {
                        base: expr,
                        field: name,
                        span: self.span_from(start),
                    });
                }
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses `a, b, c)` after the opening delimiter was consumed
    fn parse_comma_list(
        &mut self,
        body: &mut Body,
        delim: Delimiter,
    ) -> Result<Vec<ExprId>, ParseError> {
        let mut elements = Vec::new();
        while !self.eat_close(delim) {
            elements.push(self.parse_expr(body)?);
            if !self.eat_punct(Punct::Comma) {
                self.expect_close(delim)?;
                break;
            }
        }
        Ok(elements)
    }

    fn starts_expr(&self) -> bool {
        !matches!(
            self.peek().map(|token| &token.kind),
            None | Some(
                TokenKind::Close(_)
                    | TokenKind::Punct(Punct::Semi | Punct::Comma | Punct::FatArrow)
            )
        )
    }

    fn literal(body: &mut Body, kind: LiteralKind, span: FileSpan) -> ExprId {
        body.alloc_expr(Expr::Literal { kind, span })
    }

    fn parse_primary(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::eof("expression", self.end));
        };
        let start = token.span;

        match &token.kind {
            TokenKind::Integer(value) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Integer(*value), start))
            }
            TokenKind::Float(value) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Float(*value), start))
            }
            TokenKind::Str(value) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Str(value.clone()), start))
            }
            TokenKind::Char(value) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Char(*value), start))
            }
            TokenKind::Byte(value) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Byte(*value), start))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Bool(true), start))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.pos += 1;
                Ok(Self::literal(body, LiteralKind::Bool(false), start))
            }
            TokenKind::Template(raw) => {
                self.pos += 1;
                let parts = self.parse_template(body, raw, start)?;
                Ok(body.alloc_expr(Expr::Template { parts, span: start }))
            }
            TokenKind::Ident(_)
            | TokenKind::Keyword(Keyword::Crate | Keyword::Super | Keyword::SelfValue) => {
                let path = self.parse_path()?;
                let is_macro = self.check_punct(Punct::Bang)
                    && matches!(
                        self.peek_nth(1).map(|token| &token.kind),
                        Some(TokenKind::Open(_))
                    );
                if is_macro {
                    self.pos += 1;
                    let input = self.parse_macro_input()?;
                    Ok(body.alloc_expr(Expr::MacroCall(MacroCall {
                        path,
                        input,
                        span: self.span_from(start),
                    })))
                } else {
                    let span = path.span;
                    Ok(body.alloc_expr(Expr::Path { path, span }))
                }
            }
            TokenKind::Open(Delimiter::Paren) => {
                self.pos += 1;
                if self.eat_close(Delimiter::Paren) {
                    return Ok(Self::literal(body, LiteralKind::Unit, self.span_from(start)));
                }
                let first = self.parse_expr(body)?;
                if self.eat_close(Delimiter::Paren) {
                    return Ok(body.alloc_expr(Expr::Paren {
                        inner: first,
                        span: self.span_from(start),
                    }));
                }
                self.expect_punct(Punct::Comma)?;
                let mut elements = vec![first];
                elements.extend(self.parse_comma_list(body, Delimiter::Paren)?);
                Ok(body.alloc_expr(Expr::Tuple {
                    elements,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Open(Delimiter::Bracket) => {
                self.pos += 1;
                let elements = self.parse_comma_list(body, Delimiter::Bracket)?;
                Ok(body.alloc_expr(Expr::Vec {
                    elements,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Punct(Punct::Pound) => {
                self.pos += 1;
                self.expect_open(Delimiter::Brace)?;
                let mut fields = Vec::new();
                while !self.eat_close(Delimiter::Brace) {
                    let key = match self.peek().map(|token| &token.kind) {
                        Some(TokenKind::Ident(name)) => *name,
                        Some(TokenKind::Str(name)) => self.interner.intern(name),
                        _ => return Err(self.error_expected("object key")),
                    };
                    self.pos += 1;
                    self.expect_punct(Punct::Colon)?;
                    fields.push((key, self.parse_expr(body)?));
                    if !self.eat_punct(Punct::Comma) {
                        self.expect_close(Delimiter::Brace)?;
                        break;
                    }
                }
                Ok(body.alloc_expr(Expr::Object {
                    fields,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Open(Delimiter::Brace) => self.parse_block(body),
            TokenKind::Keyword(Keyword::If) => self.parse_if(body),
            TokenKind::Keyword(Keyword::While) => {
                self.pos += 1;
                let condition = self.parse_expr(body)?;
                let inner = self.parse_block(body)?;
                Ok(body.alloc_expr(Expr::While {
                    condition,
                    body: inner,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(Keyword::Loop) => {
                self.pos += 1;
                let inner = self.parse_block(body)?;
                Ok(body.alloc_expr(Expr::Loop {
                    body: inner,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.pos += 1;
                let value = if self.starts_expr() {
                    Some(self.parse_expr(body)?)
                } else {
                    None
                };
                Ok(body.alloc_expr(Expr::Break {
                    value,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.pos += 1;
                Ok(body.alloc_expr(Expr::Continue { span: start }))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.pos += 1;
                let value = if self.starts_expr() {
                    Some(self.parse_expr(body)?)
                } else {
                    None
                };
                Ok(body.alloc_expr(Expr::Return {
                    value,
                    span: self.span_from(start),
                }))
            }
            _ => Err(self.error_expected("expression")),
        }
    }

    fn parse_if(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let start = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expr(body)?;
        let then_branch = self.parse_block(body)?;
        let else_branch = if self.eat_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                Some(self.nested(|parser| parser.parse_if(body))?)
            } else {
                Some(self.parse_block(body)?)
            }
        } else {
            None
        };
        Ok(body.alloc_expr(Expr::If {
            condition,
            then_branch,
            else_branch,
            span: self.span_from(start),
        }))
    }

    fn parse_block(&mut self, body: &mut Body) -> Result<ExprId, ParseError> {
        let start = self.expect_open(Delimiter::Brace)?;
        let mut stmts = Vec::new();
        let mut tail = None;

        loop {
            if self.eat_close(Delimiter::Brace) {
                break;
            }
            if self.eat_punct(Punct::Semi) {
                continue;
            }

            self.reject_attribute()?;
            let stmt_start = self.current_span();
            if self.eat_keyword(Keyword::Let) {
                let (name, name_span) = self.parse_ident()?;
                let value = if self.eat_punct(Punct::Eq) {
                    self.parse_expr(body)?
                } else {
                    Self::literal(body, LiteralKind::Unit, name_span)
                };
                self.expect_punct(Punct::Semi)?;
                let span = self.span_from(stmt_start);
                stmts.push(body.alloc_stmt(Stmt::Let { name, value, span }));
                continue;
            }

            let expr = self.parse_expr(body)?;
            if self.eat_punct(Punct::Semi) {
                let span = self.span_from(stmt_start);
                stmts.push(body.alloc_stmt(Stmt::Expr { expr, span }));
            } else if self.eat_close(Delimiter::Brace) {
                tail = Some(expr);
                break;
            } else if body.expr(expr).is_block_like() {
                let span = self.span_from(stmt_start);
                stmts.push(body.alloc_stmt(Stmt::Expr { expr, span }));
            } else {
                return Err(self.error_expected("`;` or `}`"));
            }
        }

        Ok(body.alloc_expr(Expr::Block {
            stmts,
            tail,
            span: self.span_from(start),
        }))
    }

    fn parse_template(
        &mut self,
        body: &mut Body,
        raw: &str,
        span: FileSpan,
    ) -> Result<Vec<TemplatePart>, ParseError> {
        let base = span.span.start + 1;
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            match ch {
                '\\' => text.push(decode_escape(&mut chars, span, "template")?),
                '{' => {
                    let start = index + 1;
                    let mut depth = 1usize;
                    let mut in_string = false;
                    let mut end = None;
                    while let Some((inner, c)) = chars.next() {
                        match c {
                            '\\' if in_string => {
                                chars.next();
                            }
                            '"' => in_string = !in_string,
                            '{' if !in_string => depth += 1,
                            '}' if !in_string => {
                                depth -= 1;
                                if depth == 0 {
                                    end = Some(inner);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let Some(end) = end else {
                        return Err(ParseError::invalid_literal(
                            "template",
                            "unclosed `{` in template",
                            span,
                        ));
                    };

                    let source = &raw[start..end];
                    if source.trim().is_empty() {
                        return Err(ParseError::invalid_literal(
                            "template",
                            "empty expression in template",
                            span,
                        ));
                    }
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(mem::take(&mut text)));
                    }

                    let offset = base.saturating_add(u32::try_from(start).unwrap_or(u32::MAX));
                    let tokens = lex_at(span.file, source, offset, self.interner)?;
                    let mut inner = Parser::new(&tokens.tokens, self.interner).with_end_span(span);
                    inner.depth = self.depth;
                    let id = inner.parse_expr(body)?;
                    inner.expect_eof()?;
                    parts.push(TemplatePart::Expr(id));
                }
                '}' => {
                    return Err(ParseError::invalid_literal(
                        "template",
                        "unmatched `}` in template",
                        span,
                    ));
                }
                _ => text.push(ch),
            }
        }

        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(parts)
    }
}
