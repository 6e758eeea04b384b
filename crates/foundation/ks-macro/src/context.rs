//! State handed to native macro implementations

use crate::MacroError;
use ks_intern::{Interner, Symbol};
use ks_parser::Parser;
use ks_span::{FileId, FileSpan};
use ks_syntax::{Delimiter, Keyword, Punct, Token, TokenKind, TokenStream};

/// Invocation context passed to a native macro
///
/// Tokens built through the context carry the invocation span, so errors in
/// generated code point back at the macro call.
pub struct MacroContext<'a> {
    span: FileSpan,
    interner: &'a Interner,
}

impl<'a> MacroContext<'a> {
    /// Creates a context for one invocation
    #[must_use]
    pub fn new(span: FileSpan, interner: &'a Interner) -> Self {
        Self { span, interner }
    }

    /// Span of the whole invocation
    #[must_use]
    pub fn span(&self) -> FileSpan {
        self.span
    }

    /// Shared interner
    #[must_use]
    pub fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// Resolves a symbol to its text
    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> String {
        self.interner.resolve(&sym)
    }

    /// Parser over `input`; end-of-input errors point at the invocation
    #[must_use]
    pub fn parser<'s>(&'s self, input: &'s TokenStream) -> Parser<'s> {
        Parser::new(&input.tokens, self.interner).with_end_span(self.span)
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span)
    }

    /// Identifier token
    #[must_use]
    pub fn ident(&self, name: &str) -> Token {
        self.token(TokenKind::Ident(self.interner.intern(name)))
    }

    /// Keyword token
    #[must_use]
    pub fn keyword(&self, keyword: Keyword) -> Token {
        self.token(TokenKind::Keyword(keyword))
    }

    /// Integer literal token
    #[must_use]
    pub fn integer(&self, value: i64) -> Token {
        self.token(TokenKind::Integer(value))
    }

    /// String literal token
    #[must_use]
    pub fn string(&self, value: impl Into<String>) -> Token {
        self.token(TokenKind::Str(value.into()))
    }

    /// Punctuation token
    #[must_use]
    pub fn punct(&self, punct: Punct) -> Token {
        self.token(TokenKind::Punct(punct))
    }

    /// Wraps `stream` in a delimiter
    #[must_use]
    pub fn group(&self, delimiter: Delimiter, stream: TokenStream) -> TokenStream {
        stream.delimited(delimiter, self.span)
    }

    /// Lexes a snippet of source text into tokens spanning the invocation
    ///
    /// # Errors
    ///
    /// `MacroError::Failed` if the snippet does not lex.
    pub fn quote(&self, source: &str) -> Result<TokenStream, MacroError> {
        let tokens = ks_parser::lex(FileId::SYNTHETIC, source, self.interner).map_err(|err| {
            MacroError::Failed {
                message: format!("invalid quoted tokens: {err}"),
                span: self.span,
            }
        })?;
        Ok(tokens
            .into_iter()
            .map(|token| self.token(token.kind))
            .collect())
    }

    /// Error reported at `span`
    #[must_use]
    pub fn error(&self, span: FileSpan, message: impl Into<String>) -> MacroError {
        MacroError::Failed {
            message: message.into(),
            span,
        }
    }
}
