//! Lexical tokens and token streams

use derive_more::Display;
use ks_intern::{Interner, Symbol};
use ks_span::FileSpan;
use std::vec;

/// Delimiter of a bracketed group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// Parentheses (...)
    Paren,
    /// Brackets [...]
    Bracket,
    /// Braces {...}
    Brace,
}

impl Delimiter {
    /// Opening character
    #[must_use]
    pub fn open(self) -> char {
        match self {
            Self::Paren => '(',
            Self::Bracket => '[',
            Self::Brace => '{',
        }
    }

    /// Closing character
    #[must_use]
    pub fn close(self) -> char {
        match self {
            Self::Paren => ')',
            Self::Bracket => ']',
            Self::Brace => '}',
        }
    }
}

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Keyword {
    /// `as`
    #[display("as")]
    As,
    /// `break`
    #[display("break")]
    Break,
    /// `const`
    #[display("const")]
    Const,
    /// `continue`
    #[display("continue")]
    Continue,
    /// `crate`
    #[display("crate")]
    Crate,
    /// `else`
    #[display("else")]
    Else,
    /// `false`
    #[display("false")]
    False,
    /// `fn`
    #[display("fn")]
    Fn,
    /// `if`
    #[display("if")]
    If,
    /// `let`
    #[display("let")]
    Let,
    /// `loop`
    #[display("loop")]
    Loop,
    /// `mod`
    #[display("mod")]
    Mod,
    /// `pub`
    #[display("pub")]
    Pub,
    /// `return`
    #[display("return")]
    Return,
    /// `self`
    #[display("self")]
    SelfValue,
    /// `super`
    #[display("super")]
    Super,
    /// `true`
    #[display("true")]
    True,
    /// `use`
    #[display("use")]
    Use,
    /// `while`
    #[display("while")]
    While,
}

/// Punctuation and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Punct {
    /// `+`
    #[display("+")]
    Plus,
    /// `-`
    #[display("-")]
    Minus,
    /// `*`
    #[display("*")]
    Star,
    /// `/`
    #[display("/")]
    Slash,
    /// `%`
    #[display("%")]
    Percent,
    /// `=`
    #[display("=")]
    Eq,
    /// `==`
    #[display("==")]
    EqEq,
    /// `!=`
    #[display("!=")]
    Ne,
    /// `<`
    #[display("<")]
    Lt,
    /// `>`
    #[display(">")]
    Gt,
    /// `<=`
    #[display("<=")]
    Le,
    /// `>=`
    #[display(">=")]
    Ge,
    /// `&&`
    #[display("&&")]
    AndAnd,
    /// `||`
    #[display("||")]
    OrOr,
    /// `!`
    #[display("!")]
    Bang,
    /// `&`
    #[display("&")]
    Amp,
    /// `|`
    #[display("|")]
    Pipe,
    /// `^`
    #[display("^")]
    Caret,
    /// `<<`
    #[display("<<")]
    Shl,
    /// `>>`
    #[display(">>")]
    Shr,
    /// `+=`
    #[display("+=")]
    PlusEq,
    /// `-=`
    #[display("-=")]
    MinusEq,
    /// `*=`
    #[display("*=")]
    StarEq,
    /// `/=`
    #[display("/=")]
    SlashEq,
    /// `%=`
    #[display("%=")]
    PercentEq,
    /// `::`
    #[display("::")]
    ColonColon,
    /// `:`
    #[display(":")]
    Colon,
    /// `;`
    #[display(";")]
    Semi,
    /// `,`
    #[display(",")]
    Comma,
    /// `.`
    #[display(".")]
    Dot,
    /// `#`
    #[display("#")]
    Pound,
    /// `->`
    #[display("->")]
    Arrow,
    /// `=>`
    #[display("=>")]
    FatArrow,
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier
    Ident(Symbol),
    /// Keyword
    Keyword(Keyword),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal (escapes already decoded)
    Str(String),
    /// Character literal
    Char(char),
    /// Byte literal, `b'a'`
    Byte(u8),
    /// Template string; raw text between the backticks, escapes not decoded
    Template(String),
    /// Opening delimiter
    Open(Delimiter),
    /// Closing delimiter
    Close(Delimiter),
    /// Punctuation
    Punct(Punct),
}

impl TokenKind {
    /// Renders the token as source text
    #[must_use]
    pub fn to_source(&self, interner: &Interner) -> String {
        match self {
            Self::Ident(sym) => interner.resolve(sym),
            Self::Keyword(keyword) => keyword.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format_float(*value),
            Self::Str(text) => format!("{text:?}"),
            Self::Char(ch) => format!("{ch:?}"),
            Self::Byte(byte) => format_byte(*byte),
            Self::Template(raw) => format!("`{raw}`"),
            Self::Open(delim) => delim.open().to_string(),
            Self::Close(delim) => delim.close().to_string(),
            Self::Punct(punct) => punct.to_string(),
        }
    }

    /// Short human-readable description used in diagnostics
    #[must_use]
    pub fn describe(&self, interner: &Interner) -> String {
        match self {
            Self::Ident(sym) => format!("identifier `{}`", interner.resolve(sym)),
            Self::Integer(_) | Self::Float(_) => "number".to_string(),
            Self::Str(_) => "string literal".to_string(),
            Self::Char(_) => "char literal".to_string(),
            Self::Byte(_) => "byte literal".to_string(),
            Self::Template(_) => "template string".to_string(),
            other => format!("`{}`", other.to_source(interner)),
        }
    }
}

/// Formats a float so that it always reads back as a float
#[must_use]
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

/// Formats a byte as a `b'..'` literal
#[must_use]
pub fn format_byte(value: u8) -> String {
    format!("b'{}'", value.escape_ascii())
}

/// Token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What the token is
    pub kind: TokenKind,
    /// Where it came from
    pub span: FileSpan,
}

impl Token {
    /// Creates a new token
    #[must_use]
    pub fn new(kind: TokenKind, span: FileSpan) -> Self {
        Self { kind, span }
    }

    /// True if this token is the given punctuation
    #[must_use]
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    /// True if this token is the given keyword
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

/// Token stream (flat sequence of tokens, delimiters included)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenStream {
    /// Tokens in the stream
    pub tokens: Vec<Token>,
}

impl TokenStream {
    /// Create a new empty token stream
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Push a token to the stream
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Push a token built from its kind
    pub fn push_kind(&mut self, kind: TokenKind, span: FileSpan) {
        self.tokens.push(Token::new(kind, span));
    }

    /// Extend with another token stream
    pub fn extend(&mut self, other: TokenStream) {
        self.tokens.extend(other.tokens);
    }

    /// Wraps the stream in the given delimiter
    #[must_use]
    pub fn delimited(self, delimiter: Delimiter, span: FileSpan) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 2);
        tokens.push(Token::new(TokenKind::Open(delimiter), span));
        tokens.extend(self.tokens);
        tokens.push(Token::new(TokenKind::Close(delimiter), span));
        Self { tokens }
    }

    /// Get the number of tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the stream is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over tokens
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Span covering the whole stream, if it has tokens
    #[must_use]
    pub fn span(&self) -> Option<FileSpan> {
        let first = self.tokens.first()?;
        let last = self.tokens.last()?;
        Some(first.span.join(last.span))
    }

    /// Renders the stream back to source text, one space between tokens
    /// except around delimiters, `::` and before `,`/`;`
    #[must_use]
    pub fn to_source(&self, interner: &Interner) -> String {
        let mut out = String::new();
        let mut previous: Option<&TokenKind> = None;
        for token in &self.tokens {
            if let Some(prev) = previous {
                if needs_space(prev, &token.kind) {
                    out.push(' ');
                }
            }
            out.push_str(&token.kind.to_source(interner));
            previous = Some(&token.kind);
        }
        out
    }
}

fn needs_space(prev: &TokenKind, next: &TokenKind) -> bool {
    !matches!(
        (prev, next),
        (TokenKind::Open(_), _)
            | (_, TokenKind::Close(_))
            | (TokenKind::Punct(Punct::ColonColon), _)
            | (_, TokenKind::Punct(Punct::ColonColon | Punct::Comma | Punct::Semi | Punct::Dot))
            | (TokenKind::Punct(Punct::Dot | Punct::Pound | Punct::Bang), _)
            | (TokenKind::Ident(_), TokenKind::Punct(Punct::Bang) | TokenKind::Open(Delimiter::Paren | Delimiter::Bracket))
    )
}

impl From<Token> for TokenStream {
    fn from(token: Token) -> Self {
        Self {
            tokens: vec![token],
        }
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TokenStream {
    type Item = Token;
    type IntoIter = vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_source_spaces_operators_not_delimiters() {
        let interner = Interner::new();
        let span = FileSpan::synthetic();
        let mut stream = TokenStream::new();
        stream.push_kind(TokenKind::Integer(0), span);
        let mut stream = stream.delimited(Delimiter::Paren, span);
        stream.push_kind(TokenKind::Punct(Punct::Plus), span);
        stream.push_kind(TokenKind::Integer(10), span);

        assert_eq!(stream.to_source(&interner), "(0) + 10");
    }

    #[test]
    fn macro_call_renders_without_gap() {
        let interner = Interner::new();
        let span = FileSpan::synthetic();
        let stream: TokenStream = [
            TokenKind::Ident(interner.intern("stringify")),
            TokenKind::Punct(Punct::Bang),
            TokenKind::Open(Delimiter::Paren),
            TokenKind::Str("a".to_string()),
            TokenKind::Close(Delimiter::Paren),
        ]
        .into_iter()
        .map(|kind| Token::new(kind, span))
        .collect();

        assert_eq!(stream.to_source(&interner), "stringify!(\"a\")");
    }

    #[test]
    fn floats_keep_their_point() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(2.5), "2.5");
    }

    #[test]
    fn bytes_render_as_byte_literals() {
        assert_eq!(format_byte(b'a'), "b'a'");
        assert_eq!(format_byte(b'\''), r"b'\''");
        assert_eq!(format_byte(b'\n'), r"b'\n'");
        assert_eq!(format_byte(0x7f), r"b'\x7f'");
    }
}
