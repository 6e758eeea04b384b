//! Lexical analysis using logos
//!
//! Whitespace and comments are skipped. Delimiters are checked for balance
//! here so the parser can assume every group is closed.

use crate::ParseError;
use ks_intern::Interner;
use ks_span::{FileId, FileSpan, Span};
use ks_syntax::{Delimiter, Keyword, Punct, Token, TokenKind, TokenStream};
use logos::Logos;
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum RawToken {
    #[token("as")]
    As,
    #[token("break")]
    Break,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("crate")]
    Crate,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("fn")]
    Fn,
    #[token("if")]
    If,
    #[token("let")]
    Let,
    #[token("loop")]
    Loop,
    #[token("mod")]
    Mod,
    #[token("pub")]
    Pub,
    #[token("return")]
    Return,
    #[token("self")]
    SelfValue,
    #[token("super")]
    Super,
    #[token("true")]
    True,
    #[token("use")]
    Use,
    #[token("while")]
    While,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
    #[regex(r"[0-9][0-9_]*")]
    #[regex(r"0x[0-9a-fA-F_]+")]
    #[regex(r"0b[01_]+")]
    #[regex(r"0o[0-7_]+")]
    Integer,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Float,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"'([^'\\]|\\.|\\x[0-9a-fA-F]{2}|\\u\{[0-9a-fA-F]+\})'")]
    Char,
    #[regex(r"b'([^'\\]|\\.|\\x[0-9a-fA-F]{2})'")]
    Byte,
    #[regex(r"`([^`\\]|\\.)*`")]
    Template,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("#")]
    Pound,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
}

impl RawToken {
    fn keyword(self) -> Option<Keyword> {
        Some(match self {
            Self::As => Keyword::As,
            Self::Break => Keyword::Break,
            Self::Const => Keyword::Const,
            Self::Continue => Keyword::Continue,
            Self::Crate => Keyword::Crate,
            Self::Else => Keyword::Else,
            Self::False => Keyword::False,
            Self::Fn => Keyword::Fn,
            Self::If => Keyword::If,
            Self::Let => Keyword::Let,
            Self::Loop => Keyword::Loop,
            Self::Mod => Keyword::Mod,
            Self::Pub => Keyword::Pub,
            Self::Return => Keyword::Return,
            Self::SelfValue => Keyword::SelfValue,
            Self::Super => Keyword::Super,
            Self::True => Keyword::True,
            Self::Use => Keyword::Use,
            Self::While => Keyword::While,
            _ => return None,
        })
    }

    fn punct(self) -> Option<Punct> {
        Some(match self {
            Self::Plus => Punct::Plus,
            Self::Minus => Punct::Minus,
            Self::Star => Punct::Star,
            Self::Slash => Punct::Slash,
            Self::Percent => Punct::Percent,
            Self::Eq => Punct::Eq,
            Self::EqEq => Punct::EqEq,
            Self::Ne => Punct::Ne,
            Self::Lt => Punct::Lt,
            Self::Gt => Punct::Gt,
            Self::Le => Punct::Le,
            Self::Ge => Punct::Ge,
            Self::AndAnd => Punct::AndAnd,
            Self::OrOr => Punct::OrOr,
            Self::Bang => Punct::Bang,
            Self::Amp => Punct::Amp,
            Self::Pipe => Punct::Pipe,
            Self::Caret => Punct::Caret,
            Self::Shl => Punct::Shl,
            Self::Shr => Punct::Shr,
            Self::PlusEq => Punct::PlusEq,
            Self::MinusEq => Punct::MinusEq,
            Self::StarEq => Punct::StarEq,
            Self::SlashEq => Punct::SlashEq,
            Self::PercentEq => Punct::PercentEq,
            Self::ColonColon => Punct::ColonColon,
            Self::Colon => Punct::Colon,
            Self::Semi => Punct::Semi,
            Self::Comma => Punct::Comma,
            Self::Dot => Punct::Dot,
            Self::Pound => Punct::Pound,
            Self::Arrow => Punct::Arrow,
            Self::FatArrow => Punct::FatArrow,
            _ => return None,
        })
    }
}

/// Tokenizes `source`
///
/// # Errors
///
/// Returns `ParseError` for unknown input, malformed literals and
/// unbalanced delimiters.
pub fn lex(file: FileId, source: &str, interner: &Interner) -> Result<TokenStream, ParseError> {
    lex_at(file, source, 0, interner)
}

/// Tokenizes `source` as if it started at byte `base` of `file`
///
/// Used for the expressions embedded in template strings.
///
/// # Errors
///
/// Same as [`lex`].
pub fn lex_at(
    file: FileId,
    source: &str,
    base: u32,
    interner: &Interner,
) -> Result<TokenStream, ParseError> {
    let mut stream = TokenStream::new();
    let mut open: Vec<(Delimiter, FileSpan)> = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = token_span(file, base, lexer.span(), source.len())?;
        let slice = lexer.slice();
        let Ok(raw) = result else {
            return Err(ParseError::invalid_token(slice, span));
        };

        let kind = match raw {
            RawToken::Ident => TokenKind::Ident(interner.intern(slice)),
            RawToken::Integer => TokenKind::Integer(parse_integer(slice, span)?),
            RawToken::Float => {
                let cleaned = slice.replace('_', "");
                let value = cleaned
                    .parse::<f64>()
                    .map_err(|err| ParseError::invalid_literal("float", err.to_string(), span))?;
                TokenKind::Float(value)
            }
            RawToken::Str => {
                let content = &slice[1..slice.len() - 1];
                TokenKind::Str(unescape(content, span, "string")?)
            }
            RawToken::Char => {
                let content = &slice[1..slice.len() - 1];
                let decoded = unescape(content, span, "char")?;
                let mut chars = decoded.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => TokenKind::Char(ch),
                    _ => {
                        return Err(ParseError::invalid_literal(
                            "char",
                            "expected exactly one character",
                            span,
                        ));
                    }
                }
            }
            RawToken::Byte => TokenKind::Byte(parse_byte(&slice[2..slice.len() - 1], span)?),
            RawToken::Template => TokenKind::Template(slice[1..slice.len() - 1].to_string()),
            RawToken::LParen => TokenKind::Open(Delimiter::Paren),
            RawToken::LBracket => TokenKind::Open(Delimiter::Bracket),
            RawToken::LBrace => TokenKind::Open(Delimiter::Brace),
            RawToken::RParen => TokenKind::Close(Delimiter::Paren),
            RawToken::RBracket => TokenKind::Close(Delimiter::Bracket),
            RawToken::RBrace => TokenKind::Close(Delimiter::Brace),
            other => match (other.keyword(), other.punct()) {
                (Some(keyword), _) => TokenKind::Keyword(keyword),
                (None, Some(punct)) => TokenKind::Punct(punct),
                (None, None) => return Err(ParseError::invalid_token(slice, span)),
            },
        };

        match kind {
            TokenKind::Open(delim) => open.push((delim, span)),
            TokenKind::Close(delim) => match open.pop() {
                Some((opened, _)) if opened == delim => {}
                Some((opened, at)) => return Err(ParseError::unclosed(opened.open(), at)),
                None => return Err(ParseError::unmatched(delim.close(), span)),
            },
            _ => {}
        }

        stream.push(Token::new(kind, span));
    }

    if let Some((delim, at)) = open.pop() {
        return Err(ParseError::unclosed(delim.open(), at));
    }

    Ok(stream)
}

/// Span of `range`, shifted by `base`; fails once offsets no longer fit in
/// a `u32`
fn token_span(
    file: FileId,
    base: u32,
    range: Range<usize>,
    len: usize,
) -> Result<FileSpan, ParseError> {
    let offset = |at: usize| u32::try_from(at).ok().and_then(|at| base.checked_add(at));
    match (offset(range.start), offset(range.end)) {
        (Some(start), Some(end)) => Ok(FileSpan::new(file, Span::new(start, end))),
        _ => Err(ParseError::too_large(
            len,
            FileSpan::new(file, Span::point(u32::MAX)),
        )),
    }
}

fn parse_byte(content: &str, span: FileSpan) -> Result<u8, ParseError> {
    if content.starts_with("\\u") {
        return Err(ParseError::invalid_literal(
            "byte",
            "unicode escapes are not allowed in byte literals",
            span,
        ));
    }
    let decoded = unescape(content, span, "byte")?;
    let mut chars = decoded.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(ParseError::invalid_literal(
            "byte",
            "expected exactly one character",
            span,
        ));
    };
    if !ch.is_ascii() && !content.starts_with("\\x") {
        return Err(ParseError::invalid_literal(
            "byte",
            "non-ASCII character in byte literal",
            span,
        ));
    }
    u8::try_from(ch).map_err(|_| ParseError::invalid_literal("byte", "byte out of range", span))
}

fn parse_integer(slice: &str, span: FileSpan) -> Result<i64, ParseError> {
    let cleaned = slice.replace('_', "");
    let (digits, radix) = if let Some(hex) = cleaned.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        (bin, 2)
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        (oct, 8)
    } else {
        (cleaned.as_str(), 10)
    };
    i64::from_str_radix(digits, radix)
        .map_err(|err| ParseError::invalid_literal("integer", err.to_string(), span))
}

/// Decodes the escape sequence following a backslash
///
/// Template text additionally allows escaping `` ` ``, `{` and `}`.
pub(crate) fn decode_escape(
    chars: &mut Peekable<CharIndices<'_>>,
    span: FileSpan,
    construct: &str,
) -> Result<char, ParseError> {
    let Some((_, escaped)) = chars.next() else {
        return Err(ParseError::invalid_literal(
            construct,
            "unterminated escape sequence",
            span,
        ));
    };

    Ok(match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' | '"' | '\'' | '`' | '{' | '}' => escaped,
        'x' => {
            let hex: String = chars.by_ref().take(2).map(|(_, digit)| digit).collect();
            let value = u8::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 2 && hex.chars().all(|digit| digit.is_ascii_hexdigit()))
                .ok_or_else(|| ParseError::invalid_literal(construct, "malformed hex escape", span))?;
            if value > 0x7f && construct != "byte" {
                return Err(ParseError::invalid_literal(
                    construct,
                    "hex escapes above `\\x7f` are only allowed in byte literals",
                    span,
                ));
            }
            char::from(value)
        }
        'u' => {
            if !matches!(chars.next(), Some((_, '{'))) {
                return Err(ParseError::invalid_literal(
                    construct,
                    "expected `{` after `\\u`",
                    span,
                ));
            }
            let mut hex = String::new();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((_, digit)) if digit.is_ascii_hexdigit() => hex.push(digit),
                    _ => {
                        return Err(ParseError::invalid_literal(
                            construct,
                            "malformed unicode escape",
                            span,
                        ));
                    }
                }
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    ParseError::invalid_literal(construct, "invalid unicode scalar", span)
                })?
        }
        other => {
            return Err(ParseError::invalid_literal(
                construct,
                format!("unknown escape `\\{other}`"),
                span,
            ));
        }
    })
}

fn unescape(content: &str, span: FileSpan, construct: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch == '\\' {
            out.push(decode_escape(&mut chars, span, construct)?);
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = Interner::new();
        lex(FileId(0), source, &interner)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        let interner = Interner::new();
        let tokens = lex(FileId(0), "pub fn fnord", &interner).unwrap();
        assert_eq!(tokens.tokens[0].kind, TokenKind::Keyword(Keyword::Pub));
        assert_eq!(tokens.tokens[1].kind, TokenKind::Keyword(Keyword::Fn));
        assert_eq!(
            tokens.tokens[2].kind,
            TokenKind::Ident(interner.intern("fnord"))
        );
    }

    #[test]
    fn numbers_in_every_radix() {
        assert_eq!(
            kinds("1_000 0xff 0b101 0o17 2.5 1e3"),
            vec![
                TokenKind::Integer(1000),
                TokenKind::Integer(255),
                TokenKind::Integer(5),
                TokenKind::Integer(15),
                TokenKind::Float(2.5),
                TokenKind::Float(1000.0),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n /* block * still */ 2"),
            vec![TokenKind::Integer(1), TokenKind::Integer(2)]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        assert_eq!(
            kinds(r#""a\n\"b\" \u{48}""#),
            vec![TokenKind::Str("a\n\"b\" H".to_string())]
        );
        assert_eq!(kinds(r"'\t'"), vec![TokenKind::Char('\t')]);
    }

    #[test]
    fn byte_literals() {
        let tokens = kinds(r"b'a' b'\n' b'\xff' b");
        assert_eq!(
            tokens[..3],
            [
                TokenKind::Byte(b'a'),
                TokenKind::Byte(b'\n'),
                TokenKind::Byte(0xff),
            ]
        );
        assert!(matches!(tokens[3], TokenKind::Ident(_)));

        let interner = Interner::new();
        let err = lex(FileId(0), "b'é'", &interner).unwrap_err();
        expect!["invalid byte: non-ASCII character in byte literal"].assert_eq(&err.to_string());
        let err = lex(FileId(0), r"'\xff'", &interner).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiteral { .. }));
    }

    #[test]
    fn templates_keep_raw_text() {
        assert_eq!(
            kinds("`Hello {name}`"),
            vec![TokenKind::Template("Hello {name}".to_string())]
        );
    }

    #[test]
    fn multi_char_punctuation() {
        assert_eq!(
            kinds(":: += << &&"),
            vec![
                TokenKind::Punct(Punct::ColonColon),
                TokenKind::Punct(Punct::PlusEq),
                TokenKind::Punct(Punct::Shl),
                TokenKind::Punct(Punct::AndAnd),
            ]
        );
    }

    #[test]
    fn spans_are_offset_by_base() {
        let interner = Interner::new();
        let tokens = lex_at(FileId(3), "a + b", 10, &interner).unwrap();
        assert_eq!(tokens.tokens[2].span, FileSpan::new(FileId(3), Span::new(14, 15)));
    }

    #[test]
    fn offsets_past_u32_are_rejected() {
        let interner = Interner::new();
        let err = lex_at(FileId(0), "a + b", u32::MAX - 2, &interner).unwrap_err();
        assert!(matches!(err, ParseError::SourceTooLarge { len: 5, .. }));
    }

    #[test]
    fn unbalanced_delimiters_are_rejected() {
        let interner = Interner::new();
        let unclosed = lex(FileId(0), "fn f() {", &interner).unwrap_err();
        assert!(matches!(
            unclosed,
            ParseError::UnclosedDelimiter {
                opening_char: '{',
                ..
            }
        ));

        let mismatched = lex(FileId(0), "(]", &interner).unwrap_err();
        assert!(matches!(mismatched, ParseError::UnclosedDelimiter { .. }));

        let stray = lex(FileId(0), ")", &interner).unwrap_err();
        assert!(matches!(stray, ParseError::UnmatchedDelimiter { .. }));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let interner = Interner::new();
        let err = lex(FileId(0), "99999999999999999999", &interner).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiteral { .. }));
    }

    #[test]
    fn unknown_input_is_an_invalid_token() {
        let interner = Interner::new();
        let err = lex(FileId(0), "let $x", &interner).unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { ref text, .. } if text == "$"));
    }
}
