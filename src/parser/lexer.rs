//! SQL lexer using nom.
//!
//! Turns one statement into a flat token list. Comments and whitespace are
//! dropped; every token remembers its byte range so callers can slice the
//! original text (routine bodies are kept verbatim) or rebuild a normalized
//! rendering with [`join`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

use crate::error::{ConvertError, ConvertResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: keyword or unquoted identifier.
    Word,
    /// `"x"`, `` `x` `` or `[x]`.
    QuotedIdent,
    /// `'x'`, optionally prefixed `N`, `E`, `X` or `B`.
    String,
    /// `$tag$ ... $tag$`.
    DollarString,
    Number,
    /// `@x`, `@@x`, `:x`, `$1`.
    Variable,
    /// `( ) , ; .` and other single characters.
    Punct,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset in the lexed input.
    pub start: usize,
}

/// Lexer switches that differ between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexOptions {
    pub backslash_escapes: bool,
    /// `[name]` is a quoted identifier rather than two brackets.
    pub bracket_identifiers: bool,
}

impl Default for LexOptions {
    fn default() -> Self {
        Self {
            backslash_escapes: true,
            bracket_identifiers: true,
        }
    }
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    /// Case-insensitive keyword match on bare words.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// True for tokens that can name an object.
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }

    /// Identifier text with quoting removed.
    pub fn ident(&self) -> String {
        match self.kind {
            TokenKind::QuotedIdent => {
                let inner = &self.text[1..self.text.len() - 1];
                match self.text.as_bytes()[0] {
                    b'"' => inner.replace("\"\"", "\""),
                    b'`' => inner.replace("``", "`"),
                    _ => inner.replace("]]", "]"),
                }
            }
            TokenKind::String => self.string_value().unwrap_or_default(),
            _ => self.text.to_string(),
        }
    }

    /// Value of a string or dollar-quoted literal.
    pub fn string_value(&self) -> Option<String> {
        match self.kind {
            TokenKind::String => {
                let quote = self.text.find('\'')?;
                let inner = &self.text[quote + 1..self.text.len() - 1];
                Some(unescape(inner))
            }
            TokenKind::DollarString => {
                let tag_len = self.text[1..].find('$')? + 2;
                Some(self.text[tag_len..self.text.len() - tag_len].to_string())
            }
            _ => None,
        }
    }

    /// Number value, if this is an integer literal.
    pub fn integer(&self) -> Option<i128> {
        match self.kind {
            TokenKind::Number => self.text.parse().ok(),
            _ => None,
        }
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' if matches!(chars.peek(), Some('\'') | Some('\\')) => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Lex with default options (backslash escapes and bracket identifiers on).
pub fn lex(input: &str) -> ConvertResult<Vec<Token<'_>>> {
    lex_with(input, LexOptions::default())
}

pub fn lex_with(input: &str, opts: LexOptions) -> ConvertResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            break;
        }
        let start = input.len() - rest.len();
        match token(rest, opts) {
            Ok((remaining, (kind, text))) => {
                tokens.push(Token { kind, text, start });
                rest = remaining;
            }
            Err(_) => {
                let fragment: String = rest.chars().take(40).collect();
                return Err(ConvertError::malformed(
                    fragment,
                    start,
                    "unterminated quoted text",
                ));
            }
        }
    }

    Ok(tokens)
}

/// Skip whitespace and comments.
fn skip_trivia(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        if let Some(after) = trimmed.strip_prefix("--") {
            input = after.find('\n').map_or("", |i| &after[i..]);
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            input = after.find("*/").map_or("", |i| &after[i + 2..]);
        } else {
            return trimmed;
        }
    }
}

fn token(input: &str, opts: LexOptions) -> IResult<&str, (TokenKind, &str)> {
    if let Ok((rest, text)) = prefixed_string(input, opts) {
        return Ok((rest, (TokenKind::String, text)));
    }
    if let Ok((rest, text)) = quoted(input, '\'', opts.backslash_escapes) {
        return Ok((rest, (TokenKind::String, text)));
    }
    if let Ok((rest, text)) = quoted(input, '"', false).or_else(|_| quoted(input, '`', false)) {
        return Ok((rest, (TokenKind::QuotedIdent, text)));
    }
    if opts.bracket_identifiers {
        if let Ok((rest, text)) = bracketed(input) {
            return Ok((rest, (TokenKind::QuotedIdent, text)));
        }
    }
    if let Ok((rest, text)) = dollar_string(input) {
        return Ok((rest, (TokenKind::DollarString, text)));
    }
    if let Ok((rest, text)) = number(input) {
        return Ok((rest, (TokenKind::Number, text)));
    }
    if let Ok((rest, text)) = word(input) {
        return Ok((rest, (TokenKind::Word, text)));
    }
    if let Ok((rest, text)) = operator(input) {
        return Ok((rest, (TokenKind::Operator, text)));
    }
    if let Ok((rest, text)) = variable(input) {
        return Ok((rest, (TokenKind::Variable, text)));
    }

    // Unterminated quotes must not fall through to punctuation.
    if input.starts_with(['\'', '"', '`']) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let len = input.chars().next().map_or(1, char::len_utf8);
    let (text, rest) = input.split_at(len);
    let kind = if "+-*/%=<>!|&^~".contains(text) {
        TokenKind::Operator
    } else {
        TokenKind::Punct
    };
    Ok((rest, (kind, text)))
}

/// A quoted run where a doubled quote (or optionally a backslash) escapes.
fn quoted(input: &str, quote: char, backslash: bool) -> IResult<&str, &str> {
    let (body, _) = char(quote)(input)?;
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' && backslash {
            chars.next();
        } else if c == quote {
            if body[i + 1..].starts_with(quote) {
                chars.next();
            } else {
                let end = input.len() - body.len() + i + 1;
                return Ok((&input[end..], &input[..end]));
            }
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn prefixed_string(input: &str, opts: LexOptions) -> IResult<&str, &str> {
    let (rest, _) = one_of("NnEeXxBb")(input)?;
    let (rest, _) = quoted(rest, '\'', opts.backslash_escapes)?;
    Ok((rest, &input[..input.len() - rest.len()]))
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('['),
        take_while1(|c: char| c != ']' && c != '\n'),
        char(']'),
    )))(input)
}

fn dollar_string(input: &str) -> IResult<&str, &str> {
    let (after_tag, tag_text) = recognize(tuple((
        char('$'),
        opt(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        char('$'),
    )))(input)?;
    match after_tag.find(tag_text) {
        Some(i) => {
            let end = input.len() - after_tag.len() + i + tag_text.len();
            Ok((&input[end..], &input[..end]))
        }
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        ))),
    }
}

fn number(input: &str) -> IResult<&str, &str> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    alt((
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit0)),
            opt(exponent),
        ))),
        recognize(pair(char('.'), digit1)),
    ))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '#'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '#'),
    ))(input)
}

fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag("->>"),
        tag("::"),
        tag("<="),
        tag(">="),
        tag("<>"),
        tag("!="),
        tag("||"),
        tag(":="),
        tag("=>"),
        tag("->"),
    ))(input)
}

fn variable(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((
            char('@'),
            opt(char('@')),
            take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '#'),
        ))),
        recognize(pair(
            char(':'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        recognize(pair(char('$'), digit1)),
    ))(input)
}

/// Rebuild text from tokens, collapsing every gap to one space.
///
/// Adjacent tokens stay adjacent, so `now()` and `a.b` keep their shape.
pub fn join(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev_end = None;
    for token in tokens {
        if let Some(end) = prev_end {
            if token.start > end {
                out.push(' ');
            }
        }
        out.push_str(token.text);
        prev_end = Some(token.end());
    }
    out
}

/// Split tokens at commas outside any brackets.
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut begin = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                parts.push(&tokens[begin..i]);
                begin = i + 1;
            }
            _ => {}
        }
    }
    if begin < tokens.len() {
        parts.push(&tokens[begin..]);
    }
    parts.retain(|p| !p.is_empty());
    parts
}
