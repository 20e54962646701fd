//! Recursive-descent helpers over a token slice.

use super::lexer::{join, split_top_level, Token, TokenKind};
use crate::error::{ConvertError, ConvertResult};

/// A position in one statement's tokens.
#[derive(Debug, Clone)]
pub struct Cursor<'t, 'a> {
    sql: &'a str,
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    pub fn new(sql: &'a str, tokens: &'t [Token<'a>]) -> Self {
        Self {
            sql,
            tokens,
            pos: 0,
        }
    }

    /// A cursor over a sub-slice of the same statement.
    pub fn sub(&self, tokens: &'t [Token<'a>]) -> Self {
        Self::new(self.sql, tokens)
    }

    pub fn sql(&self) -> &'a str {
        self.sql
    }

    pub fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    pub fn advance(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Tokens not consumed yet.
    pub fn rest(&self) -> &'t [Token<'a>] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    /// Tokens consumed since `start`.
    pub fn since(&self, start: usize) -> &'t [Token<'a>] {
        &self.tokens[start.min(self.pos)..self.pos]
    }

    pub fn skip_all(&mut self) {
        self.pos = self.tokens.len();
    }

    pub fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn peek_any_keyword(&self, keywords: &[&str]) -> bool {
        self.peek().is_some_and(|t| t.is_any_keyword(keywords))
    }

    /// True when the next tokens are exactly `keywords`.
    pub fn peek_keywords(&self, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .enumerate()
            .all(|(i, k)| self.peek_nth(i).is_some_and(|t| t.is_keyword(k)))
    }

    pub fn peek_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a keyword sequence only if all of it is present.
    pub fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        if self.peek_keywords(keywords) {
            self.pos += keywords.len();
            true
        } else {
            false
        }
    }

    /// Consume whichever of `keywords` comes next, returning it uppercased.
    pub fn eat_any_keyword(&mut self, keywords: &[&str]) -> Option<String> {
        let token = self.peek()?;
        if token.is_any_keyword(keywords) {
            self.pos += 1;
            Some(token.text.to_uppercase())
        } else {
            None
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> ConvertResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", keyword)))
        }
    }

    pub fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_punct(&mut self, p: &str) -> ConvertResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", p)))
        }
    }

    pub fn eat_operator(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_operator(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// `IF NOT EXISTS` / `IF EXISTS`, if present.
    pub fn eat_if_exists(&mut self) -> bool {
        self.eat_keywords(&["IF", "NOT", "EXISTS"]) || self.eat_keywords(&["IF", "EXISTS"])
    }

    /// One identifier, unquoted.
    pub fn identifier(&mut self) -> ConvertResult<String> {
        match self.peek() {
            Some(t) if t.is_identifier() => {
                self.pos += 1;
                Ok(t.ident())
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    /// A dotted name: `a`, `a.b`, `a.b.c`.
    pub fn object_name(&mut self) -> ConvertResult<Vec<String>> {
        let mut parts = vec![self.identifier()?];
        while self.peek_punct(".") && self.peek_nth(1).is_some_and(Token::is_identifier) {
            self.pos += 1;
            parts.push(self.identifier()?);
        }
        Ok(parts)
    }

    /// Consume a parenthesized group and return the tokens inside it.
    pub fn group(&mut self) -> ConvertResult<&'t [Token<'a>]> {
        if !self.peek_punct("(") {
            return Err(self.error("expected '('"));
        }
        let open = self.pos;
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = i + 1;
                        return Ok(&self.tokens[open + 1..i]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }

    /// Comma-separated identifier list inside parentheses.
    ///
    /// Sort directions and MySQL prefix lengths (`name(10)`) are dropped.
    pub fn column_list(&mut self) -> ConvertResult<Vec<String>> {
        let inner = self.group()?;
        split_top_level(inner)
            .into_iter()
            .map(|part| {
                part.first()
                    .filter(|t| t.is_identifier())
                    .map(Token::ident)
                    .ok_or_else(|| self.error("expected column name"))
            })
            .collect()
    }

    /// Tokens up to (not including) the first of `keywords` at depth 0.
    pub fn take_until_keyword(&mut self, keywords: &[&str]) -> &'t [Token<'a>] {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && token.is_any_keyword(keywords) {
                break;
            }
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth = depth.saturating_sub(1);
            }
            self.pos += 1;
        }
        &self.tokens[start..self.pos]
    }

    /// Skip one token, or a whole group if the next token opens one.
    pub fn skip_item(&mut self) -> ConvertResult<()> {
        if self.peek_punct("(") {
            self.group()?;
        } else {
            self.pos += 1;
        }
        Ok(())
    }

    /// A possibly signed integer literal.
    pub fn integer(&mut self) -> Option<i128> {
        let negative = self.peek().is_some_and(|t| t.is_operator("-"));
        let offset = usize::from(negative);
        let value = self.peek_nth(offset)?.integer()?;
        self.pos += offset + 1;
        Some(if negative { -value } else { value })
    }

    /// Original statement text from the next token to the end.
    pub fn raw_rest(&self) -> &'a str {
        match self.peek() {
            Some(t) => self.sql[t.start..].trim(),
            None => "",
        }
    }

    /// Whitespace-collapsed text of the remaining tokens.
    pub fn rest_text(&self) -> String {
        join(self.rest())
    }

    /// A malformed statement error pointing at the current token.
    pub fn error(&self, message: impl Into<String>) -> ConvertError {
        let offset = self.peek().map_or(self.sql.len(), |t| t.start);
        ConvertError::malformed(fragment(self.sql), offset, message)
    }
}

/// The statement shortened for error messages.
pub fn fragment(sql: &str) -> String {
    const MAX: usize = 120;
    let flat: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}

/// Collapse whitespace and drop redundant outer parentheses: `((0))` -> `0`.
pub fn expression_text(tokens: &[Token<'_>]) -> String {
    let mut tokens = tokens;
    while tokens.len() >= 2
        && tokens[0].is_punct("(")
        && tokens[tokens.len() - 1].is_punct(")")
        && wraps_all(tokens)
    {
        tokens = &tokens[1..tokens.len() - 1];
    }
    join(tokens)
}

fn wraps_all(tokens: &[Token<'_>]) -> bool {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
            if depth == 0 && i != tokens.len() - 1 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;

    #[test]
    fn test_object_name_parts() {
        let sql = "[dbo].[users] (id)";
        let tokens = lex(sql).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        assert_eq!(cur.object_name().unwrap(), vec!["dbo", "users"]);
        assert!(cur.peek_punct("("));
    }

    #[test]
    fn test_group_returns_inner_tokens() {
        let sql = "(a, (b, c)) tail";
        let tokens = lex(sql).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        let inner = cur.group().unwrap();
        assert_eq!(join(inner), "a, (b, c)");
        assert!(cur.peek_keyword("TAIL"));
    }

    #[test]
    fn test_unbalanced_group_is_malformed() {
        let sql = "CREATE TABLE t (a INT";
        let tokens = lex(sql).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        cur.rewind(3);
        let err = cur.group().unwrap_err();
        assert!(matches!(err, ConvertError::MalformedStatement { offset: 15, .. }));
    }

    #[test]
    fn test_column_list_drops_directions_and_prefixes() {
        let sql = "(`name`(10) DESC, id ASC)";
        let tokens = lex(sql).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        assert_eq!(cur.column_list().unwrap(), vec!["name", "id"]);
    }

    #[test]
    fn test_expression_text_strips_outer_parens() {
        let tokens = lex("((0))").unwrap();
        assert_eq!(expression_text(&tokens), "0");
        let tokens = lex("(a) + (b)").unwrap();
        assert_eq!(expression_text(&tokens), "(a) + (b)");
    }

    #[test]
    fn test_signed_integer() {
        let sql = "- 5 10";
        let tokens = lex(sql).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        assert_eq!(cur.integer(), Some(-5));
        assert_eq!(cur.integer(), Some(10));
        assert_eq!(cur.integer(), None);
    }
}
