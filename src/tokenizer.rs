//! Streaming statement tokenizer.
//!
//! Splits a byte stream into delimiter-bounded statements one byte at a time,
//! so memory stays bounded by the largest statement. Quoted strings and
//! identifiers never end a statement; comments are dropped before they reach
//! the output buffer.
//!
//! ```
//! use sqlport::tokenizer::{StatementTokenizer, TokenizerOptions};
//!
//! let sql = "CREATE TABLE a (x TEXT DEFAULT ';'); -- done\nCREATE TABLE b (y INT);";
//! let stmts: Vec<String> = StatementTokenizer::new(sql.as_bytes(), TokenizerOptions::default())
//!     .map(|s| s.unwrap().text)
//!     .collect();
//!
//! assert_eq!(stmts, vec!["CREATE TABLE a (x TEXT DEFAULT ';')", "CREATE TABLE b (y INT)"]);
//! ```

use std::io::{BufReader, Bytes, Read};
use std::iter::Peekable;

use tracing::debug;

use crate::error::{ConvertError, ConvertResult};

/// How a statement boundary is recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delimiter {
    /// Matches when the buffer ends with these bytes (`;`, `//`, `$$`).
    Token(String),
    /// Matches a line consisting only of this word, ignoring case (`GO`, `/`).
    Line(String),
}

/// Where procedural blocks end when the primary delimiter appears inside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// Every delimiter ends a statement.
    #[default]
    None,
    /// Blocks end only at the batch separator line.
    UntilSeparator,
    /// Blocks end at a delimiter directly following the word `END`.
    UntilEnd,
}

/// Tokenizer behavior switches; dialects provide presets.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub delimiter: Delimiter,
    pub batch_separator: Option<Delimiter>,
    pub block_mode: BlockMode,
    /// Backslash escapes the next character inside single-quoted strings.
    pub backslash_escapes: bool,
    /// `#` starts a line comment.
    pub hash_comments: bool,
    /// `$tag$ ... $tag$` is a quoted string.
    pub dollar_quotes: bool,
    /// `DELIMITER x` lines switch the delimiter.
    pub delimiter_directive: bool,
}

/// One statement with its delimiter removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// Byte offset of the statement's first character in the stream.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    Quoted(u8),
    /// Closing tag and the buffer length where the body starts.
    Dollar(Vec<u8>, usize),
    LineComment,
    BlockComment,
}

/// Iterator over the statements of a SQL stream.
pub struct StatementTokenizer<R: Read> {
    bytes: Peekable<Bytes<BufReader<R>>>,
    opts: TokenizerOptions,
    state: State,
    escaped: bool,
    buf: Vec<u8>,
    start: Option<usize>,
    pos: usize,
    done: bool,
}

impl Delimiter {
    /// Build a delimiter from its text: words and `/` match whole lines.
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        if text == "/" || text.chars().all(|c| c.is_ascii_alphanumeric()) {
            Self::Line(text.to_string())
        } else {
            Self::Token(text.to_string())
        }
    }

    pub fn semicolon() -> Self {
        Self::Token(";".to_string())
    }
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::semicolon(),
            batch_separator: None,
            block_mode: BlockMode::None,
            backslash_escapes: true,
            hash_comments: false,
            dollar_quotes: false,
            delimiter_directive: false,
        }
    }
}

impl TokenizerOptions {
    pub fn with_delimiter(delimiter: &str) -> Self {
        Self {
            delimiter: Delimiter::new(delimiter),
            ..Default::default()
        }
    }
}

impl<R: Read> StatementTokenizer<R> {
    pub fn new(reader: R, opts: TokenizerOptions) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes().peekable(),
            opts,
            state: State::Normal,
            escaped: false,
            buf: Vec::new(),
            start: None,
            pos: 0,
            done: false,
        }
    }

    /// The delimiter currently in effect (changes with `DELIMITER` lines).
    pub fn delimiter(&self) -> &Delimiter {
        &self.opts.delimiter
    }

    fn peek_is(&mut self, expected: u8) -> bool {
        matches!(self.bytes.peek(), Some(Ok(b)) if *b == expected)
    }

    fn skip_peeked(&mut self) {
        if self.bytes.next().is_some() {
            self.pos += 1;
        }
    }

    fn push(&mut self, byte: u8) {
        if self.start.is_none() && !byte.is_ascii_whitespace() {
            self.start = Some(self.pos - 1);
        }
        self.buf.push(byte);
    }

    fn step(&mut self, byte: u8) -> Option<Statement> {
        match self.state.clone() {
            State::LineComment => {
                if byte == b'\n' {
                    self.state = State::Normal;
                    return self.normal(byte);
                }
                None
            }
            State::BlockComment => {
                if byte == b'*' && self.peek_is(b'/') {
                    self.skip_peeked();
                    self.state = State::Normal;
                }
                None
            }
            State::Quoted(quote) => {
                self.push(byte);
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' && quote == b'\'' && self.opts.backslash_escapes {
                    self.escaped = true;
                } else if byte == quote {
                    self.state = State::Normal;
                }
                None
            }
            State::Dollar(tag, body_start) => {
                self.push(byte);
                if self.buf.len() >= body_start + tag.len() && self.buf.ends_with(&tag) {
                    self.state = State::Normal;
                }
                None
            }
            State::Normal => self.normal(byte),
        }
    }

    fn normal(&mut self, byte: u8) -> Option<Statement> {
        match byte {
            b'-' if self.peek_is(b'-') => {
                self.skip_peeked();
                self.enter_comment(State::LineComment);
                return None;
            }
            b'#' if self.opts.hash_comments => {
                self.enter_comment(State::LineComment);
                return None;
            }
            b'/' if self.peek_is(b'*') => {
                self.skip_peeked();
                self.enter_comment(State::BlockComment);
                return None;
            }
            b'\'' | b'"' | b'`' => {
                self.push(byte);
                self.escaped = false;
                self.state = State::Quoted(byte);
                return None;
            }
            b'\n' => {
                if let Some(stmt) = self.end_of_line() {
                    return Some(stmt);
                }
                if self.buf.is_empty() {
                    return None;
                }
                self.push(byte);
                return None;
            }
            b'$' if self.opts.dollar_quotes => {
                self.push(byte);
                if let Some(tag) = self.dollar_tag() {
                    let body_start = self.buf.len();
                    self.state = State::Dollar(tag, body_start);
                    return None;
                }
            }
            _ => self.push(byte),
        }
        self.check_token_delimiter()
    }

    fn enter_comment(&mut self, state: State) {
        if !self.buf.is_empty() {
            self.buf.push(b' ');
        }
        self.state = state;
    }

    /// Opening `$tag$` ending at the last buffered byte, if any.
    fn dollar_tag(&self) -> Option<Vec<u8>> {
        let end = self.buf.len() - 1;
        let mut i = end;
        while i > 0 && (self.buf[i - 1].is_ascii_alphanumeric() || self.buf[i - 1] == b'_') {
            i -= 1;
        }
        if i == 0 || self.buf[i - 1] != b'$' {
            return None;
        }
        let open = i - 1;
        if self.buf.get(open + 1).is_some_and(|b| b.is_ascii_digit()) {
            return None;
        }
        if open > 0 {
            let before = self.buf[open - 1];
            if before.is_ascii_alphanumeric() || before == b'_' || before == b'$' {
                return None;
            }
        }
        Some(self.buf[open..=end].to_vec())
    }

    /// Handle a line delimiter or `DELIMITER` directive ending the current line.
    fn end_of_line(&mut self) -> Option<Statement> {
        let line_start = self
            .buf
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|p| p + 1)
            .unwrap_or(0);
        let line = String::from_utf8_lossy(&self.buf[line_start..]).trim().to_string();

        if self.opts.delimiter_directive && line_start == 0 {
            if let Some(delimiter) = parse_directive(&line) {
                debug!("Delimiter switched to {:?}", delimiter);
                self.opts.delimiter = delimiter;
                self.buf.clear();
                self.start = None;
                return None;
            }
        }

        let is_separator = [Some(&self.opts.delimiter), self.opts.batch_separator.as_ref()]
            .into_iter()
            .flatten()
            .any(|d| matches!(d, Delimiter::Line(word) if line.eq_ignore_ascii_case(word)));
        if !is_separator {
            return None;
        }

        self.buf.truncate(line_start);
        self.take_statement()
    }

    fn check_token_delimiter(&mut self) -> Option<Statement> {
        let Delimiter::Token(delim) = &self.opts.delimiter else {
            return None;
        };
        let delim = delim.as_bytes();
        if delim.is_empty() || !self.buf.ends_with(delim) {
            return None;
        }
        if self.opts.delimiter_directive && is_directive_line(&self.buf) {
            return None;
        }

        let body_len = self.buf.len() - delim.len();
        match self.opts.block_mode {
            BlockMode::None => {}
            BlockMode::UntilSeparator => {
                if opens_block(&self.buf) {
                    return None;
                }
            }
            BlockMode::UntilEnd => {
                if opens_block(&self.buf) && !ends_with_end(&self.buf[..body_len]) {
                    return None;
                }
            }
        }

        self.buf.truncate(body_len);
        self.take_statement()
    }

    fn take_statement(&mut self) -> Option<Statement> {
        let raw = std::mem::take(&mut self.buf);
        let offset = self.start.take().unwrap_or(0);
        let text = String::from_utf8_lossy(&raw).trim().to_string();
        if text.is_empty() {
            return None;
        }
        if self.opts.delimiter_directive {
            if let Some(delimiter) = parse_directive(&text) {
                self.opts.delimiter = delimiter;
                return None;
            }
        }
        Some(Statement { text, offset })
    }

    fn finish(&mut self) -> Option<Statement> {
        if self.state == State::Normal {
            if let Some(stmt) = self.end_of_line() {
                return Some(stmt);
            }
        }
        self.take_statement()
    }
}

impl<R: Read> Iterator for StatementTokenizer<R> {
    type Item = ConvertResult<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let byte = match self.bytes.next() {
                None => {
                    self.done = true;
                    return self.finish().map(Ok);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(ConvertError::StreamIo(e)));
                }
                Some(Ok(b)) => b,
            };
            self.pos += 1;
            if let Some(stmt) = self.step(byte) {
                return Some(Ok(stmt));
            }
        }
        None
    }
}

fn is_directive_line(buf: &[u8]) -> bool {
    let text = buf.trim_ascii_start();
    !text.contains(&b'\n')
        && text.len() > 10
        && text[..10].eq_ignore_ascii_case(b"DELIMITER ")
}

/// Parse a `DELIMITER x` line.
fn parse_directive(line: &str) -> Option<Delimiter> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next()?;
    if !keyword.eq_ignore_ascii_case("DELIMITER") {
        return None;
    }
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Delimiter::new(value))
}

/// True when the buffered statement starts a procedural block.
fn opens_block(buf: &[u8]) -> bool {
    let head = &buf[..buf.len().min(256)];
    let text = String::from_utf8_lossy(head).to_uppercase();
    let words: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .filter(|w| !w.is_empty())
        .take(10)
        .collect();

    match words.first().copied() {
        Some("DECLARE") => true,
        Some("BEGIN") => !matches!(
            words.get(1).copied(),
            None | Some("TRAN") | Some("TRANSACTION") | Some("WORK")
        ),
        Some("CREATE") => {
            let mut rest = words[1..].iter().skip_while(|w| {
                matches!(
                    **w,
                    "OR" | "REPLACE" | "ALTER" | "EDITIONABLE" | "NONEDITIONABLE" | "TEMP"
                        | "TEMPORARY" | "="
                ) || w.starts_with("DEFINER")
                    || w.contains('@')
            });
            match rest.next().copied() {
                Some("FUNCTION" | "PROCEDURE" | "PROC" | "TRIGGER" | "PACKAGE") => true,
                Some("TYPE") => rest.next().copied() == Some("BODY"),
                _ => false,
            }
        }
        _ => false,
    }
}

fn ends_with_end(body: &[u8]) -> bool {
    let trimmed = body.trim_ascii_end();
    if trimmed.len() < 3 || !trimmed[trimmed.len() - 3..].eq_ignore_ascii_case(b"END") {
        return false;
    }
    trimmed.len() == 3 || {
        let before = trimmed[trimmed.len() - 4];
        !(before.is_ascii_alphanumeric() || before == b'_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(sql: &str, opts: TokenizerOptions) -> Vec<String> {
        StatementTokenizer::new(sql.as_bytes(), opts)
            .map(|s| s.unwrap().text)
            .collect()
    }

    #[test]
    fn test_delimiter_inside_string_does_not_split() {
        let stmts = split("INSERT INTO t VALUES ('a;b'); SELECT 1;", TokenizerOptions::default());
        assert_eq!(stmts, vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }

    #[test]
    fn test_comments_never_reach_output() {
        let sql = "-- header; with delimiter\nCREATE /* inline; */ TABLE t (id INT); /* tail */";
        let stmts = split(sql, TokenizerOptions::default());
        assert_eq!(stmts.len(), 1);
        assert!(!stmts[0].contains("header"));
        assert!(!stmts[0].contains("inline"));
        assert!(stmts[0].starts_with("CREATE"));
        assert!(stmts[0].ends_with("(id INT)"));
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let stmts = split("SELECT '-- not a comment', '/* nor this */';", TokenizerOptions::default());
        assert_eq!(stmts, vec!["SELECT '-- not a comment', '/* nor this */'"]);
    }

    #[test]
    fn test_backslash_escaped_quote() {
        let stmts = split(r"SELECT 'it\'s; fine'; SELECT 2", TokenizerOptions::default());
        assert_eq!(stmts, vec![r"SELECT 'it\'s; fine'", "SELECT 2"]);
    }

    #[test]
    fn test_standard_strings_ignore_backslash() {
        let opts = TokenizerOptions {
            backslash_escapes: false,
            ..Default::default()
        };
        let stmts = split(r"SELECT 'C:\'; SELECT 2;", opts);
        assert_eq!(stmts, vec![r"SELECT 'C:\'", "SELECT 2"]);
    }

    #[test]
    fn test_remaining_buffer_is_yielded_at_eof() {
        let stmts = split("SELECT 1; SELECT 2", TokenizerOptions::default());
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_go_matches_whole_lines_only() {
        let opts = TokenizerOptions::with_delimiter("GO");
        let sql = "CREATE TABLE category (id INT)\ngo\nCREATE TABLE goods (id INT)\nGO\n";
        let stmts = split(sql, opts);
        assert_eq!(
            stmts,
            vec!["CREATE TABLE category (id INT)", "CREATE TABLE goods (id INT)"]
        );
    }

    #[test]
    fn test_custom_token_delimiter() {
        let stmts = split("SELECT 1 $$ SELECT 2 $$", TokenizerOptions::with_delimiter("$$"));
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_multibyte_text_with_directive_detection() {
        let opts = TokenizerOptions {
            delimiter_directive: true,
            ..Default::default()
        };
        let stmts = split("USE `añoñ`;\nCREATE TABLE `ñandú` (id INT);\n", opts);
        assert_eq!(stmts, vec!["USE `añoñ`", "CREATE TABLE `ñandú` (id INT)"]);
    }

    #[test]
    fn test_delimiter_directive() {
        let opts = TokenizerOptions {
            delimiter_directive: true,
            ..Default::default()
        };
        let sql = "DELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; SELECT 2; END//\nDELIMITER ;\nSELECT 3;";
        let stmts = split(sql, opts);
        assert_eq!(
            stmts,
            vec!["CREATE PROCEDURE p() BEGIN SELECT 1; SELECT 2; END", "SELECT 3"]
        );
    }

    #[test]
    fn test_dollar_quotes_hide_delimiters() {
        let opts = TokenizerOptions {
            dollar_quotes: true,
            ..Default::default()
        };
        let sql = "CREATE FUNCTION f() RETURNS int AS $body$ BEGIN RETURN 1; END; $body$ LANGUAGE plpgsql; SELECT $1;";
        let stmts = split(sql, opts);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("LANGUAGE plpgsql"));
    }

    #[test]
    fn test_block_mode_waits_for_separator() {
        let opts = TokenizerOptions {
            batch_separator: Some(Delimiter::new("/")),
            block_mode: BlockMode::UntilSeparator,
            backslash_escapes: false,
            ..Default::default()
        };
        let sql = "CREATE TABLE t (a NUMBER(10));\nCREATE OR REPLACE PROCEDURE p IS\nBEGIN\n  NULL;\nEND;\n/\nCREATE TABLE u (b NUMBER(10));";
        let stmts = split(sql, opts);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].starts_with("CREATE OR REPLACE PROCEDURE p IS"));
        assert!(stmts[1].ends_with("END;"));
    }

    #[test]
    fn test_block_mode_until_end() {
        let opts = TokenizerOptions {
            block_mode: BlockMode::UntilEnd,
            ..Default::default()
        };
        let sql = "CREATE TRIGGER tr AFTER INSERT ON t BEGIN UPDATE t SET a = 1; INSERT INTO log VALUES (1); END; BEGIN TRANSACTION; SELECT 1;";
        let stmts = split(sql, opts);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].ends_with("END"));
        assert_eq!(stmts[1], "BEGIN TRANSACTION");
    }

    #[test]
    fn test_statement_offsets() {
        let sql = "  SELECT 1;\n-- note\nSELECT 2;";
        let offsets: Vec<usize> = StatementTokenizer::new(sql.as_bytes(), TokenizerOptions::default())
            .map(|s| s.unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![2, sql.find("SELECT 2").unwrap()]);
    }

    #[test]
    fn test_comment_between_tokens_keeps_them_apart() {
        let stmts = split("SELECT/*x*/1", TokenizerOptions::default());
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_hash_comments() {
        let opts = TokenizerOptions {
            hash_comments: true,
            ..Default::default()
        };
        let stmts = split("# dump header;\nSELECT 1;", opts);
        assert_eq!(stmts, vec!["SELECT 1"]);
    }
}
