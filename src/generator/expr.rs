//! Identifier quoting and expression translation.
//!
//! Expressions (defaults, checks, index keys, filters, view queries) are
//! stored as source text. Rendering re-lexes them and rewrites only what
//! differs between dialects; everything else passes through token by token
//! with the original spacing.

use tracing::warn;

use crate::dialect::{Dialect, DialectCaps};
use crate::parser::lexer::{lex_with, LexOptions, Token, TokenKind};

/// Functions that read the current time, all rendered as `CURRENT_TIMESTAMP`.
const CLOCK_FUNCTIONS: &[&str] = &[
    "NOW", "GETDATE", "SYSDATE", "SYSDATETIME", "SYSTIMESTAMP", "GETUTCDATE", "LOCALTIMESTAMP",
    "CURRENT_TIMESTAMP", "STATEMENT_TIMESTAMP", "TRANSACTION_TIMESTAMP",
];

/// Type words that may follow a `::` cast.
const CAST_WORDS: &[&str] = &["VARYING", "PRECISION", "WITH", "WITHOUT", "TIME", "ZONE", "LOCAL"];

fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote `name` for the target if it is not a plain identifier, is reserved,
/// or would change case when folded.
pub fn quote_ident(name: &str, caps: &DialectCaps) -> String {
    let needs_quotes = !is_plain(name)
        || caps.reserved.iter().any(|r| r.eq_ignore_ascii_case(name))
        || (caps.folds_to_lower && name.chars().any(|c| c.is_ascii_uppercase()));
    if !needs_quotes {
        return name.to_string();
    }
    let close = caps.quote_close.to_string();
    format!(
        "{}{}{}",
        caps.quote_open,
        name.replace(&close, &close.repeat(2)),
        caps.quote_close
    )
}

/// Cut `name` to the target's identifier limit. Deterministic, so every
/// reference to the same long name truncates identically.
pub fn truncate_ident(name: &str, caps: &DialectCaps) -> String {
    match caps.max_identifier_len {
        Some(max) if name.chars().count() > max => {
            let cut: String = name.chars().take(max).collect();
            warn!("Identifier {} exceeds {} characters for {}; truncated to {}", name, max, caps.dialect, cut);
            cut
        }
        _ => name.to_string(),
    }
}

/// A string literal in the target's escaping rules.
pub fn literal(text: &str, caps: &DialectCaps) -> String {
    let mut escaped = text.replace('\'', "''");
    if caps.backslash_escapes {
        escaped = escaped.replace('\\', "\\\\");
    }
    format!("'{}'", escaped)
}

/// Rewrite an expression for the target dialect.
///
/// Quoted identifiers are re-quoted, `::` casts are dropped where the
/// target has no cast operator, clock functions become `CURRENT_TIMESTAMP`,
/// boolean literals become `1`/`0` where needed, and the `N` string prefix
/// is kept only for SQL Server.
pub fn translate(text: &str, caps: &DialectCaps) -> String {
    let Ok(tokens) = lex_with(text, LexOptions::default()) else {
        return text.to_string();
    };

    let mut out = String::with_capacity(text.len());
    let mut prev_end: Option<usize> = None;
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token.is_operator("::") && !caps.cast_operator {
            i = skip_cast(&tokens, i + 1);
            prev_end = Some(tokens[i - 1].end());
            continue;
        }

        let (rendered, consumed) = rewrite(&tokens, i, caps);
        if prev_end.is_some_and(|end| token.start > end) {
            out.push(' ');
        }
        out.push_str(&rendered);
        prev_end = Some(tokens[i + consumed - 1].end());
        i += consumed;
    }
    out
}

/// Render the token at `i`, returning the text and how many tokens it used.
fn rewrite(tokens: &[Token<'_>], i: usize, caps: &DialectCaps) -> (String, usize) {
    let token = &tokens[i];
    match token.kind {
        TokenKind::QuotedIdent => {
            let name = token.ident();
            let bracket_literal = token.text.starts_with('[')
                && name.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ');
            if bracket_literal {
                (token.text.to_string(), 1)
            } else {
                (quote_ident(&name, caps), 1)
            }
        }
        TokenKind::String if caps.dialect != Dialect::SqlServer && token.text.starts_with(['N', 'n']) => {
            (token.text[1..].to_string(), 1)
        }
        TokenKind::Word if token.is_any_keyword(CLOCK_FUNCTIONS) => {
            let call = tokens.get(i + 1).is_some_and(|t| t.is_punct("("))
                && tokens.get(i + 2).is_some_and(|t| t.is_punct(")"));
            ("CURRENT_TIMESTAMP".to_string(), if call { 3 } else { 1 })
        }
        TokenKind::Word
            if token.is_keyword("datetime")
                && tokens.get(i + 1).is_some_and(|t| t.is_punct("("))
                && tokens.get(i + 2).is_some_and(|t| t.string_value().as_deref() == Some("now"))
                && tokens.get(i + 3).is_some_and(|t| t.is_punct(")")) =>
        {
            ("CURRENT_TIMESTAMP".to_string(), 4)
        }
        TokenKind::Word if !caps.boolean_literals && token.is_keyword("TRUE") => ("1".to_string(), 1),
        TokenKind::Word if !caps.boolean_literals && token.is_keyword("FALSE") => ("0".to_string(), 1),
        _ => (token.text.to_string(), 1),
    }
}

/// Index just past the type following a `::`.
fn skip_cast(tokens: &[Token<'_>], mut i: usize) -> usize {
    // Type name, possibly qualified.
    while i < tokens.len() && tokens[i].is_identifier() {
        i += 1;
        if i + 1 < tokens.len() && tokens[i].is_punct(".") {
            i += 1;
        } else {
            break;
        }
    }
    while i < tokens.len() && tokens[i].is_any_keyword(CAST_WORDS) {
        i += 1;
    }
    if i < tokens.len() && tokens[i].is_punct("(") {
        let mut depth = 0usize;
        while i < tokens.len() {
            if tokens[i].is_punct("(") {
                depth += 1;
            } else if tokens[i].is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    i += 1;
                    break;
                }
            }
            i += 1;
        }
    }
    while i + 1 < tokens.len() && tokens[i].is_punct("[") && tokens[i + 1].is_punct("]") {
        i += 2;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_ident_rules() {
        let pg = Dialect::Postgres.caps();
        assert_eq!(quote_ident("users", pg), "users");
        assert_eq!(quote_ident("order", pg), "\"order\"");
        assert_eq!(quote_ident("UserId", pg), "\"UserId\"");
        assert_eq!(quote_ident("my col", Dialect::MySql.caps()), "`my col`");
        assert_eq!(quote_ident("a]b", Dialect::SqlServer.caps()), "[a]]b]");
        assert_eq!(quote_ident("UserId", Dialect::SqlServer.caps()), "UserId");
    }

    #[test]
    fn test_truncate_ident() {
        let long = "x".repeat(70);
        assert_eq!(truncate_ident(&long, Dialect::Postgres.caps()).len(), 63);
        assert_eq!(truncate_ident(&long, Dialect::Sqlite.caps()).len(), 70);
    }

    #[test]
    fn test_translate_drops_casts_for_other_targets() {
        let mysql = Dialect::MySql.caps();
        assert_eq!(translate("'new'::character varying", mysql), "'new'");
        assert_eq!(translate("('{}'::text[])", mysql), "('{}')");
        let pg = Dialect::Postgres.caps();
        assert_eq!(translate("'new'::character varying", pg), "'new'::character varying");
    }

    #[test]
    fn test_translate_clock_and_booleans() {
        let sqlserver = Dialect::SqlServer.caps();
        assert_eq!(translate("now()", sqlserver), "CURRENT_TIMESTAMP");
        assert_eq!(translate("true", sqlserver), "1");
        assert_eq!(translate("datetime('now')", Dialect::Postgres.caps()), "CURRENT_TIMESTAMP");
        assert_eq!(translate("getdate()", Dialect::MySql.caps()), "CURRENT_TIMESTAMP");
        assert_eq!(translate("FALSE", Dialect::MySql.caps()), "FALSE");
    }

    #[test]
    fn test_translate_requotes_identifiers() {
        assert_eq!(
            translate("[Price] * 2 > `min` AND \"Qty\" > 0", Dialect::Postgres.caps()),
            "\"Price\" * 2 > min AND \"Qty\" > 0"
        );
        assert_eq!(translate("N'abc'", Dialect::Oracle.caps()), "'abc'");
        assert_eq!(translate("N'abc'", Dialect::SqlServer.caps()), "N'abc'");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(literal("it's", Dialect::Postgres.caps()), "'it''s'");
        assert_eq!(literal("a\\b", Dialect::MySql.caps()), "'a\\\\b'");
    }
}
