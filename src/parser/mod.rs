//! Statement parsing.
//!
//! Each statement is lexed, classified by its leading keywords, and handed
//! to one extraction routine that returns a single [`SchemaObject`]. The
//! routines are pure functions of the statement text and the dialect, so
//! any number of them can run concurrently.

pub mod cursor;
pub mod lexer;
mod objects;
mod routines;
mod table;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::schema::{ObjectName, Schema, SchemaAssembler, SchemaObject};
use crate::tokenizer::StatementTokenizer;
use cursor::{fragment, Cursor};
use lexer::Token;

pub use lexer::{lex, lex_with, LexOptions, TokenKind};

/// What a statement is, judged by its leading keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    CreateIndex,
    CreateView,
    CreateRoutine,
    CreateTrigger,
    CreateSequence,
    CreateType,
    CreateExtension,
    CreateNamespace,
    CreateDatabase,
    Use,
    AlterTable,
    AlterSession,
    Comment,
    ExtendedProperty,
    Grant,
    Revoke,
    /// DML, session settings, transaction control: never part of a schema.
    NonSchema,
    Unrecognized,
}

/// What to do with statements no extraction routine models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Drop them (logged at debug level).
    #[default]
    Skip,
    /// Deliver them to streaming callbacks as [`SchemaObject::Unrecognized`].
    Report,
    /// Fail with [`ConvertError::UnsupportedConstruct`].
    Error,
}

impl FromStr for UnrecognizedPolicy {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "report" => Ok(Self::Report),
            "error" => Ok(Self::Error),
            other => Err(ConvertError::Config(format!(
                "unknown unrecognized-statement policy '{}': expected skip, report or error",
                other
            ))),
        }
    }
}

impl fmt::Display for UnrecognizedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Report => write!(f, "report"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Per-statement parsing context.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub dialect: Dialect,
}

impl Context {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Map the dialect's default namespace to the empty namespace.
    pub fn namespace(&self, namespace: &str) -> String {
        let default = self.dialect.caps().default_namespace;
        if !default.is_empty() && namespace.eq_ignore_ascii_case(default) {
            String::new()
        } else {
            namespace.to_string()
        }
    }

    /// Build a name from dotted parts; `db.schema.name` keeps the schema.
    pub fn name(&self, mut parts: Vec<String>) -> ObjectName {
        let name = parts.pop().unwrap_or_default();
        let namespace = parts.pop().map(|ns| self.namespace(&ns)).unwrap_or_default();
        ObjectName::new(namespace, name)
    }

    pub fn object_name(&self, cur: &mut Cursor<'_, '_>) -> ConvertResult<ObjectName> {
        Ok(self.name(cur.object_name()?))
    }
}

const CREATE_TARGETS: &[&str] = &[
    "TABLE", "INDEX", "VIEW", "FUNCTION", "PROCEDURE", "PROC", "TRIGGER", "SEQUENCE", "TYPE",
    "EXTENSION", "SCHEMA", "DATABASE", "PACKAGE", "ROLE", "USER", "SYNONYM", "DOMAIN", "RULE",
    "AGGREGATE", "OPERATOR", "CAST", "COLLATION", "SERVER", "PUBLICATION", "SUBSCRIPTION",
    "POLICY", "EVENT", "TABLESPACE", "DIRECTORY", "LOGIN", "ASSEMBLY", "STATISTICS",
];

const NON_SCHEMA: &[&str] = &[
    "SET", "INSERT", "REPLACE", "UPDATE", "DELETE", "MERGE", "SELECT", "WITH", "VALUES", "LOCK",
    "UNLOCK", "DROP", "TRUNCATE", "BEGIN", "START", "COMMIT", "ROLLBACK", "SAVEPOINT", "RELEASE",
    "END", "PRAGMA", "CALL", "DECLARE", "VACUUM", "ANALYZE", "ANALYSE", "COPY", "PRINT", "IF",
    "SHOW", "DESCRIBE", "EXPLAIN", "FLUSH", "OPTIMIZE", "CHECKPOINT", "RAISERROR", "WHENEVER",
    "SPOOL", "PROMPT", "EXIT", "QUIT", "REM", "REMARK", "CLUSTER", "REINDEX", "REFRESH", "LISTEN",
    "NOTIFY", "DISCARD", "RESET", "DO", "ATTACH", "DETACH", "DBCC", "PURGE", "AUDIT", "CONNECT",
    "DEALLOCATE", "PREPARE", "EXEC", "EXECUTE", "SECURITY",
];

/// Classify a lexed statement.
pub fn classify(tokens: &[Token<'_>]) -> StatementKind {
    let Some(first) = tokens.first() else {
        return StatementKind::NonSchema;
    };
    let word = |i: usize| tokens.get(i).filter(|t| t.is_word()).map(|t| t.text.to_uppercase());

    if first.is_keyword("CREATE") {
        let target = tokens[1..]
            .iter()
            .take_while(|t| !t.is_punct("("))
            .position(|t| t.is_any_keyword(CREATE_TARGETS))
            .map(|i| (i + 1, tokens[i + 1].text.to_uppercase()));
        let Some((at, target)) = target else {
            return StatementKind::Unrecognized;
        };
        return match target.as_str() {
            "TABLE" => StatementKind::CreateTable,
            "INDEX" => StatementKind::CreateIndex,
            "VIEW" => StatementKind::CreateView,
            "FUNCTION" | "PROCEDURE" | "PROC" => StatementKind::CreateRoutine,
            "TRIGGER" => StatementKind::CreateTrigger,
            "SEQUENCE" => StatementKind::CreateSequence,
            "TYPE" if word(at + 1).as_deref() == Some("BODY") => StatementKind::Unrecognized,
            "TYPE" => StatementKind::CreateType,
            "EXTENSION" => StatementKind::CreateExtension,
            "SCHEMA" => StatementKind::CreateNamespace,
            "DATABASE" => StatementKind::CreateDatabase,
            _ => StatementKind::Unrecognized,
        };
    }

    if first.is_keyword("ALTER") {
        return match word(1).as_deref() {
            Some("TABLE") => StatementKind::AlterTable,
            Some("SESSION") => StatementKind::AlterSession,
            _ => StatementKind::NonSchema,
        };
    }
    if first.is_keyword("COMMENT") && word(1).as_deref() == Some("ON") {
        return StatementKind::Comment;
    }
    if first.is_any_keyword(&["EXEC", "EXECUTE"])
        && tokens
            .iter()
            .take(4)
            .any(|t| t.is_keyword("sp_addextendedproperty"))
    {
        return StatementKind::ExtendedProperty;
    }
    if first.is_keyword("GRANT") {
        return StatementKind::Grant;
    }
    if first.is_keyword("REVOKE") {
        return StatementKind::Revoke;
    }
    if first.is_keyword("USE") {
        return StatementKind::Use;
    }
    if first.is_any_keyword(NON_SCHEMA) {
        return StatementKind::NonSchema;
    }
    StatementKind::Unrecognized
}

/// Label for an unrecognized statement: `CREATE ROLE`, `CREATE TYPE BODY`.
fn category(tokens: &[Token<'_>]) -> String {
    let words: Vec<String> = tokens
        .iter()
        .take_while(|t| t.is_word())
        .map(|t| t.text.to_uppercase())
        .collect();
    if words.first().map(String::as_str) == Some("CREATE") {
        if let Some(at) = words.iter().position(|w| CREATE_TARGETS.contains(&w.as_str())) {
            let end = if words.get(at + 1).map(String::as_str) == Some("BODY") { at + 2 } else { at + 1 };
            return format!("CREATE {}", words[at..end].join(" "));
        }
    }
    words.into_iter().take(2).collect::<Vec<_>>().join(" ")
}

/// Parse one statement into at most one schema fragment.
///
/// `Ok(None)` means the statement carries no schema (DML, session settings,
/// skipped unrecognized statements, unmodeled `ALTER TABLE` actions).
pub fn parse_statement(
    dialect: Dialect,
    sql: &str,
    policy: UnrecognizedPolicy,
) -> ConvertResult<Option<SchemaObject>> {
    let tokens = lexer::lex_with(sql, dialect.lex_options())?;
    let kind = classify(&tokens);
    debug!("{:?}: {}", kind, fragment(sql));

    let ctx = Context::new(dialect);
    let mut cur = Cursor::new(sql, &tokens);
    let result = match kind {
        StatementKind::CreateTable => table::parse_create_table(&ctx, &mut cur),
        StatementKind::AlterTable => table::parse_alter_table(&ctx, &mut cur),
        StatementKind::CreateIndex => objects::parse_create_index(&ctx, &mut cur),
        StatementKind::CreateView => objects::parse_create_view(&ctx, &mut cur),
        StatementKind::CreateSequence => objects::parse_create_sequence(&ctx, &mut cur),
        StatementKind::CreateType => objects::parse_create_type(&ctx, &mut cur),
        StatementKind::CreateExtension => objects::parse_create_extension(&ctx, &mut cur),
        StatementKind::CreateNamespace => objects::parse_create_schema(&ctx, &mut cur),
        StatementKind::CreateDatabase => objects::parse_create_database(&ctx, &mut cur),
        StatementKind::Use => objects::parse_use(&ctx, &mut cur),
        StatementKind::AlterSession => objects::parse_alter_session(&ctx, &mut cur),
        StatementKind::Comment => objects::parse_comment(&ctx, &mut cur),
        StatementKind::ExtendedProperty => objects::parse_extended_property(&ctx, &mut cur),
        StatementKind::Grant | StatementKind::Revoke => objects::parse_permission(&ctx, &mut cur),
        StatementKind::CreateRoutine => routines::parse_create_routine(&ctx, &mut cur),
        StatementKind::CreateTrigger => routines::parse_create_trigger(&ctx, &mut cur),
        StatementKind::NonSchema => return Ok(None),
        StatementKind::Unrecognized => Err(ConvertError::unsupported(category(&tokens), fragment(sql))),
    };

    match result {
        Err(ConvertError::UnsupportedConstruct { category, fragment }) => match policy {
            UnrecognizedPolicy::Skip => {
                debug!("Skipping unsupported {} statement", category);
                Ok(None)
            }
            UnrecognizedPolicy::Report => Ok(Some(SchemaObject::Unrecognized {
                category,
                text: sql.to_string(),
            })),
            UnrecognizedPolicy::Error => Err(ConvertError::UnsupportedConstruct { category, fragment }),
        },
        other => other,
    }
}

/// Parse a whole document. Fails on the first bad statement.
pub fn parse_document(
    dialect: Dialect,
    sql: &str,
    policy: UnrecognizedPolicy,
) -> ConvertResult<Schema> {
    let mut assembler = SchemaAssembler::new();
    let mut statements = 0usize;

    for statement in StatementTokenizer::new(sql.as_bytes(), dialect.tokenizer_options()) {
        let statement = statement?;
        statements += 1;
        let parsed = parse_statement(dialect, &statement.text, policy)
            .map_err(|e| e.at_offset(statement.offset))?;
        if let Some(object) = parsed {
            assembler.push(object);
        }
    }

    if statements == 0 {
        return Err(ConvertError::EmptyInput);
    }
    debug!("Assembling {} fragments from {} statements", assembler.len(), statements);
    Ok(assembler.finish())
}

/// Split a definition list at top-level commas.
///
/// Commas inside parentheses, string literals and quoted identifiers do
/// not split.
pub fn split_top_level(text: &str) -> ConvertResult<Vec<String>> {
    let tokens = lexer::lex(text)?;
    Ok(lexer::split_top_level(&tokens)
        .into_iter()
        .map(|part| text[part[0].start..part[part.len() - 1].end()].to_string())
        .collect())
}

/// Skip `OR REPLACE`, `DEFINER = ...`, `ALGORITHM = ...` and similar
/// modifiers between `CREATE` and the object keyword.
pub(crate) fn skip_create_modifiers(cur: &mut Cursor<'_, '_>) {
    loop {
        if cur.eat_keywords(&["OR", "REPLACE"]) || cur.eat_keywords(&["OR", "ALTER"]) {
            continue;
        }
        if cur.eat_keywords(&["SQL", "SECURITY"]) || cur.eat_keyword("ALGORITHM") {
            cur.eat_operator("=");
            cur.advance();
            continue;
        }
        if cur.eat_keyword("DEFINER") {
            cur.eat_operator("=");
            cur.advance();
            if cur.peek_punct("(") {
                let _ = cur.group();
            }
            if cur.peek_punct("@") {
                cur.advance();
                cur.advance();
            } else if cur.peek().is_some_and(|t| t.kind == TokenKind::Variable) {
                cur.advance();
            }
            continue;
        }
        let modifier = cur
            .eat_any_keyword(&[
                "TEMP", "TEMPORARY", "RECURSIVE", "FORCE", "NOFORCE", "EDITIONABLE",
                "NONEDITIONABLE", "SECURE", "CONSTRAINT", "AGGREGATE",
            ])
            .is_some();
        if !modifier {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kind_of(sql: &str) -> StatementKind {
        classify(&lex(sql).unwrap())
    }

    #[test]
    fn test_classify_creates() {
        assert_eq!(kind_of("CREATE TEMPORARY TABLE t (a INT)"), StatementKind::CreateTable);
        assert_eq!(kind_of("CREATE UNIQUE NONCLUSTERED INDEX ix ON t (a)"), StatementKind::CreateIndex);
        assert_eq!(
            kind_of("CREATE DEFINER=`root`@`%` PROCEDURE p() BEGIN END"),
            StatementKind::CreateRoutine
        );
        assert_eq!(kind_of("CREATE OR REPLACE TYPE BODY t AS END"), StatementKind::Unrecognized);
        assert_eq!(kind_of("CREATE ROLE admin"), StatementKind::Unrecognized);
    }

    #[test]
    fn test_classify_non_schema() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "SET NAMES utf8mb4",
            "DROP TABLE IF EXISTS t",
            "LOCK TABLES t WRITE",
            "BEGIN TRANSACTION",
            "PRAGMA foreign_keys = ON",
            "ALTER SEQUENCE s OWNED BY t.id",
        ] {
            assert_eq!(kind_of(sql), StatementKind::NonSchema, "{}", sql);
        }
    }

    #[test]
    fn test_classify_extended_property() {
        let sql = "EXEC sys.sp_addextendedproperty @name = N'MS_Description', @value = N'x'";
        assert_eq!(kind_of(sql), StatementKind::ExtendedProperty);
        assert_eq!(kind_of("EXEC sp_rename 'a', 'b'"), StatementKind::NonSchema);
    }

    #[test]
    fn test_policy_skip_report_error() {
        let sql = "CREATE ROLE admin";
        assert_eq!(parse_statement(Dialect::Postgres, sql, UnrecognizedPolicy::Skip).unwrap(), None);

        let reported = parse_statement(Dialect::Postgres, sql, UnrecognizedPolicy::Report).unwrap();
        assert_eq!(
            reported,
            Some(SchemaObject::Unrecognized {
                category: "CREATE ROLE".into(),
                text: sql.into()
            })
        );

        let err = parse_statement(Dialect::Postgres, sql, UnrecognizedPolicy::Error).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_non_schema_ignores_policy() {
        let parsed = parse_statement(Dialect::MySql, "INSERT INTO t VALUES (1)", UnrecognizedPolicy::Error);
        assert_eq!(parsed.unwrap(), None);
    }

    #[test]
    fn test_parse_document_empty_input() {
        let err = parse_document(Dialect::MySql, "  -- only a comment\n", UnrecognizedPolicy::Skip).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput));
    }

    #[test]
    fn test_parse_document_fails_fast_with_offset() {
        let sql = "CREATE TABLE a (id INT);\nCREATE TABLE (id INT);";
        let err = parse_document(Dialect::MySql, sql, UnrecognizedPolicy::Skip).unwrap_err();
        match err {
            ConvertError::MalformedStatement { offset, .. } => assert!(offset >= 25),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_split_top_level_text() {
        let parts = split_top_level("a INT DEFAULT 1, b VARCHAR(10) CHECK (b IN ('x,y', 'z')), c TEXT").unwrap();
        assert_eq!(
            parts,
            vec!["a INT DEFAULT 1", "b VARCHAR(10) CHECK (b IN ('x,y', 'z'))", "c TEXT"]
        );
    }

    #[test]
    fn test_context_normalizes_default_namespace() {
        let ctx = Context::new(Dialect::SqlServer);
        assert_eq!(ctx.name(vec!["dbo".into(), "users".into()]), ObjectName::unqualified("users"));
        assert_eq!(
            ctx.name(vec!["shop".into(), "sales".into(), "orders".into()]),
            ObjectName::new("sales", "orders")
        );
    }
}
