//! SQL dialects: capability descriptors, detection, and the parser registry.
//!
//! Each dialect is described by one [`DialectCaps`] value. The generator
//! reads only the descriptor, so adding a dialect means adding a descriptor
//! and a type-name function, not a new renderer.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;
pub mod types;

pub(crate) use postgres::serial_name;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{ConvertError, ConvertResult};
use crate::parser::lexer::LexOptions;
use crate::parser::{self, UnrecognizedPolicy};
use crate::schema::{DataType, Schema};
use crate::tokenizer::{BlockMode, Delimiter, TokenizerOptions};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
    Oracle,
    SqlServer,
}

/// How a dialect spells an auto-incrementing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrementStyle {
    /// `AUTO_INCREMENT` after the column type.
    Keyword,
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`.
    SqliteAutoincrement,
    /// `IDENTITY(1,1)`.
    Identity,
    /// `SERIAL` / `BIGSERIAL` in place of the type.
    Serial,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    GeneratedIdentity,
}

/// Where table and column comments go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `COMMENT 'x'` on the column, `COMMENT='x'` on the table.
    Inline,
    /// Separate `COMMENT ON TABLE|COLUMN ... IS 'x'` statements.
    CommentOn,
    /// `sp_addextendedproperty 'MS_Description'` calls.
    ExtendedProperty,
    /// Comments are dropped.
    Unsupported,
}

/// How procedural blocks (routines, triggers) are terminated in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// Ends with the ordinary terminator; bodies sit in `$$` quotes.
    Terminator,
    /// Wrapped in `DELIMITER //` ... `//` `DELIMITER ;`.
    DelimiterDirective,
    /// Ends with a line holding only `/`.
    SlashLine,
    /// Ends with a `GO` line like every other batch.
    Batch,
}

/// Everything the generic renderer needs to know about a dialect.
#[derive(Debug)]
pub struct DialectCaps {
    pub dialect: Dialect,
    pub quote_open: char,
    pub quote_close: char,
    /// Longest identifier the dialect accepts, in characters.
    pub max_identifier_len: Option<usize>,
    /// Namespace that unqualified names resolve to (`public`, `dbo`, `main`).
    pub default_namespace: &'static str,
    pub reserved: &'static [&'static str],
    /// Unquoted identifiers fold to lower case, so mixed case must be quoted.
    pub folds_to_lower: bool,
    pub auto_increment: AutoIncrementStyle,
    pub comment_style: CommentStyle,
    pub block_style: BlockStyle,
    pub supports_sequences: bool,
    pub supports_routines: bool,
    /// Native `CREATE TYPE ... AS ENUM`.
    pub supports_enum_types: bool,
    /// Inline `ENUM('a', 'b')` column types.
    pub supports_inline_enums: bool,
    pub supports_composite_types: bool,
    pub supports_namespaces: bool,
    pub supports_materialized_views: bool,
    pub supports_extensions: bool,
    pub supports_grants: bool,
    pub supports_partial_indexes: bool,
    pub supports_bitmap_indexes: bool,
    pub supports_clustered_indexes: bool,
    /// Keyword introducing a storage location (`TABLESPACE` or `ON`).
    pub tablespace_clause: Option<&'static str>,
    /// `TRUE`/`FALSE` literals exist; otherwise `1`/`0`.
    pub boolean_literals: bool,
    /// `expr::type` casts are understood.
    pub cast_operator: bool,
    pub terminator: &'static str,
    pub batch_separator: Option<&'static str>,
    pub backslash_escapes: bool,
    /// Renders a canonical data type in this dialect's spelling.
    pub type_name: fn(&DataType) -> String,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Sqlite,
        Dialect::Oracle,
        Dialect::SqlServer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
        }
    }

    pub fn caps(&self) -> &'static DialectCaps {
        match self {
            Self::MySql => &mysql::CAPS,
            Self::Postgres => &postgres::CAPS,
            Self::Sqlite => &sqlite::CAPS,
            Self::Oracle => &oracle::CAPS,
            Self::SqlServer => &sqlserver::CAPS,
        }
    }

    /// Statement splitting rules for scripts in this dialect.
    pub fn tokenizer_options(&self) -> TokenizerOptions {
        let caps = self.caps();
        let mut opts = TokenizerOptions {
            delimiter: Delimiter::new(caps.terminator),
            batch_separator: caps.batch_separator.map(Delimiter::new),
            block_mode: BlockMode::None,
            backslash_escapes: caps.backslash_escapes,
            hash_comments: false,
            dollar_quotes: false,
            delimiter_directive: false,
        };
        match self {
            Self::MySql => {
                opts.hash_comments = true;
                opts.delimiter_directive = true;
            }
            Self::Postgres => opts.dollar_quotes = true,
            Self::Sqlite => opts.block_mode = BlockMode::UntilEnd,
            Self::Oracle | Self::SqlServer => opts.block_mode = BlockMode::UntilSeparator,
        }
        opts
    }

    pub fn lex_options(&self) -> LexOptions {
        LexOptions {
            backslash_escapes: self.caps().backslash_escapes,
            bracket_identifiers: matches!(self, Self::SqlServer | Self::Sqlite),
        }
    }

    /// Guess the dialect of a dump from characteristic syntax.
    ///
    /// Signals are checked in priority order: mysql, sqlite, sqlserver,
    /// postgres, oracle. The first dialect with any matching signal wins.
    pub fn detect(sql: &str) -> ConvertResult<Dialect> {
        DETECTORS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(sql)))
            .map(|(dialect, _)| *dialect)
            .ok_or(ConvertError::UndetectedDialect)
    }

    /// The parser for this dialect with the default policy.
    pub fn parser(self) -> DialectParser {
        DialectParser::new(self)
    }
}

static DETECTORS: LazyLock<Vec<(Dialect, Vec<Regex>)>> = LazyLock::new(|| {
    let compile = |patterns: &[&str]| -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    };
    vec![
        (
            Dialect::MySql,
            compile(&[r"(?i)\bENGINE\s*=\s*\w+", r"`", r"(?i)\bAUTO_INCREMENT\b"]),
        ),
        (Dialect::Sqlite, compile(&[r"(?i)\bAUTOINCREMENT\b"])),
        (
            Dialect::SqlServer,
            compile(&[
                r"(?i)\bIDENTITY\s*\(\s*\d",
                r"(?im)^\s*GO\s*$",
                r"(?i)\[dbo\]",
                r"(?i)\bNVARCHAR\b",
            ]),
        ),
        (
            Dialect::Postgres,
            compile(&[
                r"(?i)\b(BIG|SMALL)?SERIAL\b",
                r"::",
                r"\$\$",
                r"(?i)\bCREATE\s+EXTENSION\b",
            ]),
        ),
        (
            Dialect::Oracle,
            compile(&[r"(?i)\bNUMBER\s*\(", r"(?i)\bVARCHAR2\b"]),
        ),
    ]
});

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dialect {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "oracle" => Ok(Self::Oracle),
            "sqlserver" | "mssql" | "tsql" => Ok(Self::SqlServer),
            _ => Err(ConvertError::UnknownDialect(s.to_string())),
        }
    }
}

/// Text-to-schema and schema-to-text conversion for one dialect.
///
/// Implementations are stateless and safe to share across tasks.
pub trait SchemaDialect: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Parse a whole document. Fails on the first bad statement.
    fn parse(&self, sql: &str) -> ConvertResult<Schema>;

    /// Render a schema as a script in this dialect.
    fn generate(&self, schema: &Schema) -> ConvertResult<String>;
}

/// The built-in [`SchemaDialect`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectParser {
    dialect: Dialect,
    policy: UnrecognizedPolicy,
}

impl DialectParser {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            policy: UnrecognizedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnrecognizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnrecognizedPolicy {
        self.policy
    }
}

impl SchemaDialect for DialectParser {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn parse(&self, sql: &str) -> ConvertResult<Schema> {
        parser::parse_document(self.dialect, sql, self.policy)
    }

    fn generate(&self, schema: &Schema) -> ConvertResult<String> {
        crate::generator::generate(self.dialect, schema)
    }
}

/// Look up a dialect by name.
pub fn create_parser(name: &str) -> Option<Box<dyn SchemaDialect>> {
    let dialect = name.parse::<Dialect>().ok()?;
    Some(Box::new(DialectParser::new(dialect)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert!(matches!(
            "db2".parse::<Dialect>(),
            Err(ConvertError::UnknownDialect(_))
        ));
    }

    #[test]
    fn test_detect_primary_signals() {
        let cases = [
            ("CREATE TABLE t (id INT) ENGINE=InnoDB;", Dialect::MySql),
            ("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT);", Dialect::Sqlite),
            ("CREATE TABLE t (id INT IDENTITY(1,1));", Dialect::SqlServer),
            ("CREATE TABLE t (id SERIAL PRIMARY KEY);", Dialect::Postgres),
            ("CREATE TABLE t (id NUMBER(10));", Dialect::Oracle),
        ];
        for (sql, expected) in cases {
            assert_eq!(Dialect::detect(sql).unwrap(), expected, "{}", sql);
        }
    }

    #[test]
    fn test_detect_priority_order() {
        // AUTO_INCREMENT outranks the postgres cast.
        let sql = "CREATE TABLE t (id INT AUTO_INCREMENT, d TEXT DEFAULT 'x'::text);";
        assert_eq!(Dialect::detect(sql).unwrap(), Dialect::MySql);
    }

    #[test]
    fn test_detect_secondary_signals() {
        assert_eq!(Dialect::detect("CREATE TABLE [dbo].[t] (a INT)\nGO").unwrap(), Dialect::SqlServer);
        assert_eq!(Dialect::detect("CREATE EXTENSION hstore;").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::detect("CREATE TABLE t (a VARCHAR2(10));").unwrap(), Dialect::Oracle);
        assert!(matches!(
            Dialect::detect("CREATE TABLE t (a INT);"),
            Err(ConvertError::UndetectedDialect)
        ));
    }

    #[test]
    fn test_create_parser_registry() {
        let parser = create_parser("sqlite").unwrap();
        assert_eq!(parser.dialect(), Dialect::Sqlite);
        assert!(create_parser("access").is_none());
    }

    #[test]
    fn test_caps_are_consistent() {
        for dialect in Dialect::ALL {
            let caps = dialect.caps();
            assert_eq!(caps.dialect, dialect);
            assert!(!caps.terminator.is_empty());
        }
    }
}
