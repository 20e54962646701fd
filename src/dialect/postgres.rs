//! PostgreSQL.

use super::types::{as_written, with_length, with_precision};
use super::{AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps};
use crate::schema::DataType;

pub static CAPS: DialectCaps = DialectCaps {
    dialect: Dialect::Postgres,
    quote_open: '"',
    quote_close: '"',
    max_identifier_len: Some(63),
    default_namespace: "public",
    reserved: RESERVED,
    folds_to_lower: true,
    auto_increment: AutoIncrementStyle::Serial,
    comment_style: CommentStyle::CommentOn,
    block_style: BlockStyle::Terminator,
    supports_sequences: true,
    supports_routines: true,
    supports_enum_types: true,
    supports_inline_enums: false,
    supports_composite_types: true,
    supports_namespaces: true,
    supports_materialized_views: true,
    supports_extensions: true,
    supports_grants: true,
    supports_partial_indexes: true,
    supports_bitmap_indexes: false,
    supports_clustered_indexes: false,
    tablespace_clause: Some("TABLESPACE"),
    boolean_literals: true,
    cast_operator: true,
    terminator: ";",
    batch_separator: None,
    backslash_escapes: false,
    type_name,
};

const RESERVED: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH", "CASE",
    "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FETCH",
    "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INTERSECT", "INTO",
    "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT",
    "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION",
    "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
];

fn type_name(dt: &DataType) -> String {
    match dt.name.as_str() {
        "INT" => "INTEGER".to_string(),
        "BIGINT" | "SMALLINT" | "BOOLEAN" | "TEXT" | "REAL" | "DATE" | "TIME" | "TIMESTAMP"
        | "UUID" | "JSON" => dt.name.clone(),
        "TINYINT" => "SMALLINT".to_string(),
        "VARCHAR" => with_length("VARCHAR", dt, None),
        "CHAR" => with_length("CHAR", dt, None),
        "DECIMAL" => with_precision("NUMERIC", dt),
        "DOUBLE" => "DOUBLE PRECISION".to_string(),
        "TIMESTAMPTZ" => "TIMESTAMP WITH TIME ZONE".to_string(),
        "BLOB" | "VARBINARY" => "BYTEA".to_string(),
        _ => as_written(dt),
    }
}

/// The `SERIAL` family type standing in for an auto-increment integer.
pub(crate) fn serial_name(dt: &DataType) -> &'static str {
    match dt.name.as_str() {
        "BIGINT" => "BIGSERIAL",
        "SMALLINT" | "TINYINT" => "SMALLSERIAL",
        _ => "SERIAL",
    }
}
