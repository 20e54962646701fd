//! SQLite.

use super::types::{as_written, with_length, with_precision};
use super::{AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps};
use crate::schema::DataType;

pub static CAPS: DialectCaps = DialectCaps {
    dialect: Dialect::Sqlite,
    quote_open: '"',
    quote_close: '"',
    max_identifier_len: None,
    default_namespace: "main",
    reserved: RESERVED,
    folds_to_lower: false,
    auto_increment: AutoIncrementStyle::SqliteAutoincrement,
    comment_style: CommentStyle::Unsupported,
    block_style: BlockStyle::Terminator,
    supports_sequences: false,
    supports_routines: false,
    supports_enum_types: false,
    supports_inline_enums: false,
    supports_composite_types: false,
    supports_namespaces: false,
    supports_materialized_views: false,
    supports_extensions: false,
    supports_grants: false,
    supports_partial_indexes: true,
    supports_bitmap_indexes: false,
    supports_clustered_indexes: false,
    tablespace_clause: None,
    boolean_literals: false,
    cast_operator: false,
    terminator: ";",
    batch_separator: None,
    backslash_escapes: false,
    type_name,
};

const RESERVED: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "AND", "AS", "ASC", "AUTOINCREMENT",
    "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN",
    "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DEFERRABLE", "DELETE",
    "DESC", "DISTINCT", "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXISTS", "FOR",
    "FOREIGN", "FROM", "GROUP", "HAVING", "IN", "INDEX", "INSERT", "INTERSECT", "INTO", "IS",
    "JOIN", "KEY", "LIKE", "LIMIT", "MATCH", "NOT", "NULL", "OF", "OFFSET", "ON", "OR", "ORDER",
    "PRIMARY", "REFERENCES", "REPLACE", "RESTRICT", "ROW", "SELECT", "SET", "TABLE", "THEN", "TO",
    "TRANSACTION", "TRIGGER", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN",
    "WHERE", "WITH",
];

fn type_name(dt: &DataType) -> String {
    match dt.name.as_str() {
        "INT" | "BIGINT" | "SMALLINT" | "TINYINT" => "INTEGER".to_string(),
        "BOOLEAN" | "TEXT" | "DATE" | "TIME" | "TIMESTAMP" | "BLOB" => dt.name.clone(),
        "VARCHAR" => with_length("VARCHAR", dt, None),
        "CHAR" => with_length("CHAR", dt, None),
        "DECIMAL" => with_precision("DECIMAL", dt),
        "REAL" | "DOUBLE" => "REAL".to_string(),
        "TIMESTAMPTZ" => "TIMESTAMP".to_string(),
        "VARBINARY" => "BLOB".to_string(),
        "UUID" | "JSON" => "TEXT".to_string(),
        _ => as_written(dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_type_names() {
        assert_eq!(type_name(&DataType::new("BIGINT")), "INTEGER");
        assert_eq!(type_name(&DataType::new("JSON")), "TEXT");
        assert_eq!(type_name(&DataType::new("VARCHAR").with_length(10)), "VARCHAR(10)");
    }
}
