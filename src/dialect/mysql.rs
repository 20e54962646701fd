//! MySQL / MariaDB.

use super::types::{as_written, with_length, with_precision};
use super::{AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps};
use crate::schema::DataType;

pub static CAPS: DialectCaps = DialectCaps {
    dialect: Dialect::MySql,
    quote_open: '`',
    quote_close: '`',
    max_identifier_len: Some(64),
    default_namespace: "",
    reserved: RESERVED,
    folds_to_lower: false,
    auto_increment: AutoIncrementStyle::Keyword,
    comment_style: CommentStyle::Inline,
    block_style: BlockStyle::DelimiterDirective,
    supports_sequences: false,
    supports_routines: true,
    supports_enum_types: false,
    supports_inline_enums: true,
    supports_composite_types: false,
    supports_namespaces: false,
    supports_materialized_views: false,
    supports_extensions: false,
    supports_grants: true,
    supports_partial_indexes: false,
    supports_bitmap_indexes: false,
    supports_clustered_indexes: false,
    tablespace_clause: None,
    boolean_literals: true,
    cast_operator: false,
    terminator: ";",
    batch_separator: None,
    backslash_escapes: true,
    type_name,
};

const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASCADE", "CASE", "CHANGE",
    "CHECK", "COLLATE", "COLUMN", "CONDITION", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT", "DELETE", "DESC", "DESCRIBE",
    "DISTINCT", "DIV", "DROP", "ELSE", "EXISTS", "EXPLAIN", "FALSE", "FOR", "FOREIGN", "FROM",
    "FULLTEXT", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTERVAL",
    "INTO", "IS", "JOIN", "KEY", "KEYS", "KILL", "LEFT", "LIKE", "LIMIT", "LINES", "LOAD", "LOCK",
    "MATCH", "MOD", "NOT", "NULL", "ON", "OPTION", "OR", "ORDER", "OUTER", "PRIMARY", "RANGE",
    "READ", "REFERENCES", "RENAME", "REPLACE", "REQUIRE", "RESTRICT", "REVOKE", "RIGHT", "ROW",
    "ROWS", "SCHEMA", "SELECT", "SET", "SHOW", "SPATIAL", "TABLE", "THEN", "TO", "TRIGGER", "TRUE",
    "UNION", "UNIQUE", "UPDATE", "USAGE", "USE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
    "WRITE",
];

fn type_name(dt: &DataType) -> String {
    match dt.name.as_str() {
        "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "DATE" | "TIME" | "TEXT" | "DOUBLE"
        | "JSON" | "BLOB" => dt.name.clone(),
        "BOOLEAN" => "TINYINT(1)".to_string(),
        "VARCHAR" => with_length("VARCHAR", dt, Some(255)),
        "CHAR" => with_length("CHAR", dt, None),
        "DECIMAL" => with_precision("DECIMAL", dt),
        "REAL" => "FLOAT".to_string(),
        "TIMESTAMP" | "TIMESTAMPTZ" => "DATETIME".to_string(),
        "VARBINARY" => with_length("VARBINARY", dt, Some(255)),
        "UUID" => "CHAR(36)".to_string(),
        _ => as_written(dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_type_names() {
        assert_eq!(type_name(&DataType::new("BOOLEAN")), "TINYINT(1)");
        assert_eq!(type_name(&DataType::new("VARCHAR")), "VARCHAR(255)");
        assert_eq!(type_name(&DataType::new("TIMESTAMPTZ")), "DATETIME");
        assert_eq!(type_name(&DataType::new("DECIMAL").with_length(10).with_scale(2)), "DECIMAL(10,2)");
    }
}
