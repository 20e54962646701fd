//! Microsoft SQL Server.

use super::types::{as_written, with_length, with_precision};
use super::{AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps};
use crate::schema::DataType;

pub static CAPS: DialectCaps = DialectCaps {
    dialect: Dialect::SqlServer,
    quote_open: '[',
    quote_close: ']',
    max_identifier_len: Some(128),
    default_namespace: "dbo",
    reserved: RESERVED,
    folds_to_lower: false,
    auto_increment: AutoIncrementStyle::Identity,
    comment_style: CommentStyle::ExtendedProperty,
    block_style: BlockStyle::Batch,
    supports_sequences: true,
    supports_routines: true,
    supports_enum_types: false,
    supports_inline_enums: false,
    supports_composite_types: true,
    supports_namespaces: true,
    supports_materialized_views: false,
    supports_extensions: false,
    supports_grants: true,
    supports_partial_indexes: true,
    supports_bitmap_indexes: false,
    supports_clustered_indexes: true,
    tablespace_clause: Some("ON"),
    boolean_literals: false,
    cast_operator: false,
    terminator: ";",
    batch_separator: Some("GO"),
    backslash_escapes: false,
    type_name,
};

const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUTHORIZATION", "BACKUP", "BEGIN",
    "BETWEEN", "BREAK", "BROWSE", "BULK", "BY", "CASCADE", "CASE", "CHECK", "CHECKPOINT", "CLOSE",
    "CLUSTERED", "COLLATE", "COLUMN", "COMMIT", "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE",
    "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "CURSOR", "DATABASE", "DEFAULT", "DELETE", "DENY", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "ESCAPE", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "EXIT", "FILE", "FOR", "FOREIGN", "FROM",
    "FULL", "FUNCTION", "GOTO", "GRANT", "GROUP", "HAVING", "IDENTITY", "IF", "IN", "INDEX",
    "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "KILL", "LEFT", "LIKE", "MERGE",
    "NOT", "NULL", "OF", "OFF", "ON", "OPEN", "OPTION", "OR", "ORDER", "OUTER", "PERCENT", "PLAN",
    "PRIMARY", "PRINT", "PROC", "PROCEDURE", "PUBLIC", "READ", "REFERENCES", "RETURN", "REVOKE",
    "RIGHT", "ROLLBACK", "RULE", "SCHEMA", "SELECT", "SET", "TABLE", "THEN", "TO", "TOP",
    "TRANSACTION", "TRIGGER", "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "USE", "USER", "VALUES",
    "VIEW", "WHEN", "WHERE", "WHILE", "WITH",
];

fn type_name(dt: &DataType) -> String {
    match dt.name.as_str() {
        "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "REAL" | "DATE" | "TIME" => dt.name.clone(),
        "BOOLEAN" => "BIT".to_string(),
        "VARCHAR" => with_length("NVARCHAR", dt, Some(255)),
        "CHAR" => with_length("NCHAR", dt, None),
        "TEXT" | "JSON" => "NVARCHAR(MAX)".to_string(),
        "DECIMAL" => with_precision("DECIMAL", dt),
        "DOUBLE" => "FLOAT".to_string(),
        "TIMESTAMP" => "DATETIME2".to_string(),
        "TIMESTAMPTZ" => "DATETIMEOFFSET".to_string(),
        "BLOB" => "VARBINARY(MAX)".to_string(),
        "VARBINARY" => with_length("VARBINARY", dt, Some(255)),
        "UUID" => "UNIQUEIDENTIFIER".to_string(),
        _ => as_written(dt),
    }
}
