//! Oracle.

use super::types::{as_written, with_length, with_precision};
use super::{AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps};
use crate::schema::DataType;

pub static CAPS: DialectCaps = DialectCaps {
    dialect: Dialect::Oracle,
    quote_open: '"',
    quote_close: '"',
    max_identifier_len: Some(128),
    default_namespace: "",
    reserved: RESERVED,
    folds_to_lower: false,
    auto_increment: AutoIncrementStyle::GeneratedIdentity,
    comment_style: CommentStyle::CommentOn,
    block_style: BlockStyle::SlashLine,
    supports_sequences: true,
    supports_routines: true,
    supports_enum_types: false,
    supports_inline_enums: false,
    supports_composite_types: true,
    supports_namespaces: false,
    supports_materialized_views: true,
    supports_extensions: false,
    supports_grants: true,
    supports_partial_indexes: false,
    supports_bitmap_indexes: true,
    supports_clustered_indexes: false,
    tablespace_clause: Some("TABLESPACE"),
    boolean_literals: false,
    cast_operator: false,
    terminator: ";",
    batch_separator: Some("/"),
    backslash_escapes: false,
    type_name,
};

const RESERVED: &[&str] = &[
    "ACCESS", "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUDIT", "BETWEEN", "BY", "CHAR",
    "CHECK", "CLUSTER", "COLUMN", "COMMENT", "COMPRESS", "CONNECT", "CREATE", "CURRENT", "DATE",
    "DECIMAL", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "EXCLUSIVE", "EXISTS",
    "FILE", "FLOAT", "FOR", "FROM", "GRANT", "GROUP", "HAVING", "IDENTIFIED", "IMMEDIATE", "IN",
    "INCREMENT", "INDEX", "INITIAL", "INSERT", "INTEGER", "INTERSECT", "INTO", "IS", "LEVEL",
    "LIKE", "LOCK", "LONG", "MAXEXTENTS", "MINUS", "MODE", "MODIFY", "NOAUDIT", "NOCOMPRESS",
    "NOT", "NOWAIT", "NULL", "NUMBER", "OF", "OFFLINE", "ON", "ONLINE", "OPTION", "OR", "ORDER",
    "PCTFREE", "PRIOR", "PUBLIC", "RAW", "RENAME", "RESOURCE", "REVOKE", "ROW", "ROWID", "ROWNUM",
    "ROWS", "SELECT", "SESSION", "SET", "SHARE", "SIZE", "SMALLINT", "START", "SYNONYM",
    "SYSDATE", "TABLE", "THEN", "TO", "TRIGGER", "UID", "UNION", "UNIQUE", "UPDATE", "USER",
    "VALIDATE", "VALUES", "VARCHAR", "VARCHAR2", "VIEW", "WHENEVER", "WHERE", "WITH",
];

fn type_name(dt: &DataType) -> String {
    match dt.name.as_str() {
        "INT" => "NUMBER(10)".to_string(),
        "BIGINT" => "NUMBER(19)".to_string(),
        "SMALLINT" => "NUMBER(5)".to_string(),
        "TINYINT" => "NUMBER(3)".to_string(),
        "BOOLEAN" => "NUMBER(1)".to_string(),
        "VARCHAR" => with_length("VARCHAR2", dt, Some(4000)),
        "CHAR" => with_length("CHAR", dt, None),
        "TEXT" | "JSON" => "CLOB".to_string(),
        "DECIMAL" => with_precision("NUMBER", dt),
        "REAL" => "BINARY_FLOAT".to_string(),
        "DOUBLE" => "BINARY_DOUBLE".to_string(),
        "DATE" | "BLOB" => dt.name.clone(),
        "TIME" | "TIMESTAMP" => "TIMESTAMP".to_string(),
        "TIMESTAMPTZ" => "TIMESTAMP WITH TIME ZONE".to_string(),
        "VARBINARY" => with_length("RAW", dt, Some(2000)),
        "UUID" => "CHAR(36)".to_string(),
        _ => as_written(dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_type_names() {
        assert_eq!(type_name(&DataType::new("INT")), "NUMBER(10)");
        assert_eq!(type_name(&DataType::new("VARCHAR").with_length(20)), "VARCHAR2(20)");
        assert_eq!(type_name(&DataType::new("DECIMAL").with_length(12).with_scale(2)), "NUMBER(12,2)");
        assert_eq!(type_name(&DataType::new("TEXT")), "CLOB");
    }
}
