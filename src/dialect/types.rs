//! Canonical data types.
//!
//! Parsers map every dialect spelling onto a small shared vocabulary; each
//! dialect file renders that vocabulary back in its own spelling. Names
//! outside the vocabulary (user-defined types, arrays, exotic built-ins) pass
//! through as written.

use super::Dialect;
use crate::schema::DataType;

/// One argument in a type's parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Number(u32),
    /// `MAX` in `VARCHAR(MAX)`.
    Max,
    /// A string literal, as in `ENUM('a', 'b')`.
    Text(String),
    Other,
}

/// Result of mapping a written type onto the canonical vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalType {
    pub data_type: DataType,
    /// The type itself implies auto-increment (`SERIAL`).
    pub auto_increment: bool,
    /// Allowed values of an inline `ENUM`/`SET` type.
    pub allowed_values: Option<Vec<String>>,
}

impl CanonicalType {
    fn plain(data_type: DataType) -> Self {
        Self {
            data_type,
            auto_increment: false,
            allowed_values: None,
        }
    }

    fn serial(name: &str) -> Self {
        Self {
            auto_increment: true,
            ..Self::plain(DataType::new(name))
        }
    }
}

fn sized(name: &str, args: &[TypeArg]) -> DataType {
    let mut numbers = args.iter().filter_map(|a| match a {
        TypeArg::Number(n) => Some(*n),
        _ => None,
    });
    DataType {
        name: name.to_string(),
        length: numbers.next(),
        scale: numbers.next(),
    }
}

fn has_max(args: &[TypeArg]) -> bool {
    args.iter().any(|a| *a == TypeArg::Max)
}

fn first_number(args: &[TypeArg]) -> Option<u32> {
    args.iter().find_map(|a| match a {
        TypeArg::Number(n) => Some(*n),
        _ => None,
    })
}

/// Map a type as written in `dialect` onto the canonical vocabulary.
///
/// `name` is the full type name with multi-word forms already joined by a
/// single space (`DOUBLE PRECISION`, `TIMESTAMP WITH TIME ZONE`).
pub fn canonicalize(dialect: Dialect, name: &str, args: &[TypeArg]) -> CanonicalType {
    let upper = name.to_uppercase();
    let plain = |n: &str| CanonicalType::plain(DataType::new(n));

    match upper.as_str() {
        "INT" | "INTEGER" | "INT4" | "MEDIUMINT" | "PLS_INTEGER" | "BINARY_INTEGER" => plain("INT"),
        "BIGINT" | "INT8" => plain("BIGINT"),
        "SMALLINT" | "INT2" => plain("SMALLINT"),
        "TINYINT" if dialect == Dialect::MySql && first_number(args) == Some(1) => plain("BOOLEAN"),
        "TINYINT" => plain("TINYINT"),
        "BOOL" | "BOOLEAN" => plain("BOOLEAN"),
        "BIT" if dialect == Dialect::SqlServer => plain("BOOLEAN"),
        "BIT" if matches!(first_number(args), None | Some(1)) => plain("BOOLEAN"),

        "SERIAL" if dialect == Dialect::MySql => CanonicalType::serial("BIGINT"),
        "SERIAL" | "SERIAL4" => CanonicalType::serial("INT"),
        "BIGSERIAL" | "SERIAL8" => CanonicalType::serial("BIGINT"),
        "SMALLSERIAL" | "SERIAL2" => CanonicalType::serial("SMALLINT"),

        "VARCHAR" | "NVARCHAR" | "VARCHAR2" | "NVARCHAR2" | "CHARACTER VARYING"
        | "NATIONAL CHARACTER VARYING" | "NCHAR VARYING" | "CHAR VARYING" => {
            if has_max(args) {
                plain("TEXT")
            } else {
                CanonicalType::plain(sized("VARCHAR", args))
            }
        }
        "CHAR" | "NCHAR" | "CHARACTER" | "NATIONAL CHARACTER" | "BPCHAR" => {
            CanonicalType::plain(sized("CHAR", args))
        }
        "TEXT" | "NTEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "CLOB" | "NCLOB" | "LONG"
        | "LONG VARCHAR" => plain("TEXT"),

        "DECIMAL" | "NUMERIC" | "DEC" => CanonicalType::plain(sized("DECIMAL", args)),
        "NUMBER" => oracle_number(args),
        "FLOAT" => match first_number(args) {
            Some(bits) if bits <= 24 => plain("REAL"),
            Some(_) => plain("DOUBLE"),
            None if matches!(dialect, Dialect::MySql | Dialect::Sqlite) => plain("REAL"),
            None => plain("DOUBLE"),
        },
        "REAL" | "FLOAT4" | "BINARY_FLOAT" => plain("REAL"),
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" | "BINARY_DOUBLE" => plain("DOUBLE"),

        "DATE" => plain("DATE"),
        "TIME" | "TIMETZ" | "TIME WITH TIME ZONE" => plain("TIME"),
        "DATETIME" | "DATETIME2" | "SMALLDATETIME" | "TIMESTAMP" => plain("TIMESTAMP"),
        "TIMESTAMPTZ" | "DATETIMEOFFSET" | "TIMESTAMP WITH TIME ZONE"
        | "TIMESTAMP WITH LOCAL TIME ZONE" => plain("TIMESTAMPTZ"),

        "BLOB" | "BYTEA" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "IMAGE" | "LONG RAW" => {
            plain("BLOB")
        }
        "VARBINARY" | "BINARY" | "RAW" => {
            if has_max(args) {
                plain("BLOB")
            } else {
                CanonicalType::plain(sized("VARBINARY", args))
            }
        }
        "UUID" | "UNIQUEIDENTIFIER" => plain("UUID"),
        "JSON" | "JSONB" => plain("JSON"),

        "ENUM" | "SET" => {
            let values = args
                .iter()
                .filter_map(|a| match a {
                    TypeArg::Text(v) => Some(v.clone()),
                    _ => None,
                })
                .collect();
            CanonicalType {
                allowed_values: Some(values),
                ..CanonicalType::plain(DataType::new("VARCHAR").with_length(255))
            }
        }

        _ => CanonicalType::plain(sized(name, args)),
    }
}

/// Oracle `NUMBER(p[,s])`: the precisions other dialects' integers map to
/// come back as those integers; everything else is a decimal.
fn oracle_number(args: &[TypeArg]) -> CanonicalType {
    let data_type = sized("DECIMAL", args);
    let integer = match (data_type.length, data_type.scale) {
        (Some(p), None | Some(0)) => match p {
            1 => Some("BOOLEAN"),
            3 => Some("TINYINT"),
            5 => Some("SMALLINT"),
            10 => Some("INT"),
            19 => Some("BIGINT"),
            _ => None,
        },
        _ => None,
    };
    match integer {
        Some(name) => CanonicalType::plain(DataType::new(name)),
        None => CanonicalType::plain(data_type),
    }
}

/// Render `dt` with its own name and arguments.
pub(super) fn as_written(dt: &DataType) -> String {
    dt.to_string()
}

/// Render `name` with the type's length, or `default` when it has none.
pub(super) fn with_length(name: &str, dt: &DataType, default: Option<u32>) -> String {
    match dt.length.or(default) {
        Some(len) => format!("{}({})", name, len),
        None => name.to_string(),
    }
}

/// Render `name` with precision and scale when present.
pub(super) fn with_precision(name: &str, dt: &DataType) -> String {
    DataType {
        name: name.to_string(),
        ..dt.clone()
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canon(dialect: Dialect, name: &str, args: &[TypeArg]) -> String {
        canonicalize(dialect, name, args).data_type.to_string()
    }

    #[test]
    fn test_integer_spellings() {
        assert_eq!(canon(Dialect::Postgres, "integer", &[]), "INT");
        assert_eq!(canon(Dialect::Postgres, "int8", &[]), "BIGINT");
        assert_eq!(canon(Dialect::MySql, "MEDIUMINT", &[TypeArg::Number(9)]), "INT");
    }

    #[test]
    fn test_mysql_tinyint_one_is_boolean() {
        assert_eq!(canon(Dialect::MySql, "tinyint", &[TypeArg::Number(1)]), "BOOLEAN");
        assert_eq!(canon(Dialect::MySql, "tinyint", &[TypeArg::Number(4)]), "TINYINT");
        assert_eq!(canon(Dialect::SqlServer, "bit", &[]), "BOOLEAN");
    }

    #[test]
    fn test_oracle_number_precisions() {
        let n = |p| canon(Dialect::Oracle, "NUMBER", &[TypeArg::Number(p)]);
        assert_eq!(n(1), "BOOLEAN");
        assert_eq!(n(5), "SMALLINT");
        assert_eq!(n(10), "INT");
        assert_eq!(n(19), "BIGINT");
        assert_eq!(n(12), "DECIMAL(12)");
        assert_eq!(
            canon(Dialect::Oracle, "NUMBER", &[TypeArg::Number(10), TypeArg::Number(2)]),
            "DECIMAL(10,2)"
        );
        assert_eq!(canon(Dialect::Oracle, "NUMBER", &[]), "DECIMAL");
    }

    #[test]
    fn test_serial_implies_auto_increment() {
        let ty = canonicalize(Dialect::Postgres, "bigserial", &[]);
        assert_eq!(ty.data_type.name, "BIGINT");
        assert!(ty.auto_increment);
    }

    #[test]
    fn test_max_lengths() {
        assert_eq!(canon(Dialect::SqlServer, "NVARCHAR", &[TypeArg::Max]), "TEXT");
        assert_eq!(canon(Dialect::SqlServer, "VARBINARY", &[TypeArg::Max]), "BLOB");
        assert_eq!(canon(Dialect::SqlServer, "NVARCHAR", &[TypeArg::Number(50)]), "VARCHAR(50)");
    }

    #[test]
    fn test_enum_values() {
        let ty = canonicalize(
            Dialect::MySql,
            "enum",
            &[TypeArg::Text("a".into()), TypeArg::Text("b".into())],
        );
        assert_eq!(ty.data_type.to_string(), "VARCHAR(255)");
        assert_eq!(ty.allowed_values, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        assert_eq!(canon(Dialect::Postgres, "mood", &[]), "mood");
        assert_eq!(canon(Dialect::Postgres, "geometry", &[TypeArg::Number(4326)]), "geometry(4326)");
    }
}
