//! End-to-end conversion: read a dump, detect its dialect, parse, and
//! regenerate it for another dialect.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::dialect::Dialect;
use crate::error::ConvertResult;
use crate::generator;
use crate::parser::{self, UnrecognizedPolicy};
use crate::pool::WorkerPool;
use crate::schema::Schema;

/// How a conversion parses its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Source dialect; detected from the text when `None`.
    pub from: Option<Dialect>,
    pub policy: UnrecognizedPolicy,
    /// Parse with a [`WorkerPool`] instead of sequentially.
    pub parallel: bool,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ConvertOptions {
    fn from(config: &Config) -> Self {
        Self {
            from: None,
            policy: config.unrecognized,
            parallel: config.parallel,
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Result of converting one document.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub source: Dialect,
    pub target: Dialect,
    pub schema: Schema,
    pub sql: String,
}

/// Convert `sql` from one dialect to another.
pub fn convert(sql: &str, from: Dialect, to: Dialect) -> ConvertResult<String> {
    let schema = parser::parse_document(from, sql, UnrecognizedPolicy::Skip)?;
    generator::generate(to, &schema)
}

/// Convert a document held in memory, honoring `opts`.
pub async fn convert_text(sql: String, to: Dialect, opts: &ConvertOptions) -> ConvertResult<Conversion> {
    let source = match opts.from {
        Some(dialect) => dialect,
        None => {
            let detected = Dialect::detect(&sql)?;
            info!("Detected source dialect: {}", detected);
            detected
        }
    };

    let schema = if opts.parallel {
        WorkerPool::new(source, opts.workers)
            .with_queue_capacity(opts.queue_capacity)
            .with_policy(opts.policy)
            .parse_schema(Cursor::new(sql))
            .await?
    } else {
        parser::parse_document(source, &sql, opts.policy)?
    };
    debug!(
        "Parsed {} tables, {} views, {} routines",
        schema.tables.len(),
        schema.views.len(),
        schema.functions.len()
    );

    let sql = generator::generate(to, &schema)?;
    Ok(Conversion {
        source,
        target: to,
        schema,
        sql,
    })
}

/// Read and convert the file at `input`. Nothing is written.
pub async fn convert_file(input: &Path, to: Dialect, opts: &ConvertOptions) -> ConvertResult<Conversion> {
    let sql = fs::read_to_string(input)?;
    convert_text(sql, to, opts).await
}

/// `<stem>_<dialect><ext>` next to the input file.
pub fn output_path_for(input: &Path, target: Dialect) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}_{}", stem, target.name());
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("dumps/shop.sql"), Dialect::Postgres),
            PathBuf::from("dumps/shop_postgres.sql")
        );
        assert_eq!(
            output_path_for(Path::new("schema"), Dialect::SqlServer),
            PathBuf::from("schema_sqlserver")
        );
        assert_eq!(
            output_path_for(Path::new("a.b.ddl"), Dialect::Sqlite),
            PathBuf::from("a.b_sqlite.ddl")
        );
    }

    #[test]
    fn test_convert_mysql_to_sqlite() {
        let sql = "CREATE TABLE t (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(10) NOT NULL) ENGINE=InnoDB;";
        let out = convert(sql, Dialect::MySql, Dialect::Sqlite).unwrap();
        assert!(out.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(out.contains("name VARCHAR(10) NOT NULL"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_convert_text_detects_source() {
        let sql = "CREATE TABLE t (id SERIAL PRIMARY KEY);".to_string();
        let conversion = convert_text(sql, Dialect::SqlServer, &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(conversion.source, Dialect::Postgres);
        assert!(conversion.sql.contains("IDENTITY(1,1)"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parallel_matches_sequential() {
        let sql: String = (0..12)
            .map(|i| format!("CREATE TABLE t{} (id INT NOT NULL);\n", i))
            .collect();
        let sequential = ConvertOptions {
            from: Some(Dialect::Postgres),
            ..ConvertOptions::default()
        };
        let parallel = ConvertOptions {
            parallel: true,
            workers: 3,
            ..sequential.clone()
        };
        let a = convert_text(sql.clone(), Dialect::MySql, &sequential).await.unwrap();
        let b = convert_text(sql, Dialect::MySql, &parallel).await.unwrap();
        assert_eq!(a.schema.tables.len(), b.schema.tables.len());
        for line in a.sql.lines() {
            assert!(b.sql.contains(line));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_undetectable_source() {
        let err = convert_text("CREATE TABLE t (id INT);".into(), Dialect::MySql, &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UndetectedDialect));
    }
}
