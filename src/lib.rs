//! # sqlport
//!
//! Convert SQL schema dumps between MySQL, PostgreSQL, SQLite, Oracle and
//! SQL Server.
//!
//! Text is split into statements by a streaming [`tokenizer`], each
//! statement is parsed into a dialect-neutral [`schema`] fragment, and the
//! assembled schema is rendered for the target by the [`generator`].
//!
//! ## Quick Example
//!
//! ```rust
//! use sqlport::prelude::*;
//!
//! let schema = sqlport::parse(
//!     Dialect::MySql,
//!     "CREATE TABLE t (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(10) NOT NULL);",
//! )?;
//! assert_eq!(schema.tables[0].columns.len(), 2);
//!
//! let sql = sqlport::generate(Dialect::Postgres, &schema)?;
//! assert!(sql.contains("id SERIAL PRIMARY KEY"));
//! # Ok::<(), ConvertError>(())
//! ```
//!
//! ## Modes
//!
//! | Entry point                  | Order          | Failure             |
//! |------------------------------|----------------|---------------------|
//! | [`parse`]                    | n/a            | fail-fast, no schema |
//! | [`stream::parse_stream`]     | source order   | stops at first error |
//! | [`pool::WorkerPool::run`]    | arrival order  | aborts the pool      |

pub mod config;
pub mod convert;
pub mod dialect;
pub mod diff;
pub mod driver;
pub mod error;
pub mod generator;
pub mod parser;
pub mod pool;
pub mod schema;
pub mod stream;
pub mod tokenizer;

pub mod prelude {
    pub use crate::convert::{convert, ConvertOptions, Conversion};
    pub use crate::dialect::{create_parser, Dialect, DialectParser, SchemaDialect};
    pub use crate::diff::{diff_schemas, ChangeKind, DiffKind, Difference};
    pub use crate::error::*;
    pub use crate::parser::UnrecognizedPolicy;
    pub use crate::pool::WorkerPool;
    pub use crate::schema::*;
    pub use crate::stream::{parse_stream, StreamStats};
}

use dialect::Dialect;
use error::ConvertResult;
use schema::Schema;

/// Parse a whole document, skipping unrecognized statements.
pub fn parse(dialect: Dialect, sql: &str) -> ConvertResult<Schema> {
    parser::parse_document(dialect, sql, parser::UnrecognizedPolicy::Skip)
}

/// Render a schema as a script for `dialect`.
pub fn generate(dialect: Dialect, schema: &Schema) -> ConvertResult<String> {
    generator::generate(dialect, schema)
}
