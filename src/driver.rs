//! Migration driver interface.
//!
//! Applying scripts to a live database is left to implementors of
//! [`MigrationDriver`]; this crate only defines the contract and the
//! [`Migration`] value passed across it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::ConvertResult;
use crate::generator;
use crate::schema::Schema;

/// A versioned pair of forward and reverse scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub version: u64,
    pub name: String,
    pub up: String,
    pub down: String,
    /// Set by the driver once applied.
    pub applied_at: Option<DateTime<Utc>>,
}

impl Migration {
    pub fn new(
        version: u64,
        name: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            name: name.into(),
            up: up.into(),
            down: down.into(),
            applied_at: None,
        }
    }

    /// A migration creating `schema` in `dialect`; the reverse script drops
    /// its tables, dependents first.
    pub fn from_schema(
        version: u64,
        name: impl Into<String>,
        dialect: Dialect,
        schema: &Schema,
    ) -> ConvertResult<Self> {
        let up = generator::generate(dialect, schema)?;
        let drops: Vec<String> = schema
            .tables
            .iter()
            .rev()
            .map(|t| {
                let table = generator::quote_ident(&t.name, dialect.caps());
                format!("DROP TABLE {}{}", table, dialect.caps().terminator)
            })
            .collect();
        Ok(Self::new(version, name, up, drops.join("\n")))
    }

    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Bookkeeping and execution of migrations against one database.
pub trait MigrationDriver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create the bookkeeping table if it does not exist.
    fn create_migrations_table(&mut self) -> Result<(), Self::Error>;

    /// Applied migrations, in the order they were applied.
    fn get_applied_migrations(&mut self) -> Result<Vec<Migration>, Self::Error>;

    fn apply_migration(&mut self, migration: &Migration) -> Result<(), Self::Error>;

    fn rollback_migration(&mut self, migration: &Migration) -> Result<(), Self::Error>;
}

/// Migrations from `available` not yet applied, by ascending version.
pub fn pending<'m>(applied: &[Migration], available: &'m [Migration]) -> Vec<&'m Migration> {
    let mut pending: Vec<&Migration> = available
        .iter()
        .filter(|m| !applied.iter().any(|a| a.version == m.version))
        .collect();
    pending.sort_by_key(|m| m.version);
    pending
}
