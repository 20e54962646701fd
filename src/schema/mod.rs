//! Dialect-neutral schema model.
//!
//! Every dialect parses into these types and renders from them. Values are
//! plain data: a [`Schema`] returned from a parser is owned by the caller and
//! never touched again by the library.
//!
//! ```
//! use sqlport::schema::{Column, DataType, Table};
//!
//! let table = Table::new("users")
//!     .column(Column::new("id", DataType::new("INT")).auto_increment().primary_key())
//!     .column(Column::new("email", DataType::new("VARCHAR").with_length(255)).not_null());
//!
//! assert_eq!(table.columns[1].order, 2);
//! assert!(!table.columns[0].is_nullable);
//! ```

mod object;

pub use object::{AlterAction, ObjectKind, SchemaAssembler, SchemaObject, TableAlteration};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete database schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Database or catalog name, if the dump declared one.
    pub name: Option<String>,
    /// Namespaces declared with `CREATE SCHEMA`.
    pub namespaces: Vec<String>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub functions: Vec<Function>,
    pub triggers: Vec<Trigger>,
    pub sequences: Vec<Sequence>,
    pub types: Vec<TypeDef>,
    pub extensions: Vec<Extension>,
    pub permissions: Vec<Permission>,
}

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    /// Empty means the default namespace.
    pub namespace: String,
    pub name: String,
}

/// A table definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub namespace: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
    pub tablespace: Option<String>,
    pub comment: Option<String>,
}

/// A column type as written, reduced to base name plus size arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    pub length: Option<u32>,
    pub scale: Option<u32>,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub auto_increment: bool,
    /// Raw default expression text.
    pub default_value: Option<String>,
    pub check_expression: Option<String>,
    pub comment: Option<String>,
    /// 1-based declaration position.
    pub order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

/// Target of a foreign key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// May be empty when the source did not name it.
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub reference: Option<Reference>,
    pub check_expression: Option<String>,
}

/// An index definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    /// Column names or raw expressions, in key order.
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_clustered: bool,
    pub is_bitmap: bool,
    /// Access method or index flavor (`BTREE`, `GIN`, `FULLTEXT`, ...).
    pub algorithm: Option<String>,
    pub filter: Option<String>,
    pub tablespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub namespace: String,
    pub columns: Vec<String>,
    pub definition: String,
    pub is_materialized: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Empty for unnamed Postgres parameters.
    pub name: String,
    pub data_type: DataType,
    pub direction: ParamDirection,
}

/// A stored function or procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub namespace: String,
    pub parameters: Vec<Parameter>,
    /// `None` for procedures.
    pub return_type: Option<DataType>,
    pub body: String,
    pub language: String,
    pub is_procedure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    pub namespace: String,
    pub table: ObjectName,
    pub timing: TriggerTiming,
    /// Declaration order; never empty for parsed triggers.
    pub events: Vec<TriggerEvent>,
    pub condition: Option<String>,
    pub body: String,
    pub for_each_row: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub namespace: String,
    pub start: Option<i128>,
    pub increment: Option<i128>,
    pub min_value: Option<i128>,
    pub max_value: Option<i128>,
    pub cache: Option<i128>,
    pub cycle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Enum,
    Composite,
}

/// A user-defined type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    /// Parenthesized body as written: `('a', 'b')` or `(x INT, y INT)`.
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub schema: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionKind {
    Grant,
    Revoke,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub kind: PermissionKind,
    pub privileges: Vec<String>,
    /// Object reference as written (`TABLE users`, `shop.*`); empty for role grants.
    pub object: String,
    pub grantee: String,
    pub with_grant: bool,
}

// ============================================================================
// Schema
// ============================================================================

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the schema holds no objects at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.namespaces.is_empty()
            && self.tables.is_empty()
            && self.views.is_empty()
            && self.functions.is_empty()
            && self.triggers.is_empty()
            && self.sequences.is_empty()
            && self.types.is_empty()
            && self.extensions.is_empty()
            && self.permissions.is_empty()
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Find a table by name, ignoring case. An empty namespace matches any.
    pub fn table(&self, name: &ObjectName) -> Option<&Table> {
        self.tables.iter().find(|t| t.matches(name))
    }

    pub fn table_mut(&mut self, name: &ObjectName) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.matches(name))
    }

    /// Look up a user-defined enum type by name.
    pub fn enum_type(&self, name: &str) -> Option<&TypeDef> {
        self.types
            .iter()
            .find(|t| t.kind == TypeKind::Enum && t.name.eq_ignore_ascii_case(name))
    }
}

impl ObjectName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }

    /// Case-insensitive key used for lookups and diffs.
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_lowercase()
        } else {
            format!("{}.{}", self.namespace.to_lowercase(), self.name.to_lowercase())
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

// ============================================================================
// Table
// ============================================================================

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Append a column, assigning its declaration order.
    pub fn column(mut self, col: Column) -> Self {
        self.push_column(col);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn qualified_name(&self) -> ObjectName {
        ObjectName::new(self.namespace.clone(), self.name.clone())
    }

    /// Name match ignoring case; an empty namespace on either side matches.
    pub fn matches(&self, name: &ObjectName) -> bool {
        self.name.eq_ignore_ascii_case(&name.name)
            && (name.namespace.is_empty()
                || self.namespace.is_empty()
                || self.namespace.eq_ignore_ascii_case(&name.namespace))
    }

    pub fn push_column(&mut self, mut col: Column) {
        col.order = self.columns.len() as u32 + 1;
        self.columns.push(col);
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn find_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Add a table-level constraint, folding single-column keys onto columns.
    ///
    /// Primary key columns become NOT NULL. A single-column PRIMARY KEY or
    /// UNIQUE constraint sets the column flag; if it is unnamed the flag is
    /// the only record of it.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        match constraint.kind {
            ConstraintKind::PrimaryKey => {
                let single = constraint.columns.len() == 1;
                for name in &constraint.columns {
                    if let Some(col) = self.find_column_mut(name) {
                        col.is_nullable = false;
                        col.is_primary_key = true;
                    }
                }
                if single && constraint.name.is_empty() {
                    return;
                }
            }
            ConstraintKind::Unique if constraint.columns.len() == 1 => {
                if let Some(col) = self.find_column_mut(&constraint.columns[0]) {
                    col.is_unique = true;
                    if constraint.name.is_empty() {
                        return;
                    }
                }
            }
            _ => {}
        }
        self.constraints.push(constraint);
    }

    /// The primary key column names, from the constraint or the column flags.
    pub fn primary_key_columns(&self) -> Vec<String> {
        if let Some(pk) = self
            .constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
        {
            return pk.columns.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// True when a constraint of `kind` covers exactly `column`.
    pub fn has_single_column_constraint(&self, kind: ConstraintKind, column: &str) -> bool {
        self.constraints.iter().any(|c| {
            c.kind == kind && c.columns.len() == 1 && c.columns[0].eq_ignore_ascii_case(column)
        })
    }
}

// ============================================================================
// DataType
// ============================================================================

impl DataType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
            scale: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// True for the canonical integer types.
    pub fn is_integer(&self) -> bool {
        ["TINYINT", "SMALLINT", "INT", "BIGINT"]
            .iter()
            .any(|n| self.is(n))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.length, self.scale) {
            (Some(len), Some(scale)) => write!(f, "{}({},{})", self.name, len, scale),
            (Some(len), None) => write!(f, "{}({})", self.name, len),
            _ => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// Column
// ============================================================================

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_nullable: true,
            is_primary_key: false,
            is_unique: false,
            auto_increment: false,
            default_value: None,
            check_expression: None,
            comment: None,
            order: 0,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.is_nullable = false;
        self
    }

    pub fn default(mut self, val: impl Into<String>) -> Self {
        self.default_value = Some(val.into());
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check_expression = Some(expr.into());
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }
}

// ============================================================================
// Constraint / Index
// ============================================================================

impl Constraint {
    fn with_kind(kind: ConstraintKind, name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
            reference: None,
            check_expression: None,
        }
    }

    pub fn primary_key(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self::with_kind(ConstraintKind::PrimaryKey, name, columns)
    }

    pub fn unique(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self::with_kind(ConstraintKind::Unique, name, columns)
    }

    pub fn foreign_key(name: impl Into<String>, columns: Vec<String>, reference: Reference) -> Self {
        Self {
            reference: Some(reference),
            ..Self::with_kind(ConstraintKind::ForeignKey, name, columns)
        }
    }

    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            check_expression: Some(expression.into()),
            ..Self::with_kind(ConstraintKind::Check, name, Vec::new())
        }
    }

    /// Key used to match unnamed constraints: `kind(col,...)`.
    pub fn key(&self) -> String {
        if !self.name.is_empty() {
            return self.name.to_lowercase();
        }
        let mut key = format!("{}({})", self.kind, self.columns.join(",")).to_lowercase();
        if let Some(expr) = &self.check_expression {
            key.push_str(&format!(" {}", expr.to_lowercase()));
        }
        key
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PrimaryKey => "PRIMARY KEY",
            Self::ForeignKey => "FOREIGN KEY",
            Self::Unique => "UNIQUE",
            Self::Check => "CHECK",
        };
        write!(f, "{}", s)
    }
}

impl Reference {
    pub fn new(table: ObjectName, columns: Vec<String>) -> Self {
        Self {
            table,
            columns,
            on_delete: None,
            on_update: None,
        }
    }
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            ..Default::default()
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

// ============================================================================
// Routines, triggers, types
// ============================================================================

impl fmt::Display for ParamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
            Self::InOut => write!(f, "INOUT"),
        }
    }
}

impl Trigger {
    /// The primary triggering event.
    pub fn event(&self) -> TriggerEvent {
        self.events.first().copied().unwrap_or(TriggerEvent::Insert)
    }
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "BEFORE"),
            Self::After => write!(f, "AFTER"),
            Self::InsteadOf => write!(f, "INSTEAD OF"),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl TypeDef {
    /// Labels of an enum type, unquoted, in declaration order.
    pub fn enum_labels(&self) -> Vec<String> {
        if self.kind != TypeKind::Enum {
            return Vec::new();
        }
        crate::parser::lexer::lex(&self.definition)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|t| t.string_value())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_is_declaration_order() {
        let table = Table::new("t")
            .column(Column::new("b", DataType::new("INT")))
            .column(Column::new("a", DataType::new("INT")));
        assert_eq!(table.columns[0].name, "b");
        assert_eq!(table.columns[0].order, 1);
        assert_eq!(table.columns[1].order, 2);
    }

    #[test]
    fn test_auto_increment_implies_not_null() {
        let col = Column::new("id", DataType::new("INT")).auto_increment();
        assert!(!col.is_nullable);
    }

    #[test]
    fn test_unnamed_single_pk_folds_into_column() {
        let mut table = Table::new("t").column(Column::new("id", DataType::new("INT")));
        table.add_constraint(Constraint::primary_key("", vec!["id".into()]));
        assert!(table.constraints.is_empty());
        assert!(table.columns[0].is_primary_key);
        assert!(!table.columns[0].is_nullable);
    }

    #[test]
    fn test_named_pk_is_kept() {
        let mut table = Table::new("t").column(Column::new("id", DataType::new("INT")));
        table.add_constraint(Constraint::primary_key("pk_t", vec!["id".into()]));
        assert_eq!(table.constraints.len(), 1);
        assert!(table.columns[0].is_primary_key);
    }

    #[test]
    fn test_composite_pk_is_kept() {
        let mut table = Table::new("t")
            .column(Column::new("a", DataType::new("INT")))
            .column(Column::new("b", DataType::new("INT")));
        table.add_constraint(Constraint::primary_key("", vec!["a".into(), "b".into()]));
        assert_eq!(table.constraints.len(), 1);
        assert_eq!(table.primary_key_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_table_matches_ignores_default_namespace() {
        let table = Table::new("Users");
        assert!(table.matches(&ObjectName::new("sales", "users")));
        let table = Table::new("users").in_namespace("sales");
        assert!(table.matches(&ObjectName::unqualified("USERS")));
        assert!(!table.matches(&ObjectName::new("hr", "users")));
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::new("DECIMAL").with_length(10).with_scale(2).to_string(), "DECIMAL(10,2)");
        assert_eq!(DataType::new("TEXT").to_string(), "TEXT");
    }

    #[test]
    fn test_enum_labels() {
        let ty = TypeDef {
            name: "mood".into(),
            namespace: String::new(),
            kind: TypeKind::Enum,
            definition: "('sad', 'it''s ok')".into(),
        };
        assert_eq!(ty.enum_labels(), vec!["sad", "it's ok"]);
    }
}
