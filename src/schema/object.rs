//! Schema fragments produced by single statements, and their assembly.
//!
//! Every extraction routine returns one [`SchemaObject`]. Fragments that refer
//! to other objects (an index, a comment, an `ALTER TABLE`) carry the target
//! table's name; [`SchemaAssembler`] links them once everything has arrived,
//! so fragments may be fed to it in any order.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::{
    Column, Constraint, Extension, Function, Index, ObjectName, Permission, Schema, Sequence,
    Table, Trigger, TypeDef, View,
};

/// One statement's worth of schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum SchemaObject {
    /// `CREATE DATABASE`, `USE`, `ALTER SESSION SET CURRENT_SCHEMA`.
    Database(String),
    /// `CREATE SCHEMA`.
    Namespace(String),
    Type(TypeDef),
    Extension(Extension),
    Sequence(Sequence),
    Table(Table),
    Index { table: ObjectName, index: Index },
    Alteration(TableAlteration),
    View(View),
    Function(Function),
    Trigger(Trigger),
    Permission(Permission),
    /// A statement no extraction routine models, kept for inspection.
    Unrecognized { category: String, text: String },
}

/// The tag of a [`SchemaObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Database,
    Namespace,
    Type,
    Extension,
    Sequence,
    Table,
    Alteration,
    Index,
    View,
    Function,
    Trigger,
    Permission,
    Unrecognized,
}

/// Changes to an existing table, applied after all tables are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAlteration {
    pub table: ObjectName,
    /// Applied in order; one `ALTER TABLE` may carry several.
    pub actions: Vec<AlterAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterAction {
    AddColumn(Column),
    /// Replace a column definition in place, keeping its position.
    ModifyColumn(Column),
    AddConstraint(Constraint),
    AddIndex(Index),
    SetDefault { column: String, value: String },
    SetNotNull { column: String },
    /// Marks a column as fed by a sequence (`DEFAULT nextval(...)`).
    SetAutoIncrement { column: String },
    /// Table comment when `column` is `None`.
    Comment { column: Option<String>, text: String },
}

impl SchemaObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Database(_) => ObjectKind::Database,
            Self::Namespace(_) => ObjectKind::Namespace,
            Self::Type(_) => ObjectKind::Type,
            Self::Extension(_) => ObjectKind::Extension,
            Self::Sequence(_) => ObjectKind::Sequence,
            Self::Table(_) => ObjectKind::Table,
            Self::Index { .. } => ObjectKind::Index,
            Self::Alteration(_) => ObjectKind::Alteration,
            Self::View(_) => ObjectKind::View,
            Self::Function(_) => ObjectKind::Function,
            Self::Trigger(_) => ObjectKind::Trigger,
            Self::Permission(_) => ObjectKind::Permission,
            Self::Unrecognized { .. } => ObjectKind::Unrecognized,
        }
    }

    /// A short human-readable name for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Database(name) | Self::Namespace(name) => name.clone(),
            Self::Type(t) => t.name.clone(),
            Self::Extension(e) => e.name.clone(),
            Self::Sequence(s) => s.name.clone(),
            Self::Table(t) => t.qualified_name().to_string(),
            Self::Index { index, .. } => index.name.clone(),
            Self::Alteration(a) => a.table.to_string(),
            Self::View(v) => v.name.clone(),
            Self::Function(f) => f.name.clone(),
            Self::Trigger(t) => t.name.clone(),
            Self::Permission(p) => format!("{} {}", p.kind, p.grantee),
            Self::Unrecognized { category, .. } => category.clone(),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Database => "database",
            Self::Namespace => "namespace",
            Self::Type => "type",
            Self::Extension => "extension",
            Self::Sequence => "sequence",
            Self::Table => "table",
            Self::Alteration => "alteration",
            Self::Index => "index",
            Self::View => "view",
            Self::Function => "function",
            Self::Trigger => "trigger",
            Self::Permission => "permission",
            Self::Unrecognized => "unrecognized",
        };
        write!(f, "{}", s)
    }
}

/// Folds fragments into a [`Schema`].
///
/// Fragments are applied pass by pass in [`ObjectKind`] order (databases and
/// namespaces, types, extensions, sequences, tables, alterations, indexes,
/// views, routines, triggers, permissions), source order within a pass.
#[derive(Debug, Default)]
pub struct SchemaAssembler {
    objects: Vec<SchemaObject>,
}

impl SchemaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: SchemaObject) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Link everything and return the schema.
    pub fn finish(mut self) -> Schema {
        self.objects.sort_by_key(SchemaObject::kind);

        let mut schema = Schema::new();
        for object in self.objects {
            apply(&mut schema, object);
        }
        schema
    }
}

fn apply(schema: &mut Schema, object: SchemaObject) {
    match object {
        SchemaObject::Database(name) => schema.name = Some(name),
        SchemaObject::Namespace(name) => {
            if !schema.namespaces.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                schema.namespaces.push(name);
            }
        }
        SchemaObject::Type(t) => schema.types.push(t),
        SchemaObject::Extension(e) => schema.extensions.push(e),
        SchemaObject::Sequence(s) => schema.sequences.push(s),
        SchemaObject::Table(t) => schema.tables.push(t),
        SchemaObject::Alteration(alteration) => apply_alteration(schema, alteration),
        SchemaObject::Index { table, index } => match schema.table_mut(&table) {
            Some(t) => t.indexes.push(index),
            None => warn!("Index {} refers to unknown table {}; dropped", index.name, table),
        },
        SchemaObject::View(v) => schema.views.push(v),
        SchemaObject::Function(f) => schema.functions.push(f),
        SchemaObject::Trigger(t) => schema.triggers.push(t),
        SchemaObject::Permission(p) => schema.permissions.push(p),
        SchemaObject::Unrecognized { category, .. } => {
            debug!("Unrecognized {} statement left out of the schema", category);
        }
    }
}

impl TableAlteration {
    pub fn new(table: ObjectName, action: AlterAction) -> Self {
        Self {
            table,
            actions: vec![action],
        }
    }
}

fn apply_alteration(schema: &mut Schema, alteration: TableAlteration) {
    let Some(table) = schema.table_mut(&alteration.table) else {
        warn!("ALTER on unknown table {}; ignored", alteration.table);
        return;
    };
    for action in alteration.actions {
        apply_action(table, action);
    }
}

fn apply_action(table: &mut Table, action: AlterAction) {
    match action {
        AlterAction::AddColumn(col) => table.push_column(col),
        AlterAction::ModifyColumn(col) => {
            match table.columns.iter().position(|c| c.name.eq_ignore_ascii_case(&col.name)) {
                Some(pos) => {
                    let order = table.columns[pos].order;
                    let was_pk = table.columns[pos].is_primary_key;
                    let mut col = col;
                    col.order = order;
                    if was_pk {
                        col.is_primary_key = true;
                        col.is_nullable = false;
                    }
                    table.columns[pos] = col;
                }
                None => warn!("MODIFY of unknown column {}.{}", table.name, col.name),
            }
        }
        AlterAction::AddConstraint(constraint) => table.add_constraint(constraint),
        AlterAction::AddIndex(index) => table.indexes.push(index),
        AlterAction::SetNotNull { column } => match table.find_column_mut(&column) {
            Some(col) => col.is_nullable = false,
            None => warn!("NOT NULL for unknown column {}.{}", table.name, column),
        },
        AlterAction::SetDefault { column, value } => match table.find_column_mut(&column) {
            Some(col) => col.default_value = Some(value),
            None => warn!("Default for unknown column {}.{}", table.name, column),
        },
        AlterAction::SetAutoIncrement { column } => match table.find_column_mut(&column) {
            Some(col) => {
                col.auto_increment = true;
                col.is_nullable = false;
                col.default_value = None;
            }
            None => warn!("Sequence default for unknown column {}.{}", table.name, column),
        },
        AlterAction::Comment { column: None, text } => table.comment = Some(text),
        AlterAction::Comment {
            column: Some(column),
            text,
        } => match table.find_column_mut(&column) {
            Some(col) => col.comment = Some(text),
            None => warn!("Comment on unknown column {}.{}", table.name, column),
        },
    }
}
