//! Schema Diff
//!
//! Compares two name-keyed table maps and lists what changed. Names are
//! matched case-insensitively; nothing is inferred about renames, so a
//! renamed column shows up as one removal plus one addition.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::schema::{Column, Constraint, Index, Schema, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Table,
    Column,
    Index,
    Constraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Modify,
    Remove,
}

/// One difference between source and target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub kind: DiffKind,
    /// `table`, or `table.member` for columns, indexes and constraints.
    pub name: String,
    pub change: ChangeKind,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
    pub description: String,
}

/// Build the case-insensitive `namespace.table` map used by [`diff_tables`].
pub fn table_map(schema: &Schema) -> BTreeMap<String, Table> {
    schema
        .tables
        .iter()
        .map(|t| (t.qualified_name().key(), t.clone()))
        .collect()
}

/// Diff every table of two schemas.
pub fn diff_schemas(source: &Schema, target: &Schema) -> Vec<Difference> {
    diff_tables(&table_map(source), &table_map(target))
}

/// Compute the differences from `source` to `target`.
///
/// Tables come in key order. Within a table: column additions and changes
/// (target order), column removals (source order), then indexes, then
/// constraints.
pub fn diff_tables(
    source: &BTreeMap<String, Table>,
    target: &BTreeMap<String, Table>,
) -> Vec<Difference> {
    let keys: BTreeSet<&String> = source.keys().chain(target.keys()).collect();
    let mut diffs = Vec::new();

    for key in keys {
        match (source.get(key), target.get(key)) {
            (None, Some(table)) => diffs.push(Difference {
                kind: DiffKind::Table,
                name: key.clone(),
                change: ChangeKind::Add,
                source_value: None,
                target_value: Some(format!("{} columns", table.columns.len())),
                description: format!("Table {} added", key),
            }),
            (Some(table), None) => diffs.push(Difference {
                kind: DiffKind::Table,
                name: key.clone(),
                change: ChangeKind::Remove,
                source_value: Some(format!("{} columns", table.columns.len())),
                target_value: None,
                description: format!("Table {} removed", key),
            }),
            (Some(old), Some(new)) => {
                diff_columns(key, old, new, &mut diffs);
                diff_members(key, DiffKind::Index, &old.indexes, &new.indexes, &mut diffs);
                diff_members(key, DiffKind::Constraint, &old.constraints, &new.constraints, &mut diffs);
            }
            (None, None) => {}
        }
    }

    diffs
}

fn diff_columns(table: &str, old: &Table, new: &Table, diffs: &mut Vec<Difference>) {
    let old_names: HashSet<String> = old.columns.iter().map(|c| c.name.to_lowercase()).collect();
    let new_names: HashSet<String> = new.columns.iter().map(|c| c.name.to_lowercase()).collect();

    for col in &new.columns {
        let name = format!("{}.{}", table, col.name.to_lowercase());
        if !old_names.contains(&col.name.to_lowercase()) {
            diffs.push(Difference {
                kind: DiffKind::Column,
                name: name.clone(),
                change: ChangeKind::Add,
                source_value: None,
                target_value: Some(column_signature(col)),
                description: format!("Column {} added", name),
            });
            continue;
        }
        if let Some(before) = old.find_column(&col.name) {
            let (was, now) = (column_signature(before), column_signature(col));
            if was != now {
                diffs.push(Difference {
                    kind: DiffKind::Column,
                    name: name.clone(),
                    change: ChangeKind::Modify,
                    description: format!("Column {} changed from {} to {}", name, was, now),
                    source_value: Some(was),
                    target_value: Some(now),
                });
            }
        }
    }

    for col in &old.columns {
        if !new_names.contains(&col.name.to_lowercase()) {
            let name = format!("{}.{}", table, col.name.to_lowercase());
            diffs.push(Difference {
                kind: DiffKind::Column,
                name: name.clone(),
                change: ChangeKind::Remove,
                source_value: Some(column_signature(col)),
                target_value: None,
                description: format!("Column {} removed", name),
            });
        }
    }
}

/// Type, nullability and default: the fields a column change compares.
fn column_signature(col: &Column) -> String {
    let mut sig = col.data_type.to_string().to_uppercase();
    sig.push_str(if col.is_nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &col.default_value {
        sig.push_str(&format!(" DEFAULT {}", default));
    }
    sig
}

/// Indexes and constraints: keyed members compared by signature.
trait Member {
    fn key(&self) -> String;
    fn signature(&self) -> String;
}

impl Member for Index {
    fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Column list (in order), access method and uniqueness.
    fn signature(&self) -> String {
        let mut sig = format!("({})", self.columns.join(", ").to_lowercase());
        if let Some(algorithm) = &self.algorithm {
            sig = format!("{} {}", algorithm.to_uppercase(), sig);
        }
        if self.is_unique {
            sig = format!("UNIQUE {}", sig);
        }
        sig
    }
}

impl Member for Constraint {
    fn key(&self) -> String {
        Constraint::key(self)
    }

    /// Kind, columns and the referenced table.
    fn signature(&self) -> String {
        let mut sig = format!("{} ({})", self.kind, self.columns.join(", ").to_lowercase());
        if let Some(reference) = &self.reference {
            sig.push_str(&format!(
                " REFERENCES {} ({})",
                reference.table.key(),
                reference.columns.join(", ").to_lowercase()
            ));
        }
        if let Some(check) = &self.check_expression {
            sig.push_str(&format!(" CHECK ({})", check));
        }
        sig
    }
}

fn diff_members<M: Member>(
    table: &str,
    kind: DiffKind,
    old: &[M],
    new: &[M],
    diffs: &mut Vec<Difference>,
) {
    let old_by_key: BTreeMap<String, &M> = old.iter().map(|m| (m.key(), m)).collect();
    let new_by_key: BTreeMap<String, &M> = new.iter().map(|m| (m.key(), m)).collect();

    for (key, member) in &new_by_key {
        let name = format!("{}.{}", table, key);
        match old_by_key.get(key) {
            None => diffs.push(Difference {
                kind,
                name: name.clone(),
                change: ChangeKind::Add,
                source_value: None,
                target_value: Some(member.signature()),
                description: format!("{} {} added", kind, name),
            }),
            Some(before) if before.signature() != member.signature() => diffs.push(Difference {
                kind,
                name: name.clone(),
                change: ChangeKind::Modify,
                source_value: Some(before.signature()),
                target_value: Some(member.signature()),
                description: format!("{} {} changed", kind, name),
            }),
            Some(_) => {}
        }
    }
    for (key, member) in &old_by_key {
        if !new_by_key.contains_key(key) {
            let name = format!("{}.{}", table, key);
            diffs.push(Difference {
                kind,
                name: name.clone(),
                change: ChangeKind::Remove,
                source_value: Some(member.signature()),
                target_value: None,
                description: format!("{} {} removed", kind, name),
            });
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "Table",
            Self::Column => "Column",
            Self::Index => "Index",
            Self::Constraint => "Constraint",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Remove => "remove",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, ObjectName, Reference};
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", DataType::new("INT")).primary_key())
            .column(Column::new("email", DataType::new("VARCHAR").with_length(255)).not_null())
            .index(Index::new("idx_email", vec!["email".into()]).unique())
    }

    fn map(tables: Vec<Table>) -> BTreeMap<String, Table> {
        tables
            .into_iter()
            .map(|t| (t.qualified_name().key(), t))
            .collect()
    }

    fn summary(diffs: &[Difference]) -> Vec<(DiffKind, String, ChangeKind)> {
        diffs
            .iter()
            .map(|d| (d.kind, d.name.clone(), d.change))
            .collect()
    }

    #[test]
    fn test_identical_tables_have_no_differences() {
        assert!(diff_tables(&map(vec![users()]), &map(vec![users()])).is_empty());
    }

    #[test]
    fn test_added_column() {
        let target = users().column(Column::new("name", DataType::new("TEXT")));
        let diffs = diff_tables(&map(vec![users()]), &map(vec![target]));
        assert_eq!(
            summary(&diffs),
            vec![(DiffKind::Column, "users.name".to_string(), ChangeKind::Add)]
        );
        assert_eq!(diffs[0].target_value.as_deref(), Some("TEXT NULL"));
    }

    #[test]
    fn test_changed_type() {
        let mut target = users();
        target.columns[1].data_type = DataType::new("TEXT");
        let diffs = diff_tables(&map(vec![users()]), &map(vec![target]));
        assert_eq!(
            summary(&diffs),
            vec![(DiffKind::Column, "users.email".to_string(), ChangeKind::Modify)]
        );
        assert_eq!(diffs[0].source_value.as_deref(), Some("VARCHAR(255) NOT NULL"));
    }

    #[test]
    fn test_rename_is_remove_plus_add() {
        let mut target = users();
        target.columns[1].name = "mail".into();
        let diffs = diff_tables(&map(vec![users()]), &map(vec![target]));
        assert_eq!(
            summary(&diffs),
            vec![
                (DiffKind::Column, "users.mail".to_string(), ChangeKind::Add),
                (DiffKind::Column, "users.email".to_string(), ChangeKind::Remove),
            ]
        );
    }

    #[test]
    fn test_table_level_changes_in_key_order() {
        let source = map(vec![users(), Table::new("audit")]);
        let target = map(vec![users(), Table::new("Zones").in_namespace("geo")]);
        assert_eq!(
            summary(&diff_tables(&source, &target)),
            vec![
                (DiffKind::Table, "audit".to_string(), ChangeKind::Remove),
                (DiffKind::Table, "geo.zones".to_string(), ChangeKind::Add),
            ]
        );
    }

    #[test]
    fn test_index_and_constraint_changes() {
        let mut target = users();
        target.indexes[0].columns = vec!["lower(email)".into()];
        target.add_constraint(Constraint::foreign_key(
            "",
            vec!["id".into()],
            Reference::new(ObjectName::unqualified("accounts"), vec!["id".into()]),
        ));
        let diffs = diff_tables(&map(vec![users()]), &map(vec![target]));
        assert_eq!(
            summary(&diffs),
            vec![
                (DiffKind::Index, "users.idx_email".to_string(), ChangeKind::Modify),
                (DiffKind::Constraint, "users.foreign key(id)".to_string(), ChangeKind::Add),
            ]
        );
    }

    #[test]
    fn test_differences_serialize() {
        let target = users().column(Column::new("name", DataType::new("TEXT")));
        let diffs = diff_tables(&map(vec![users()]), &map(vec![target]));
        let json = serde_json::to_value(&diffs).unwrap();
        assert_eq!(json[0]["kind"], "column");
        assert_eq!(json[0]["change"], "add");
    }
}
