//! Schema to script rendering.
//!
//! One renderer serves every dialect. All differences come from the
//! target's [`DialectCaps`]: quoting, the auto-increment idiom, where
//! comments go, which object kinds exist, and how procedural blocks are
//! terminated. Objects the target cannot express are left out with a
//! `warn!` entry rather than failing the conversion.

pub mod expr;

use tracing::{debug, warn};

use crate::dialect::{
    serial_name, AutoIncrementStyle, BlockStyle, CommentStyle, Dialect, DialectCaps,
};
use crate::error::{ConvertError, ConvertResult};
use crate::parser::{lex, TokenKind};
use crate::schema::{
    Column, Constraint, ConstraintKind, DataType, Extension, Function, Index, ParamDirection,
    Permission, PermissionKind, Reference, Schema, Sequence, Table, Trigger, TriggerTiming,
    TypeDef, TypeKind, View,
};

pub use expr::{literal, quote_ident, translate, truncate_ident};

/// Index access methods Postgres accepts in `USING`.
const PG_INDEX_METHODS: &[&str] = &["BTREE", "HASH", "GIST", "GIN", "SPGIST", "BRIN"];

/// Render `schema` as a script for `dialect`.
///
/// Fails only when the schema holds no objects at all.
pub fn generate(dialect: Dialect, schema: &Schema) -> ConvertResult<String> {
    if schema.is_empty() {
        return Err(ConvertError::EmptySchema);
    }
    let mut renderer = Renderer::new(dialect.caps(), schema);
    renderer.render();
    debug!("Rendered {} statements for {}", renderer.out.len(), dialect);
    Ok(renderer.finish())
}

/// One rendered statement, before terminators are applied.
#[derive(Debug)]
enum Rendered {
    Plain(String),
    /// A procedural block (routine or trigger) with its own termination rules.
    Block(String),
}

struct Renderer<'s> {
    caps: &'static DialectCaps,
    schema: &'s Schema,
    out: Vec<Rendered>,
}

impl<'s> Renderer<'s> {
    fn new(caps: &'static DialectCaps, schema: &'s Schema) -> Self {
        Self {
            caps,
            schema,
            out: Vec::new(),
        }
    }

    fn dialect(&self) -> Dialect {
        self.caps.dialect
    }

    fn plain(&mut self, text: String) {
        self.out.push(Rendered::Plain(text));
    }

    fn block(&mut self, text: String) {
        self.out.push(Rendered::Block(text));
    }

    fn render(&mut self) {
        let schema = self.schema;
        self.database();
        for namespace in &schema.namespaces {
            self.namespace(namespace);
        }
        for ty in &schema.types {
            self.type_def(ty);
        }
        for ext in &schema.extensions {
            self.extension(ext);
        }
        for seq in &schema.sequences {
            self.sequence(seq);
        }
        let tables = table_order(&schema.tables);
        for table in &tables {
            self.create_table(table);
        }
        for table in &tables {
            self.comments(table);
        }
        for table in &tables {
            for index in &table.indexes {
                self.index(table, index);
            }
        }
        for view in &schema.views {
            self.view(view);
        }
        for function in &schema.functions {
            self.function(function);
        }
        for trigger in &schema.triggers {
            self.trigger(trigger);
        }
        for permission in &schema.permissions {
            self.permission(permission);
        }
    }

    /// Join statements with the target's terminators.
    fn finish(self) -> String {
        let caps = self.caps;
        let batch = |text: String| match caps.batch_separator {
            Some(sep) => format!("{}\n{}", text, sep),
            None => text,
        };
        let statements: Vec<String> = self
            .out
            .into_iter()
            .map(|stmt| match stmt {
                Rendered::Plain(text) => batch(format!("{}{}", text, caps.terminator)),
                Rendered::Block(text) => match caps.block_style {
                    BlockStyle::DelimiterDirective if text.contains(';') => {
                        format!("DELIMITER //\n{}\n//\nDELIMITER ;", text)
                    }
                    BlockStyle::SlashLine => format!("{};\n/", text),
                    BlockStyle::Batch => batch(text),
                    _ => format!("{}{}", text, caps.terminator),
                },
            })
            .collect();
        let mut script = statements.join("\n\n");
        script.push('\n');
        script
    }

    // ========================================================================
    // Names and literals
    // ========================================================================

    fn ident(&self, name: &str) -> String {
        quote_ident(&truncate_ident(name, self.caps), self.caps)
    }

    fn qualified(&self, namespace: &str, name: &str) -> String {
        let name = self.ident(name);
        if namespace.is_empty() || !self.caps.supports_namespaces {
            name
        } else {
            format!("{}.{}", self.ident(namespace), name)
        }
    }

    fn literal(&self, text: &str) -> String {
        literal(text, self.caps)
    }

    fn expr(&self, text: &str) -> String {
        translate(text, self.caps)
    }

    fn ident_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn type_name(&self, dt: &DataType) -> String {
        (self.caps.type_name)(dt)
    }

    // ========================================================================
    // Database, namespaces, types, extensions, sequences
    // ========================================================================

    fn database(&mut self) {
        let Some(name) = &self.schema.name else {
            return;
        };
        let name = self.ident(name);
        match self.dialect() {
            Dialect::MySql => {
                self.plain(format!("CREATE DATABASE IF NOT EXISTS {}", name));
                self.plain(format!("USE {}", name));
            }
            Dialect::SqlServer => {
                self.plain(format!("CREATE DATABASE {}", name));
                self.plain(format!("USE {}", name));
            }
            Dialect::Postgres => self.plain(format!("CREATE DATABASE {}", name)),
            Dialect::Oracle => self.plain(format!("ALTER SESSION SET CURRENT_SCHEMA = {}", name)),
            Dialect::Sqlite => debug!("Database {} has no sqlite equivalent", name),
        }
    }

    fn namespace(&mut self, namespace: &str) {
        if !self.caps.supports_namespaces {
            warn!("Schema {} omitted: {} has no namespaces", namespace, self.dialect());
            return;
        }
        let name = self.ident(namespace);
        match self.dialect() {
            Dialect::Postgres => self.plain(format!("CREATE SCHEMA IF NOT EXISTS {}", name)),
            _ => self.plain(format!("CREATE SCHEMA {}", name)),
        }
    }

    fn type_def(&mut self, ty: &TypeDef) {
        let name = self.qualified(&ty.namespace, &ty.name);
        match ty.kind {
            TypeKind::Enum if self.caps.supports_enum_types => {
                let labels: Vec<String> = ty.enum_labels().iter().map(|l| self.literal(l)).collect();
                self.plain(format!("CREATE TYPE {} AS ENUM ({})", name, labels.join(", ")));
            }
            // Columns of this type are rendered with the labels inlined.
            TypeKind::Enum => debug!("Enum type {} folded into its columns", ty.name),
            TypeKind::Composite if self.caps.supports_composite_types => {
                let body = self.expr(&ty.definition);
                let keyword = match self.dialect() {
                    Dialect::Oracle => "AS OBJECT ",
                    Dialect::SqlServer => "AS TABLE ",
                    _ => "AS ",
                };
                self.plain(format!("CREATE TYPE {} {}{}", name, keyword, body));
            }
            TypeKind::Composite => {
                warn!("Composite type {} omitted: unsupported by {}", ty.name, self.dialect());
            }
        }
    }

    fn extension(&mut self, ext: &Extension) {
        if !self.caps.supports_extensions {
            warn!("Extension {} omitted: unsupported by {}", ext.name, self.dialect());
            return;
        }
        let mut sql = format!("CREATE EXTENSION IF NOT EXISTS {}", self.ident(&ext.name));
        if let Some(schema) = &ext.schema {
            sql.push_str(&format!(" WITH SCHEMA {}", self.ident(schema)));
        }
        if let Some(version) = &ext.version {
            sql.push_str(&format!(" VERSION {}", self.literal(version)));
        }
        self.plain(sql);
    }

    fn sequence(&mut self, seq: &Sequence) {
        if !self.caps.supports_sequences {
            warn!("Sequence {} omitted: unsupported by {}", seq.name, self.dialect());
            return;
        }
        if self.caps.auto_increment == AutoIncrementStyle::Serial && self.is_serial_sequence(seq) {
            debug!("Sequence {} is implied by a SERIAL column", seq.name);
            return;
        }
        let mut sql = format!("CREATE SEQUENCE {}", self.qualified(&seq.namespace, &seq.name));
        if let Some(start) = seq.start {
            sql.push_str(&format!(" START WITH {}", start));
        }
        if let Some(increment) = seq.increment {
            sql.push_str(&format!(" INCREMENT BY {}", increment));
        }
        if let Some(min) = seq.min_value {
            sql.push_str(&format!(" MINVALUE {}", min));
        }
        if let Some(max) = seq.max_value {
            sql.push_str(&format!(" MAXVALUE {}", max));
        }
        if let Some(cache) = seq.cache {
            sql.push_str(&format!(" CACHE {}", cache));
        }
        if seq.cycle {
            sql.push_str(" CYCLE");
        }
        self.plain(sql);
    }

    /// `<table>_<column>_seq` backing an auto-increment column.
    fn is_serial_sequence(&self, seq: &Sequence) -> bool {
        self.schema.tables.iter().any(|t| {
            t.columns.iter().any(|c| {
                c.auto_increment
                    && seq
                        .name
                        .eq_ignore_ascii_case(&format!("{}_{}_seq", t.name, c.name))
            })
        })
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn create_table(&mut self, table: &Table) {
        let inline_pk = inline_primary_key(table, self.caps);
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|col| self.column(table, col, inline_pk == Some(col.name.as_str())))
            .collect();

        let has_pk_constraint = table
            .constraints
            .iter()
            .any(|c| c.kind == ConstraintKind::PrimaryKey);
        if !has_pk_constraint && inline_pk.is_none() {
            let pk = table.primary_key_columns();
            if !pk.is_empty() {
                lines.push(format!("PRIMARY KEY ({})", self.ident_list(&pk)));
            }
        }
        for constraint in &table.constraints {
            let absorbed = inline_pk.is_some() && constraint.kind == ConstraintKind::PrimaryKey;
            if !absorbed {
                lines.push(self.constraint(constraint));
            }
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualified(&table.namespace, &table.name),
            lines.join(",\n    ")
        );
        if let (Some(comment), CommentStyle::Inline) = (&table.comment, self.caps.comment_style) {
            sql.push_str(&format!(" COMMENT={}", self.literal(comment)));
        }
        if let (Some(space), Some(keyword)) = (&table.tablespace, self.caps.tablespace_clause) {
            sql.push_str(&format!(" {} {}", keyword, self.ident(space)));
        }
        self.plain(sql);
    }

    fn column(&self, table: &Table, col: &Column, inline_pk: bool) -> String {
        let caps = self.caps;
        let auto = col.auto_increment && col.data_type.is_integer();
        let mut parts = vec![self.ident(&col.name)];

        let inline_enum = if caps.supports_inline_enums {
            inline_enum_labels(col)
        } else {
            None
        };
        let enum_labels = self.enum_labels_for(col).or_else(|| {
            inline_enum
                .as_ref()
                .map(|labels| labels.iter().map(|l| self.literal(l)).collect())
        });
        let ty = match (auto, caps.auto_increment) {
            (true, AutoIncrementStyle::Serial) => serial_name(&col.data_type).to_string(),
            _ => match &enum_labels {
                Some(labels) if caps.supports_inline_enums => format!("ENUM({})", labels.join(", ")),
                Some(_) if !caps.supports_enum_types => {
                    self.type_name(&DataType::new("VARCHAR").with_length(255))
                }
                _ => self.type_name(&col.data_type),
            },
        };
        parts.push(ty);

        if auto {
            match caps.auto_increment {
                AutoIncrementStyle::Identity => parts.push("IDENTITY(1,1)".to_string()),
                AutoIncrementStyle::GeneratedIdentity => {
                    parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string())
                }
                _ => {}
            }
        } else if let Some(default) = &col.default_value {
            parts.push(format!("DEFAULT {}", self.expr(default)));
        }

        if !col.is_nullable && !col.is_primary_key {
            parts.push("NOT NULL".to_string());
        }
        if auto && caps.auto_increment == AutoIncrementStyle::Keyword {
            parts.push("AUTO_INCREMENT".to_string());
        }
        if col.is_unique && !table.has_single_column_constraint(ConstraintKind::Unique, &col.name) {
            parts.push("UNIQUE".to_string());
        }
        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
            if auto && caps.auto_increment == AutoIncrementStyle::SqliteAutoincrement {
                parts.push("AUTOINCREMENT".to_string());
            }
        } else if auto && caps.auto_increment == AutoIncrementStyle::SqliteAutoincrement {
            warn!(
                "AUTOINCREMENT dropped from {}.{}: sqlite allows it only on a single-column primary key",
                table.name, col.name
            );
        }

        match (&col.check_expression, &enum_labels) {
            (Some(_), _) if inline_enum.is_some() => {}
            (Some(check), _) => parts.push(format!("CHECK ({})", self.expr(check))),
            (None, Some(labels)) if !caps.supports_inline_enums && !caps.supports_enum_types => {
                parts.push(format!("CHECK ({} IN ({}))", self.ident(&col.name), labels.join(", ")));
            }
            _ => {}
        }
        if let (Some(comment), CommentStyle::Inline) = (&col.comment, caps.comment_style) {
            parts.push(format!("COMMENT {}", self.literal(comment)));
        }
        parts.join(" ")
    }

    /// Quoted labels when the column's type is a user-defined enum.
    fn enum_labels_for(&self, col: &Column) -> Option<Vec<String>> {
        let ty = self.schema.enum_type(&col.data_type.name)?;
        Some(ty.enum_labels().iter().map(|l| self.literal(l)).collect())
    }

    fn constraint(&self, constraint: &Constraint) -> String {
        let mut sql = String::new();
        if !constraint.name.is_empty() {
            sql.push_str(&format!("CONSTRAINT {} ", self.ident(&constraint.name)));
        }
        match constraint.kind {
            ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
                sql.push_str(&format!(
                    "{} ({})",
                    constraint.kind,
                    self.ident_list(&constraint.columns)
                ));
            }
            ConstraintKind::Check => {
                let check = constraint.check_expression.as_deref().unwrap_or("1 = 1");
                sql.push_str(&format!("CHECK ({})", self.expr(check)));
            }
            ConstraintKind::ForeignKey => {
                sql.push_str(&format!("FOREIGN KEY ({})", self.ident_list(&constraint.columns)));
                if let Some(reference) = &constraint.reference {
                    sql.push_str(&self.reference(reference));
                }
            }
        }
        sql
    }

    fn reference(&self, reference: &Reference) -> String {
        let mut sql = format!(
            " REFERENCES {}",
            self.qualified(&reference.table.namespace, &reference.table.name)
        );
        if !reference.columns.is_empty() {
            sql.push_str(&format!(" ({})", self.ident_list(&reference.columns)));
        }
        let on_delete = reference.on_delete.as_deref().and_then(|a| self.referential_action(a, true));
        let on_update = reference.on_update.as_deref().and_then(|a| self.referential_action(a, false));
        if let Some(action) = on_delete {
            sql.push_str(&format!(" ON DELETE {}", action));
        }
        if let Some(action) = on_update {
            sql.push_str(&format!(" ON UPDATE {}", action));
        }
        sql
    }

    fn referential_action(&self, action: &str, on_delete: bool) -> Option<String> {
        let action = action.to_uppercase();
        match self.dialect() {
            Dialect::Oracle => {
                let kept = on_delete && (action == "CASCADE" || action == "SET NULL");
                if !kept && action != "NO ACTION" && action != "RESTRICT" {
                    warn!(
                        "ON {} {} dropped: unsupported by oracle",
                        if on_delete { "DELETE" } else { "UPDATE" },
                        action
                    );
                }
                kept.then_some(action)
            }
            Dialect::SqlServer if action == "RESTRICT" => Some("NO ACTION".to_string()),
            _ => Some(action),
        }
    }

    // ========================================================================
    // Comments and indexes
    // ========================================================================

    fn comments(&mut self, table: &Table) {
        let column_comments = table
            .columns
            .iter()
            .filter_map(|c| c.comment.as_deref().map(|text| (Some(c.name.as_str()), text)));
        let entries: Vec<(Option<&str>, &str)> = table
            .comment
            .as_deref()
            .map(|text| (None, text))
            .into_iter()
            .chain(column_comments)
            .collect();
        if entries.is_empty() {
            return;
        }

        let table_name = self.qualified(&table.namespace, &table.name);
        match self.caps.comment_style {
            CommentStyle::Inline => {}
            CommentStyle::CommentOn => {
                for (column, text) in entries {
                    let target = match column {
                        Some(col) => format!("COLUMN {}.{}", table_name, self.ident(col)),
                        None => format!("TABLE {}", table_name),
                    };
                    self.plain(format!("COMMENT ON {} IS {}", target, self.literal(text)));
                }
            }
            CommentStyle::ExtendedProperty => {
                let namespace = if table.namespace.is_empty() {
                    self.caps.default_namespace
                } else {
                    table.namespace.as_str()
                };
                for (column, text) in entries {
                    let mut sql = format!(
                        "EXEC sp_addextendedproperty N'MS_Description', N{}, N'SCHEMA', N{}, N'TABLE', N{}",
                        self.literal(text),
                        self.literal(namespace),
                        self.literal(&table.name)
                    );
                    if let Some(col) = column {
                        sql.push_str(&format!(", N'COLUMN', N{}", self.literal(col)));
                    }
                    self.plain(sql);
                }
            }
            CommentStyle::Unsupported => {
                warn!("Comments on {} omitted: unsupported by {}", table.name, self.dialect());
            }
        }
    }

    fn index(&mut self, table: &Table, index: &Index) {
        let caps = self.caps;
        let algorithm = index.algorithm.as_deref().map(str::to_uppercase);
        let mut sql = String::from("CREATE ");
        if index.is_unique {
            sql.push_str("UNIQUE ");
        }
        if index.is_bitmap {
            if caps.supports_bitmap_indexes {
                sql.push_str("BITMAP ");
            } else {
                warn!("Index {} rendered without BITMAP for {}", index.name, self.dialect());
            }
        }
        if caps.supports_clustered_indexes {
            sql.push_str(if index.is_clustered { "CLUSTERED " } else { "NONCLUSTERED " });
        }
        match algorithm.as_deref() {
            Some(flavor @ ("FULLTEXT" | "SPATIAL")) if self.dialect() == Dialect::MySql => {
                sql.push_str(flavor);
                sql.push(' ');
            }
            Some(flavor @ ("FULLTEXT" | "SPATIAL")) => {
                warn!("{} index {} omitted: unsupported by {}", flavor, index.name, self.dialect());
                return;
            }
            _ => {}
        }

        let keys: Vec<String> = index
            .columns
            .iter()
            .map(|entry| self.index_key(table, entry))
            .collect();
        sql.push_str(&format!(
            "INDEX {} ON {}",
            self.ident(&index.name),
            self.qualified(&table.namespace, &table.name)
        ));
        if let Some(method) = algorithm.as_deref() {
            if self.dialect() == Dialect::Postgres && PG_INDEX_METHODS.contains(&method) {
                sql.push_str(&format!(" USING {}", method.to_lowercase()));
            }
        }
        sql.push_str(&format!(" ({})", keys.join(", ")));
        if let Some(method @ ("BTREE" | "HASH")) = algorithm.as_deref() {
            if self.dialect() == Dialect::MySql {
                sql.push_str(&format!(" USING {}", method));
            }
        }
        if let Some(filter) = &index.filter {
            if caps.supports_partial_indexes {
                sql.push_str(&format!(" WHERE {}", self.expr(filter)));
            } else {
                warn!("Filter on index {} dropped: unsupported by {}", index.name, self.dialect());
            }
        }
        if let (Some(space), Some(keyword)) = (&index.tablespace, caps.tablespace_clause) {
            sql.push_str(&format!(" {} {}", keyword, self.ident(space)));
        }
        self.plain(sql);
    }

    /// A key column is quoted as a name; anything else is an expression.
    fn index_key(&self, table: &Table, entry: &str) -> String {
        let (name, desc) = match entry.strip_suffix(" DESC") {
            Some(name) => (name, " DESC"),
            None => (entry, ""),
        };
        match table.find_column(name) {
            Some(col) => format!("{}{}", self.ident(&col.name), desc),
            None => self.expr(entry),
        }
    }

    // ========================================================================
    // Views, routines, triggers, permissions
    // ========================================================================

    fn view(&mut self, view: &View) {
        let materialized = view.is_materialized && self.caps.supports_materialized_views;
        if view.is_materialized && !materialized {
            warn!("Materialized view {} rendered as a plain view for {}", view.name, self.dialect());
        }
        let mut sql = format!(
            "CREATE {}VIEW {}",
            if materialized { "MATERIALIZED " } else { "" },
            self.qualified(&view.namespace, &view.name)
        );
        if !view.columns.is_empty() {
            sql.push_str(&format!(" ({})", self.ident_list(&view.columns)));
        }
        sql.push_str(&format!(" AS {}", self.expr(&view.definition)));
        self.plain(sql);
    }

    fn function(&mut self, f: &Function) {
        if !self.caps.supports_routines {
            warn!("Routine {} omitted: unsupported by {}", f.name, self.dialect());
            return;
        }
        let name = self.qualified(&f.namespace, &f.name);
        let kind = if f.is_procedure { "PROCEDURE" } else { "FUNCTION" };
        let params: Vec<String> = f
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| self.parameter(i, &p.name, &p.data_type, p.direction, f.is_procedure))
            .collect();
        let params = params.join(", ");

        match self.dialect() {
            Dialect::Postgres => {
                let mut sql = format!("CREATE OR REPLACE {} {}({})", kind, name, params);
                if !f.is_procedure {
                    let ret = f.return_type.as_ref().map_or("void".to_string(), |t| self.type_name(t));
                    sql.push_str(&format!(" RETURNS {}", ret));
                }
                let tag = if f.body.contains("$$") { "$body$" } else { "$$" };
                sql.push_str(&format!(
                    " AS {tag}\n{};\n{tag} LANGUAGE {}",
                    f.body,
                    postgres_language(&f.language)
                ));
                self.block(sql);
            }
            Dialect::MySql => {
                let mut sql = format!("CREATE {} {}({})", kind, name, params);
                if let (false, Some(ret)) = (f.is_procedure, &f.return_type) {
                    sql.push_str(&format!(" RETURNS {}", self.type_name(ret)));
                }
                sql.push_str(&format!("\n{}", f.body));
                self.block(sql);
            }
            Dialect::Oracle => {
                let mut sql = format!("CREATE OR REPLACE {} {}", kind, name);
                if !params.is_empty() {
                    sql.push_str(&format!(" ({})", params));
                }
                if let (false, Some(ret)) = (f.is_procedure, &f.return_type) {
                    sql.push_str(&format!(" RETURN {}", strip_type_args(&self.type_name(ret))));
                }
                sql.push_str(&format!(" AS\n{}", f.body));
                self.block(sql);
            }
            Dialect::SqlServer => {
                let mut sql = format!("CREATE {} {}({})", kind, name, params);
                if let (false, Some(ret)) = (f.is_procedure, &f.return_type) {
                    sql.push_str(&format!(" RETURNS {}", self.type_name(ret)));
                }
                sql.push_str(&format!(" AS\n{}", f.body));
                self.block(sql);
            }
            Dialect::Sqlite => {}
        }
    }

    fn parameter(
        &self,
        position: usize,
        name: &str,
        data_type: &DataType,
        direction: ParamDirection,
        procedure: bool,
    ) -> String {
        let ty = self.type_name(data_type);
        let fallback = format!("p{}", position + 1);
        let named = if name.is_empty() { fallback.as_str() } else { name };
        match self.dialect() {
            Dialect::Postgres => {
                let mode = match direction {
                    ParamDirection::In => "",
                    ParamDirection::Out => "OUT ",
                    ParamDirection::InOut => "INOUT ",
                };
                if name.is_empty() {
                    format!("{}{}", mode, ty)
                } else {
                    format!("{}{} {}", mode, self.ident(name), ty)
                }
            }
            Dialect::MySql if procedure => {
                format!("{} {} {}", direction, self.ident(named), ty)
            }
            Dialect::Oracle => {
                let mode = match direction {
                    ParamDirection::In => "IN",
                    ParamDirection::Out => "OUT",
                    ParamDirection::InOut => "IN OUT",
                };
                format!("{} {} {}", self.ident(named), mode, strip_type_args(&ty))
            }
            Dialect::SqlServer => {
                let var = if named.starts_with('@') {
                    named.to_string()
                } else {
                    format!("@{}", named)
                };
                match direction {
                    ParamDirection::In => format!("{} {}", var, ty),
                    _ => format!("{} {} OUTPUT", var, ty),
                }
            }
            _ => format!("{} {}", self.ident(named), ty),
        }
    }

    fn trigger(&mut self, t: &Trigger) {
        let dialect = self.dialect();
        if !trigger_body_fits(dialect, &t.body) {
            warn!("Trigger {} omitted: its body cannot run on {}", t.name, dialect);
            return;
        }
        let mut events = t.events.clone();
        if events.is_empty() {
            events.push(t.event());
        }
        if matches!(dialect, Dialect::MySql | Dialect::Sqlite) && events.len() > 1 {
            warn!("Trigger {} keeps only its {} event for {}", t.name, events[0], dialect);
            events.truncate(1);
        }
        let condition = match (&t.condition, dialect) {
            (Some(_), Dialect::MySql | Dialect::SqlServer) => {
                warn!("WHEN clause of trigger {} dropped for {}", t.name, dialect);
                None
            }
            (cond, _) => cond.as_deref().map(|c| self.expr(c)),
        };
        let name = self.qualified(&t.namespace, &t.name);
        let table = self.qualified(&t.table.namespace, &t.table.name);

        let sql = match dialect {
            Dialect::SqlServer => {
                if t.timing == TriggerTiming::Before {
                    warn!("BEFORE trigger {} omitted: unsupported by sqlserver", t.name);
                    return;
                }
                let events: Vec<String> = events.iter().map(ToString::to_string).collect();
                format!(
                    "CREATE TRIGGER {} ON {} {} {} AS\n{}",
                    name,
                    table,
                    t.timing,
                    events.join(", "),
                    t.body
                )
            }
            Dialect::MySql if t.timing == TriggerTiming::InsteadOf => {
                warn!("INSTEAD OF trigger {} omitted: unsupported by mysql", t.name);
                return;
            }
            _ => {
                let events: Vec<String> = events.iter().map(ToString::to_string).collect();
                let create = if dialect == Dialect::Oracle {
                    "CREATE OR REPLACE TRIGGER"
                } else {
                    "CREATE TRIGGER"
                };
                let mut sql = format!(
                    "{} {} {} {} ON {}",
                    create,
                    name,
                    t.timing,
                    events.join(" OR "),
                    table
                );
                if t.for_each_row || dialect == Dialect::MySql {
                    sql.push_str(" FOR EACH ROW");
                } else if dialect == Dialect::Postgres {
                    sql.push_str(" FOR EACH STATEMENT");
                }
                if let Some(cond) = condition {
                    if dialect == Dialect::Sqlite {
                        sql.push_str(&format!(" WHEN {}", cond));
                    } else {
                        sql.push_str(&format!(" WHEN ({})", cond));
                    }
                }
                sql.push('\n');
                sql.push_str(&t.body);
                sql
            }
        };
        self.block(sql);
    }

    fn permission(&mut self, p: &Permission) {
        if !self.caps.supports_grants {
            warn!("{} on {} omitted: unsupported by {}", p.kind, p.object, self.dialect());
            return;
        }
        if p.object.contains('*') && self.dialect() != Dialect::MySql {
            warn!("{} on {} omitted: wildcard objects are mysql-only", p.kind, p.object);
            return;
        }
        let privileges = p.privileges.join(", ");
        let on = if p.object.is_empty() {
            String::new()
        } else {
            format!(" ON {}", self.expr(&p.object))
        };
        let sql = match p.kind {
            PermissionKind::Grant => {
                let mut sql = format!("GRANT {}{} TO {}", privileges, on, p.grantee);
                if p.with_grant {
                    sql.push_str(" WITH GRANT OPTION");
                }
                sql
            }
            PermissionKind::Revoke => format!("REVOKE {}{} FROM {}", privileges, on, p.grantee),
        };
        self.plain(sql);
    }
}

/// The column that carries `PRIMARY KEY` inline, if any.
///
/// Only a single flagged column with no explicit constraint is inlined. SQLite
/// also inlines a named single-column key on an auto-increment column, since
/// `AUTOINCREMENT` is only legal there.
fn inline_primary_key<'t>(table: &'t Table, caps: &DialectCaps) -> Option<&'t str> {
    let flagged: Vec<&Column> = table.columns.iter().filter(|c| c.is_primary_key).collect();
    let [only] = flagged[..] else {
        return None;
    };
    let pk = table
        .constraints
        .iter()
        .find(|c| c.kind == ConstraintKind::PrimaryKey);
    match pk {
        None => Some(only.name.as_str()),
        Some(c) if caps.auto_increment == AutoIncrementStyle::SqliteAutoincrement
            && c.columns.len() == 1
            && only.auto_increment =>
        {
            Some(only.name.as_str())
        }
        Some(_) => None,
    }
}

/// Tables ordered so referenced tables come before the tables that point at
/// them. Cycles keep their declaration order.
fn table_order(tables: &[Table]) -> Vec<&Table> {
    fn depends_on(table: &Table, other: &Table) -> bool {
        !std::ptr::eq(table, other)
            && table
                .constraints
                .iter()
                .filter_map(|c| c.reference.as_ref())
                .any(|r| other.matches(&r.table))
    }

    let mut remaining: Vec<&Table> = tables.iter().collect();
    let mut ordered = Vec::with_capacity(tables.len());
    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .position(|t| !remaining.iter().any(|other| depends_on(t, other)))
            .unwrap_or(0);
        ordered.push(remaining.remove(ready));
    }
    ordered
}

fn trigger_body_fits(dialect: Dialect, body: &str) -> bool {
    let words: Vec<String> = body
        .split_whitespace()
        .take(2)
        .map(str::to_uppercase)
        .collect();
    let first = words.first().map(String::as_str).unwrap_or("");
    let calls_routine = first == "EXECUTE"
        && matches!(words.get(1).map(String::as_str), Some("FUNCTION" | "PROCEDURE"));
    match dialect {
        Dialect::Postgres => calls_routine,
        Dialect::Sqlite => first == "BEGIN",
        Dialect::Oracle => first == "BEGIN" || first == "DECLARE",
        Dialect::MySql | Dialect::SqlServer => !calls_routine,
    }
}

fn postgres_language(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "" | "plsql" | "tsql" => "plpgsql".to_string(),
        other => other.to_string(),
    }
}

/// `VARCHAR2(100)` -> `VARCHAR2`; Oracle parameter types take no size.
fn strip_type_args(ty: &str) -> &str {
    ty.split('(').next().unwrap_or(ty).trim_end()
}

/// Labels of a `col IN ('a', 'b')` check on a `VARCHAR(255)` column, the
/// shape an inline `ENUM` or `SET` is parsed into.
fn inline_enum_labels(col: &Column) -> Option<Vec<String>> {
    let dt = &col.data_type;
    if !dt.is("VARCHAR") || dt.length != Some(255) || dt.scale.is_some() {
        return None;
    }
    let tokens = lex(col.check_expression.as_deref()?).ok()?;
    let [name, keyword, open, rest @ ..] = tokens.as_slice() else {
        return None;
    };
    let [items @ .., close] = rest else {
        return None;
    };
    if !name.is_identifier()
        || !name.ident().eq_ignore_ascii_case(&col.name)
        || !keyword.is_keyword("IN")
        || !open.is_punct("(")
        || !close.is_punct(")")
        || items.len() % 2 == 0
    {
        return None;
    }

    let mut labels = Vec::new();
    for (i, token) in items.iter().enumerate() {
        if i % 2 == 1 {
            if !token.is_punct(",") {
                return None;
            }
        } else if token.kind == TokenKind::String {
            labels.push(token.string_value()?);
        } else {
            return None;
        }
    }
    Some(labels)
}
