//! `CREATE TABLE` and `ALTER TABLE`.

use tracing::{debug, warn};

use super::cursor::{expression_text, fragment, Cursor};
use super::lexer::{join, split_top_level, Token, TokenKind};
use super::Context;
use crate::dialect::types::{canonicalize, CanonicalType, TypeArg};
use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::schema::{
    AlterAction, Column, Constraint, Index, Reference, SchemaObject, Table, TableAlteration,
};

/// One entry of a table's definition list.
pub(super) enum Element {
    Column(Column, Vec<Constraint>),
    Constraint(Constraint),
    Index(Index),
    /// Valid but not modeled (`EXCLUDE`, `PERIOD FOR`, computed columns).
    Skip,
}

/// Words that start a column attribute rather than a type.
const ATTRIBUTE_START: &[&str] = &[
    "PRIMARY", "NOT", "NULL", "DEFAULT", "UNIQUE", "CHECK", "REFERENCES", "CONSTRAINT", "COLLATE",
    "GENERATED", "AS", "AUTO_INCREMENT", "AUTOINCREMENT", "IDENTITY",
];

pub(super) fn parse_create_table(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    cur.eat_keywords(&["OR", "REPLACE"]);
    while cur
        .eat_any_keyword(&["GLOBAL", "LOCAL", "TEMP", "TEMPORARY", "UNLOGGED", "TRANSIENT"])
        .is_some()
    {}
    cur.expect_keyword("TABLE")?;
    cur.eat_if_exists();
    let name = ctx.object_name(cur)?;

    if cur.peek_any_keyword(&["AS", "LIKE", "OF", "CLONE"]) {
        return Err(ConvertError::unsupported("CREATE TABLE AS", fragment(cur.sql())));
    }
    if !cur.peek_punct("(") {
        return Err(cur.error("expected column definitions"));
    }
    let body = cur.group()?;
    if cur.peek_keyword("AS") {
        return Err(ConvertError::unsupported("CREATE TABLE AS", fragment(cur.sql())));
    }

    let mut table = Table::new(name.name).in_namespace(name.namespace);
    let mut constraints = Vec::new();
    for definition in split_top_level(body) {
        let mut sub = cur.sub(definition);
        match parse_element(ctx, &mut sub)? {
            Element::Column(col, extra) => {
                table.push_column(col);
                constraints.extend(extra);
            }
            Element::Constraint(c) => constraints.push(c),
            Element::Index(index) => table.indexes.push(index),
            Element::Skip => {}
        }
    }
    // Table-level keys may name columns declared after them.
    for constraint in constraints {
        table.add_constraint(constraint);
    }
    for index in table.indexes.iter_mut().filter(|i| i.name.is_empty()) {
        index.name = format!("idx_{}_{}", table.name, index.columns.join("_"));
    }

    parse_table_options(ctx, cur, &mut table)?;
    Ok(Some(SchemaObject::Table(table)))
}

fn parse_table_options(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
    table: &mut Table,
) -> ConvertResult<()> {
    while !cur.is_done() {
        if cur.eat_keyword("TABLESPACE") {
            table.tablespace = Some(cur.identifier()?);
        } else if cur.eat_keyword("COMMENT") {
            cur.eat_operator("=");
            table.comment = cur.advance().and_then(Token::string_value);
        } else if ctx.dialect == Dialect::SqlServer && cur.eat_keyword("ON") {
            let filegroup = cur.identifier()?;
            if !filegroup.eq_ignore_ascii_case("PRIMARY") {
                table.tablespace = Some(filegroup);
            }
            if cur.peek_punct("(") {
                cur.group()?;
            }
        } else {
            cur.skip_item()?;
        }
    }
    Ok(())
}

/// Classify and parse one definition-list entry.
pub(super) fn parse_element(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Element> {
    let Some(first) = cur.peek() else {
        return Err(cur.error("empty definition"));
    };

    if first.is_keyword("CONSTRAINT") {
        cur.advance();
        let name = if cur.peek_any_keyword(&["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]) {
            String::new()
        } else {
            cur.identifier()?
        };
        return parse_constraint_body(ctx, cur, name).map(Element::Constraint);
    }
    if cur.peek_keywords(&["PRIMARY", "KEY"])
        || cur.peek_keywords(&["FOREIGN", "KEY"])
        || (first.is_keyword("CHECK") && cur.peek_nth(1).is_some_and(|t| t.is_punct("(")))
        || (first.is_keyword("UNIQUE") && !starts_column(cur))
    {
        return parse_constraint_body(ctx, cur, String::new()).map(Element::Constraint);
    }
    if first.is_any_keyword(&["FULLTEXT", "SPATIAL"])
        || (first.is_any_keyword(&["KEY", "INDEX"]) && is_inline_index(cur.rest()))
    {
        return parse_inline_index(cur).map(Element::Index);
    }
    if first.is_keyword("EXCLUDE") {
        warn!("EXCLUDE constraint not supported: {}", fragment(&join(cur.rest())));
        return Ok(Element::Skip);
    }
    if cur.peek_keywords(&["PERIOD", "FOR"]) {
        return Ok(Element::Skip);
    }
    if first.is_keyword("LIKE") {
        return Err(ConvertError::unsupported("CREATE TABLE LIKE", fragment(cur.sql())));
    }

    match parse_column(ctx, cur)? {
        Some((col, constraints)) => Ok(Element::Column(col, constraints)),
        None => Ok(Element::Skip),
    }
}

/// `unique INT ...` declares a column named unique.
fn starts_column(cur: &Cursor<'_, '_>) -> bool {
    cur.peek_nth(1).is_some_and(|t| {
        t.is_word() && !t.is_any_keyword(&["KEY", "INDEX", "CLUSTERED", "NONCLUSTERED", "NULLS"])
            && cur.peek_nth(2).is_some_and(|n| !n.is_punct("("))
    })
}

/// `KEY idx (a)` is an index; `key INT` and `key VARCHAR(10)` are columns.
fn is_inline_index(tokens: &[Token<'_>]) -> bool {
    match tokens.iter().position(|t| t.is_punct("(")) {
        Some(open) => !tokens
            .get(open + 1)
            .is_some_and(|t| t.kind == TokenKind::Number),
        None => false,
    }
}

fn parse_constraint_body(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
    name: String,
) -> ConvertResult<Constraint> {
    if cur.eat_keywords(&["PRIMARY", "KEY"]) {
        skip_index_options(cur)?;
        let columns = cur.column_list()?;
        return Ok(Constraint::primary_key(name, columns));
    }
    if cur.eat_keyword("UNIQUE") {
        cur.eat_any_keyword(&["KEY", "INDEX"]);
        cur.eat_keywords(&["NULLS", "NOT", "DISTINCT"]);
        skip_index_options(cur)?;
        let mut name = name;
        if cur.peek().is_some_and(Token::is_identifier) {
            let index_name = cur.identifier()?;
            if name.is_empty() {
                name = index_name;
            }
        }
        skip_index_options(cur)?;
        let columns = cur.column_list()?;
        return Ok(Constraint::unique(name, columns));
    }
    if cur.eat_keywords(&["FOREIGN", "KEY"]) {
        if cur.peek().is_some_and(Token::is_identifier) {
            cur.advance();
        }
        let columns = cur.column_list()?;
        let reference = parse_reference(ctx, cur)?;
        return Ok(Constraint::foreign_key(name, columns, reference));
    }
    if cur.eat_keyword("CHECK") {
        let expression = expression_text(cur.group()?);
        return Ok(Constraint::check(name, expression));
    }
    Err(cur.error("expected constraint definition"))
}

fn skip_index_options(cur: &mut Cursor<'_, '_>) -> ConvertResult<()> {
    loop {
        if cur.eat_any_keyword(&["CLUSTERED", "NONCLUSTERED"]).is_some() {
            continue;
        }
        if cur.eat_keyword("USING") {
            cur.advance();
            continue;
        }
        return Ok(());
    }
}

/// `REFERENCES t [(cols)] [MATCH x] [ON DELETE a] [ON UPDATE a] ...`
fn parse_reference(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Reference> {
    cur.expect_keyword("REFERENCES")?;
    let table = ctx.object_name(cur)?;
    let columns = if cur.peek_punct("(") {
        cur.column_list()?
    } else {
        Vec::new()
    };
    let mut reference = Reference::new(table, columns);
    loop {
        if cur.eat_keywords(&["ON", "DELETE"]) {
            reference.on_delete = Some(referential_action(cur)?);
        } else if cur.eat_keywords(&["ON", "UPDATE"]) {
            reference.on_update = Some(referential_action(cur)?);
        } else if cur.eat_keyword("MATCH") || cur.eat_keyword("INITIALLY") {
            cur.advance();
        } else if cur.eat_keywords(&["NOT", "DEFERRABLE"])
            || cur.eat_keyword("DEFERRABLE")
            || cur.eat_keywords(&["NOT", "FOR", "REPLICATION"])
            || cur.eat_any_keyword(&["ENABLE", "DISABLE", "VALIDATE", "NOVALIDATE"]).is_some()
        {
        } else {
            return Ok(reference);
        }
    }
}

fn referential_action(cur: &mut Cursor<'_, '_>) -> ConvertResult<String> {
    for action in [
        &["CASCADE"][..],
        &["RESTRICT"],
        &["SET", "NULL"],
        &["SET", "DEFAULT"],
        &["NO", "ACTION"],
    ] {
        if cur.eat_keywords(action) {
            return Ok(action.join(" "));
        }
    }
    Err(cur.error("expected referential action"))
}

/// `[FULLTEXT|SPATIAL] KEY|INDEX [name] [CLUSTERED] [USING m] (cols)`
fn parse_inline_index(cur: &mut Cursor<'_, '_>) -> ConvertResult<Index> {
    let mut index = Index::default();
    index.algorithm = cur.eat_any_keyword(&["FULLTEXT", "SPATIAL"]);
    cur.eat_any_keyword(&["KEY", "INDEX"]);
    if cur.peek().is_some_and(Token::is_identifier)
        && !cur.peek_any_keyword(&["USING", "CLUSTERED", "NONCLUSTERED"])
    {
        index.name = cur.identifier()?;
    }
    loop {
        if cur.eat_keyword("CLUSTERED") {
            index.is_clustered = true;
        } else if cur.eat_keyword("NONCLUSTERED") {
        } else if cur.eat_keyword("USING") {
            index.algorithm = Some(cur.identifier()?.to_uppercase());
        } else {
            break;
        }
    }
    index.columns = index_columns(cur.group()?);
    if cur.eat_keyword("USING") {
        index.algorithm = Some(cur.identifier()?.to_uppercase());
    }
    Ok(index)
}

/// Index keys: plain names unquoted, with `DESC` kept and `ASC` and MySQL
/// prefix lengths dropped; expressions as written.
pub(super) fn index_columns(tokens: &[Token<'_>]) -> Vec<String> {
    split_top_level(tokens)
        .into_iter()
        .map(|part| {
            let mut part = part;
            let mut descending = false;
            if let Some(last) = part.last() {
                if last.is_any_keyword(&["ASC", "DESC"]) {
                    descending = last.is_keyword("DESC");
                    part = &part[..part.len() - 1];
                }
            }
            let is_prefixed = part.len() == 4
                && part[1].is_punct("(")
                && part[2].kind == TokenKind::Number
                && part[3].is_punct(")");
            let key = if part.len() == 1 || is_prefixed {
                part[0].ident()
            } else {
                expression_text(part)
            };
            if descending {
                format!("{} DESC", key)
            } else {
                key
            }
        })
        .collect()
}

/// A column definition. `None` for computed columns.
pub(super) fn parse_column(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<(Column, Vec<Constraint>)>> {
    let name = cur.identifier()?;
    let ty = if cur.is_done() || cur.peek_any_keyword(ATTRIBUTE_START) {
        if cur.peek_keyword("AS") {
            debug!("Skipping computed column {}", name);
            return Ok(None);
        }
        canonicalize(ctx.dialect, "TEXT", &[])
    } else {
        parse_type(ctx, cur)?
    };

    let mut col = Column::new(name, ty.data_type);
    if ty.auto_increment {
        col = col.auto_increment();
    }
    if let Some(values) = &ty.allowed_values {
        col.check_expression = Some(allowed_values_check(&col.name, values));
    }

    let mut constraints = Vec::new();
    let mut constraint_name = String::new();
    while !cur.is_done() {
        if cur.eat_keywords(&["NOT", "NULL"]) {
            col.is_nullable = false;
        } else if cur.eat_keyword("NULL") {
        } else if cur.eat_keywords(&["PRIMARY", "KEY"]) {
            cur.eat_any_keyword(&["ASC", "DESC"]);
            cur.eat_any_keyword(&["CLUSTERED", "NONCLUSTERED"]);
            if cur.eat_keywords(&["ON", "CONFLICT"]) {
                cur.advance();
            }
            if cur.eat_keyword("AUTOINCREMENT") {
                col = col.auto_increment();
            }
            if !constraint_name.is_empty() {
                constraints.push(Constraint::primary_key(
                    std::mem::take(&mut constraint_name),
                    vec![col.name.clone()],
                ));
            }
            col = col.primary_key();
        } else if cur.eat_keyword("UNIQUE") {
            cur.eat_keyword("KEY");
            cur.eat_any_keyword(&["CLUSTERED", "NONCLUSTERED"]);
            if !constraint_name.is_empty() {
                constraints.push(Constraint::unique(
                    std::mem::take(&mut constraint_name),
                    vec![col.name.clone()],
                ));
            }
            col.is_unique = true;
        } else if cur.eat_any_keyword(&["AUTO_INCREMENT", "AUTOINCREMENT"]).is_some() {
            col = col.auto_increment();
        } else if cur.eat_keyword("IDENTITY") {
            if cur.peek_punct("(") {
                cur.group()?;
            }
            col = col.auto_increment();
        } else if cur.eat_keyword("GENERATED") {
            if !cur.eat_keyword("ALWAYS") {
                cur.eat_keywords(&["BY", "DEFAULT"]);
                cur.eat_keywords(&["ON", "NULL"]);
            }
            if cur.eat_keywords(&["AS", "IDENTITY"]) {
                if cur.peek_punct("(") {
                    cur.group()?;
                }
                col = col.auto_increment();
            } else {
                debug!("Skipping generated column {}", col.name);
                return Ok(None);
            }
        } else if cur.peek_keyword("AS") {
            debug!("Skipping computed column {}", col.name);
            return Ok(None);
        } else if cur.eat_keyword("DEFAULT") {
            cur.eat_keywords(&["ON", "NULL"]);
            let value = default_expression(cur)?;
            if is_sequence_default(&value) {
                col = col.auto_increment();
                col.default_value = None;
            } else {
                col.default_value = Some(value);
            }
            constraint_name.clear();
        } else if cur.eat_keyword("CHECK") {
            let expression = expression_text(cur.group()?);
            if constraint_name.is_empty() {
                col.check_expression = Some(expression);
            } else {
                constraints.push(Constraint::check(std::mem::take(&mut constraint_name), expression));
            }
        } else if cur.peek_keyword("REFERENCES") {
            let reference = parse_reference(ctx, cur)?;
            constraints.push(Constraint::foreign_key(
                std::mem::take(&mut constraint_name),
                vec![col.name.clone()],
                reference,
            ));
        } else if cur.eat_keyword("CONSTRAINT") {
            constraint_name = cur.identifier()?;
        } else if cur.eat_keyword("COMMENT") {
            col.comment = cur.advance().and_then(Token::string_value);
        } else if cur.eat_keyword("COLLATE") || cur.eat_keyword("CHARSET") {
            cur.advance();
        } else if cur.eat_keywords(&["CHARACTER", "SET"]) {
            cur.advance();
        } else if cur.eat_keywords(&["ON", "UPDATE"]) {
            default_expression(cur)?;
        } else if cur.eat_keywords(&["ON", "CONFLICT"]) {
            cur.advance();
        } else {
            cur.skip_item()?;
        }
    }
    Ok(Some((col, constraints)))
}

fn allowed_values_check(column: &str, values: &[String]) -> String {
    let labels: Vec<String> = values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect();
    format!("{} IN ({})", column, labels.join(", "))
}

fn is_sequence_default(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.starts_with("nextval(") || lower.ends_with(".nextval")
}

/// A default value expression, returned as collapsed text.
pub(super) fn default_expression(cur: &mut Cursor<'_, '_>) -> ConvertResult<String> {
    let start = cur.position();
    parse_operand(cur)?;
    loop {
        if cur.eat_operator("::") {
            parse_cast_type(cur)?;
        } else if cur.peek().is_some_and(|t| {
            t.kind == TokenKind::Operator
                && matches!(t.text, "+" | "-" | "*" | "/" | "%" | "||")
        }) {
            cur.advance();
            parse_operand(cur)?;
        } else {
            break;
        }
    }
    Ok(expression_text(cur.since(start)))
}

fn parse_operand(cur: &mut Cursor<'_, '_>) -> ConvertResult<()> {
    let Some(token) = cur.peek() else {
        return Err(cur.error("expected expression"));
    };
    match token.kind {
        TokenKind::Punct if token.is_punct("(") => {
            cur.group()?;
        }
        TokenKind::Operator if matches!(token.text, "-" | "+") => {
            cur.advance();
            parse_operand(cur)?;
        }
        TokenKind::String | TokenKind::Number | TokenKind::DollarString | TokenKind::Variable => {
            cur.advance();
        }
        TokenKind::Word if cur.peek_keywords(&["NEXT", "VALUE", "FOR"]) => {
            cur.advance();
            cur.advance();
            cur.advance();
            cur.object_name()?;
        }
        TokenKind::Word | TokenKind::QuotedIdent => {
            cur.object_name()?;
            if cur.peek_punct("(") {
                cur.group()?;
            } else if token.is_word() && cur.peek().is_some_and(|t| t.kind == TokenKind::String) {
                // Typed literal: DATE '2020-01-01', INTERVAL '1 day'.
                cur.advance();
            }
        }
        _ => return Err(cur.error("expected expression")),
    }
    Ok(())
}

/// Type after `::`, which may be several words: `character varying`.
fn parse_cast_type(cur: &mut Cursor<'_, '_>) -> ConvertResult<()> {
    cur.object_name()?;
    while cur
        .eat_any_keyword(&["VARYING", "PRECISION", "WITH", "WITHOUT", "TIME", "ZONE", "LOCAL"])
        .is_some()
    {}
    if cur.peek_punct("(") {
        cur.group()?;
    }
    while cur.peek_punct("[") {
        cur.advance();
        cur.integer();
        cur.expect_punct("]")?;
    }
    Ok(())
}

/// A data type, mapped onto the canonical vocabulary.
pub(super) fn parse_type(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<CanonicalType> {
    let mut parts = cur.object_name()?;
    let mut name = parts.pop().unwrap_or_default();
    if !parts.is_empty() {
        let namespace = ctx.namespace(&parts.join("."));
        if !namespace.is_empty() {
            name = format!("{}.{}", namespace, name);
        }
    }

    match name.to_uppercase().as_str() {
        "DOUBLE" if cur.eat_keyword("PRECISION") => name = "DOUBLE PRECISION".into(),
        upper @ ("CHARACTER" | "CHAR" | "NCHAR" | "BIT") if cur.eat_keyword("VARYING") => {
            name = format!("{} VARYING", upper);
        }
        "NATIONAL" => {
            cur.eat_any_keyword(&["CHARACTER", "CHAR"]);
            name = if cur.eat_keyword("VARYING") {
                "NATIONAL CHARACTER VARYING".into()
            } else {
                "NATIONAL CHARACTER".into()
            };
        }
        "LONG" => {
            if let Some(next) = cur.eat_any_keyword(&["RAW", "VARCHAR"]) {
                name = format!("LONG {}", next);
            }
        }
        "INTERVAL" => {
            while cur
                .eat_any_keyword(&["YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND", "TO"])
                .is_some()
            {}
        }
        _ => {}
    }

    let args = if cur.peek_punct("(") {
        type_args(cur.group()?)
    } else {
        Vec::new()
    };

    if cur.eat_keywords(&["WITH", "TIME", "ZONE"]) {
        name = format!("{} WITH TIME ZONE", name.to_uppercase());
    } else if cur.eat_keywords(&["WITH", "LOCAL", "TIME", "ZONE"]) {
        name = format!("{} WITH LOCAL TIME ZONE", name.to_uppercase());
    } else {
        cur.eat_keywords(&["WITHOUT", "TIME", "ZONE"]);
    }
    // Oracle: INTERVAL DAY(2) TO SECOND(6).
    if name.eq_ignore_ascii_case("INTERVAL") && cur.eat_keyword("TO") {
        cur.advance();
        if cur.peek_punct("(") {
            cur.group()?;
        }
    }
    while cur.eat_any_keyword(&["UNSIGNED", "SIGNED", "ZEROFILL"]).is_some() {}
    while cur.peek_punct("[") {
        cur.advance();
        cur.integer();
        cur.expect_punct("]")?;
        name.push_str("[]");
    }

    Ok(canonicalize(ctx.dialect, &name, &args))
}

fn type_args(tokens: &[Token<'_>]) -> Vec<TypeArg> {
    split_top_level(tokens)
        .into_iter()
        .map(|part| match part[0].kind {
            TokenKind::Number => part[0]
                .text
                .parse()
                .map(TypeArg::Number)
                .unwrap_or(TypeArg::Other),
            TokenKind::String => TypeArg::Text(part[0].string_value().unwrap_or_default()),
            TokenKind::Word if part[0].is_keyword("MAX") => TypeArg::Max,
            _ => TypeArg::Other,
        })
        .collect()
}

// ============================================================================
// ALTER TABLE
// ============================================================================

pub(super) fn parse_alter_table(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("ALTER")?;
    cur.expect_keyword("TABLE")?;
    cur.eat_if_exists();
    cur.eat_keyword("ONLY");
    let table = ctx.object_name(cur)?;

    let mut actions = Vec::new();
    for part in split_top_level(cur.rest()) {
        let mut sub = cur.sub(part);
        actions.extend(parse_alter_action(ctx, &mut sub)?);
    }
    if actions.is_empty() {
        debug!("ALTER TABLE {} has no schema-level action", table);
        return Ok(None);
    }
    Ok(Some(SchemaObject::Alteration(TableAlteration { table, actions })))
}

fn parse_alter_action(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Vec<AlterAction>> {
    if cur.peek_keyword("WITH") && cur.peek_nth(1).is_some_and(|t| t.is_any_keyword(&["CHECK", "NOCHECK"])) {
        cur.advance();
        cur.advance();
    }

    if cur.eat_keyword("ADD") {
        if cur.peek_keyword("CONSTRAINT") && cur.peek_nth(2).is_some_and(|t| t.is_keyword("DEFAULT")) {
            cur.advance();
            cur.advance();
            cur.advance();
            let value = default_expression(cur)?;
            cur.expect_keyword("FOR")?;
            let column = cur.identifier()?;
            return Ok(vec![default_action(column, value)]);
        }
        if cur.eat_keyword("COLUMN") {
            cur.eat_if_exists();
        }
        if cur.peek_punct("(") {
            let mut actions = Vec::new();
            for part in split_top_level(cur.group()?) {
                actions.extend(added_element(ctx, &mut cur.sub(part))?);
            }
            return Ok(actions);
        }
        return added_element(ctx, cur);
    }

    if cur.eat_keyword("MODIFY") {
        cur.eat_keyword("COLUMN");
        if cur.peek_punct("(") {
            let mut actions = Vec::new();
            for part in split_top_level(cur.group()?) {
                actions.extend(modified_column(ctx, &mut cur.sub(part))?);
            }
            return Ok(actions);
        }
        return modified_column(ctx, cur);
    }

    if cur.eat_keyword("CHANGE") {
        cur.eat_keyword("COLUMN");
        let old = cur.identifier()?;
        return Ok(match parse_column(ctx, cur)? {
            Some((col, _)) if col.name.eq_ignore_ascii_case(&old) => vec![AlterAction::ModifyColumn(col)],
            Some((col, _)) => {
                warn!("Column rename {} -> {} not modeled", old, col.name);
                Vec::new()
            }
            None => Vec::new(),
        });
    }

    if cur.eat_keywords(&["ALTER", "COLUMN"]) || cur.eat_keyword("ALTER") {
        let start = cur.position();
        let column = cur.identifier()?;
        if cur.eat_keywords(&["SET", "DEFAULT"]) {
            let value = default_expression(cur)?;
            return Ok(vec![default_action(column, value)]);
        }
        if cur.eat_keywords(&["SET", "NOT", "NULL"]) {
            return Ok(vec![AlterAction::SetNotNull { column }]);
        }
        if ctx.dialect == Dialect::SqlServer && !cur.is_done() && !cur.peek_any_keyword(&["ADD", "DROP"]) {
            cur.rewind(start);
            return Ok(parse_column(ctx, cur)?
                .map(|(col, _)| AlterAction::ModifyColumn(col))
                .into_iter()
                .collect());
        }
        return Ok(Vec::new());
    }

    if cur.eat_keyword("COMMENT") {
        cur.eat_operator("=");
        if let Some(text) = cur.advance().and_then(Token::string_value) {
            return Ok(vec![AlterAction::Comment { column: None, text }]);
        }
    }
    Ok(Vec::new())
}

fn default_action(column: String, value: String) -> AlterAction {
    if is_sequence_default(&value) {
        AlterAction::SetAutoIncrement { column }
    } else {
        AlterAction::SetDefault { column, value }
    }
}

fn added_element(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Vec<AlterAction>> {
    Ok(match parse_element(ctx, cur)? {
        Element::Column(col, constraints) => std::iter::once(AlterAction::AddColumn(col))
            .chain(constraints.into_iter().map(AlterAction::AddConstraint))
            .collect(),
        Element::Constraint(c) => vec![AlterAction::AddConstraint(c)],
        Element::Index(mut index) => {
            if index.name.is_empty() {
                index.name = format!("idx_{}", index.columns.join("_"));
            }
            vec![AlterAction::AddIndex(index)]
        }
        Element::Skip => Vec::new(),
    })
}

/// `MODIFY col type ...`, or Oracle's attribute-only `MODIFY (col NOT NULL)`.
fn modified_column(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Vec<AlterAction>> {
    let attributes_only = cur
        .peek_nth(1)
        .is_some_and(|t| t.is_any_keyword(&["NOT", "NULL", "DEFAULT", "CONSTRAINT"]));
    if !attributes_only {
        return Ok(parse_column(ctx, cur)?
            .map(|(col, _)| AlterAction::ModifyColumn(col))
            .into_iter()
            .collect());
    }

    let column = cur.identifier()?;
    let mut actions = Vec::new();
    while !cur.is_done() {
        if cur.eat_keywords(&["NOT", "NULL"]) {
            actions.push(AlterAction::SetNotNull { column: column.clone() });
        } else if cur.eat_keyword("DEFAULT") {
            let value = default_expression(cur)?;
            actions.push(default_action(column.clone(), value));
        } else {
            cur.skip_item()?;
        }
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex_with;
    use crate::schema::{ConstraintKind, DataType};
    use pretty_assertions::assert_eq;

    fn table(dialect: Dialect, sql: &str) -> Table {
        let tokens = lex_with(sql, dialect.lex_options()).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        match parse_create_table(&Context::new(dialect), &mut cur).unwrap() {
            Some(SchemaObject::Table(t)) => t,
            other => panic!("expected table, got {:?}", other),
        }
    }

    fn alteration(dialect: Dialect, sql: &str) -> Option<TableAlteration> {
        let tokens = lex_with(sql, dialect.lex_options()).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        match parse_alter_table(&Context::new(dialect), &mut cur).unwrap() {
            Some(SchemaObject::Alteration(a)) => Some(a),
            None => None,
            other => panic!("expected alteration, got {:?}", other),
        }
    }

    #[test]
    fn test_mysql_table_with_keys_and_options() {
        let t = table(
            Dialect::MySql,
            "CREATE TABLE `users` (
                `id` int(11) NOT NULL AUTO_INCREMENT,
                `email` varchar(255) NOT NULL COMMENT 'login',
                `active` tinyint(1) DEFAULT '1',
                `role` enum('admin','user') DEFAULT 'user',
                PRIMARY KEY (`id`),
                UNIQUE KEY `uq_email` (`email`),
                KEY `idx_role` (`role`(10))
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='people'",
        );
        assert_eq!(t.name, "users");
        assert_eq!(t.columns.len(), 4);
        let id = &t.columns[0];
        assert!(id.is_primary_key && id.auto_increment && !id.is_nullable);
        assert_eq!(id.data_type.name, "INT");
        assert_eq!(t.columns[1].comment.as_deref(), Some("login"));
        assert_eq!(t.columns[2].data_type.name, "BOOLEAN");
        assert_eq!(t.columns[2].default_value.as_deref(), Some("'1'"));
        assert_eq!(t.columns[3].check_expression.as_deref(), Some("role IN ('admin', 'user')"));
        assert!(t.columns[1].is_unique);
        assert_eq!(t.constraints.len(), 1);
        assert_eq!(t.constraints[0].name, "uq_email");
        assert_eq!(t.indexes[0].name, "idx_role");
        assert_eq!(t.indexes[0].columns, vec!["role"]);
        assert_eq!(t.comment.as_deref(), Some("people"));
    }

    #[test]
    fn test_postgres_serial_and_casts() {
        let t = table(
            Dialect::Postgres,
            "CREATE TABLE public.orders (
                id bigserial PRIMARY KEY,
                status character varying(20) DEFAULT 'new'::character varying NOT NULL,
                placed_at timestamp with time zone DEFAULT now(),
                tags text[],
                user_id integer REFERENCES users (id) ON DELETE CASCADE
            )",
        );
        assert_eq!(t.namespace, "");
        assert!(t.columns[0].auto_increment);
        assert_eq!(t.columns[0].data_type.name, "BIGINT");
        assert_eq!(t.columns[1].data_type.to_string(), "VARCHAR(20)");
        assert_eq!(t.columns[1].default_value.as_deref(), Some("'new'::character varying"));
        assert!(!t.columns[1].is_nullable);
        assert_eq!(t.columns[2].data_type.name, "TIMESTAMPTZ");
        assert_eq!(t.columns[3].data_type.name, "text[]");
        let fk = &t.constraints[0];
        assert_eq!(fk.kind, ConstraintKind::ForeignKey);
        assert_eq!(fk.columns, vec!["user_id"]);
        assert_eq!(fk.reference.as_ref().unwrap().on_delete.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn test_sqlserver_identity_and_filegroup() {
        let t = table(
            Dialect::SqlServer,
            "CREATE TABLE [dbo].[Items] (
                [Id] INT IDENTITY(1,1) NOT NULL,
                [Name] NVARCHAR(MAX) NULL,
                [Price] DECIMAL(10, 2) CONSTRAINT [DF_Price] DEFAULT ((0)),
                [Total] AS ([Price] * 2),
                CONSTRAINT [PK_Items] PRIMARY KEY CLUSTERED ([Id] ASC)
            ) ON [PRIMARY] TEXTIMAGE_ON [PRIMARY]",
        );
        assert_eq!(t.columns.len(), 3);
        assert!(t.columns[0].auto_increment && t.columns[0].is_primary_key);
        assert_eq!(t.columns[1].data_type.name, "TEXT");
        assert_eq!(t.columns[2].default_value.as_deref(), Some("0"));
        assert_eq!(t.constraints[0].name, "PK_Items");
        assert_eq!(t.tablespace, None);
    }

    #[test]
    fn test_composite_primary_key_declared_first() {
        let t = table(
            Dialect::Sqlite,
            "CREATE TABLE link (PRIMARY KEY (a, b), a INTEGER, b INTEGER)",
        );
        assert!(t.columns.iter().all(|c| c.is_primary_key && !c.is_nullable));
        assert_eq!(t.primary_key_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_sqlite_typeless_column() {
        let t = table(Dialect::Sqlite, "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, note)");
        assert!(t.columns[0].auto_increment);
        assert_eq!(t.columns[1].data_type.name, "TEXT");
    }

    #[test]
    fn test_oracle_number_and_identity() {
        let t = table(
            Dialect::Oracle,
            "CREATE TABLE emp (
                id NUMBER(10) GENERATED BY DEFAULT ON NULL AS IDENTITY,
                salary NUMBER(10,2),
                hired DATE DEFAULT SYSDATE NOT NULL
            ) TABLESPACE users",
        );
        assert_eq!(t.columns[0].data_type.name, "INT");
        assert!(t.columns[0].auto_increment);
        assert_eq!(t.columns[1].data_type.to_string(), "DECIMAL(10,2)");
        assert_eq!(t.columns[2].default_value.as_deref(), Some("SYSDATE"));
        assert_eq!(t.tablespace.as_deref(), Some("users"));
    }

    #[test]
    fn test_create_table_as_is_unsupported() {
        let sql = "CREATE TABLE copy AS SELECT * FROM t";
        let tokens = lex_with(sql, Dialect::MySql.lex_options()).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        let err = parse_create_table(&Context::new(Dialect::MySql), &mut cur).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_missing_column_list_is_malformed() {
        let sql = "CREATE TABLE t";
        let tokens = lex_with(sql, Dialect::MySql.lex_options()).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        let err = parse_create_table(&Context::new(Dialect::MySql), &mut cur).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedStatement { .. }));
    }

    #[test]
    fn test_alter_table_sequence_default() {
        let a = alteration(
            Dialect::Postgres,
            "ALTER TABLE ONLY public.users ALTER COLUMN id SET DEFAULT nextval('public.users_id_seq'::regclass)",
        )
        .unwrap();
        assert_eq!(a.actions, vec![AlterAction::SetAutoIncrement { column: "id".into() }]);
    }

    #[test]
    fn test_alter_table_add_keys() {
        let a = alteration(
            Dialect::MySql,
            "ALTER TABLE `orders` ADD PRIMARY KEY (`id`), ADD KEY `idx_user` (`user_id`), MODIFY `id` int NOT NULL AUTO_INCREMENT",
        )
        .unwrap();
        assert_eq!(a.actions.len(), 3);
        assert!(matches!(&a.actions[0], AlterAction::AddConstraint(c) if c.kind == ConstraintKind::PrimaryKey));
        assert!(matches!(&a.actions[1], AlterAction::AddIndex(i) if i.name == "idx_user"));
        assert!(matches!(&a.actions[2], AlterAction::ModifyColumn(c) if c.auto_increment));
    }

    #[test]
    fn test_alter_table_sqlserver_named_default() {
        let a = alteration(
            Dialect::SqlServer,
            "ALTER TABLE [dbo].[Items] ADD CONSTRAINT [DF_Items_Qty] DEFAULT ((1)) FOR [Qty]",
        )
        .unwrap();
        assert_eq!(
            a.actions,
            vec![AlterAction::SetDefault { column: "Qty".into(), value: "1".into() }]
        );
    }

    #[test]
    fn test_alter_table_oracle_modify_not_null() {
        let a = alteration(Dialect::Oracle, "ALTER TABLE emp MODIFY (name NOT NULL)").unwrap();
        assert_eq!(a.actions, vec![AlterAction::SetNotNull { column: "name".into() }]);
    }

    #[test]
    fn test_alter_table_owner_is_ignored() {
        assert_eq!(alteration(Dialect::Postgres, "ALTER TABLE public.t OWNER TO admin"), None);
    }

    #[test]
    fn test_parse_type_multiword() {
        let sql = "double precision";
        let tokens = lex_with(sql, Dialect::Postgres.lex_options()).unwrap();
        let mut cur = Cursor::new(sql, &tokens);
        let ty = parse_type(&Context::new(Dialect::Postgres), &mut cur).unwrap();
        assert_eq!(ty.data_type, DataType::new("DOUBLE"));
    }
}
