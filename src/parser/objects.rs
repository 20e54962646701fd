//! Everything that is not a table, a routine or a trigger.

use std::collections::HashMap;

use tracing::debug;

use super::cursor::{expression_text, fragment, Cursor};
use super::lexer::{join, split_top_level, Token, TokenKind};
use super::table::{index_columns, parse_type};
use super::{skip_create_modifiers, Context};
use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::schema::{
    AlterAction, Extension, Index, ObjectName, Permission, PermissionKind, SchemaObject, Sequence,
    TableAlteration, TypeDef, TypeKind, View,
};

/// `CREATE [UNIQUE] [CLUSTERED] [BITMAP] INDEX name ON table (cols) ...`
pub(super) fn parse_create_index(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    cur.eat_keywords(&["OR", "REPLACE"]);
    let mut index = Index::default();
    while let Some(modifier) = cur.eat_any_keyword(&[
        "UNIQUE", "CLUSTERED", "NONCLUSTERED", "BITMAP", "FULLTEXT", "SPATIAL",
    ]) {
        match modifier.as_str() {
            "UNIQUE" => index.is_unique = true,
            "CLUSTERED" => index.is_clustered = true,
            "BITMAP" => index.is_bitmap = true,
            "FULLTEXT" | "SPATIAL" => index.algorithm = Some(modifier),
            _ => {}
        }
    }
    cur.expect_keyword("INDEX")?;
    cur.eat_keyword("CONCURRENTLY");
    cur.eat_if_exists();
    if !cur.peek_keyword("ON") {
        index.name = cur.object_name()?.pop().unwrap_or_default();
    }
    cur.expect_keyword("ON")?;
    cur.eat_keyword("ONLY");
    let table = ctx.object_name(cur)?;
    if cur.eat_keyword("USING") {
        index.algorithm = Some(cur.identifier()?.to_uppercase());
    }
    index.columns = index_columns(cur.group()?);

    while !cur.is_done() {
        if cur.eat_keyword("WHERE") {
            let filter = cur.take_until_keyword(&["TABLESPACE", "WITH", "ON"]);
            index.filter = Some(expression_text(filter));
        } else if cur.eat_keyword("TABLESPACE") {
            index.tablespace = Some(cur.identifier()?);
        } else if ctx.dialect == Dialect::SqlServer && cur.eat_keyword("ON") {
            let filegroup = cur.identifier()?;
            if !filegroup.eq_ignore_ascii_case("PRIMARY") {
                index.tablespace = Some(filegroup);
            }
        } else if cur.eat_keyword("USING") {
            index.algorithm = Some(cur.identifier()?.to_uppercase());
        } else {
            cur.skip_item()?;
        }
    }

    if index.name.is_empty() {
        index.name = format!("idx_{}_{}", table.name, index.columns.join("_"));
    }
    Ok(Some(SchemaObject::Index { table, index }))
}

/// `CREATE [MATERIALIZED] VIEW name [(cols)] AS query`
pub(super) fn parse_create_view(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    skip_create_modifiers(cur);
    let is_materialized = cur.eat_keyword("MATERIALIZED");
    cur.expect_keyword("VIEW")?;
    cur.eat_if_exists();
    let name = ctx.object_name(cur)?;
    let columns = if cur.peek_punct("(") {
        cur.column_list()?
    } else {
        Vec::new()
    };
    if cur.eat_keyword("WITH") {
        cur.skip_item()?;
    }
    cur.expect_keyword("AS")?;

    let mut query = cur.rest();
    if let [head @ .., with, data] = query {
        if with.is_keyword("WITH") && data.is_keyword("DATA") {
            query = head;
        } else if let [head @ .., with, no, data] = query {
            if with.is_keyword("WITH") && no.is_keyword("NO") && data.is_keyword("DATA") {
                query = head;
            }
        }
    }
    if query.is_empty() {
        return Err(cur.error("expected view query"));
    }

    Ok(Some(SchemaObject::View(View {
        name: name.name,
        namespace: name.namespace,
        columns,
        definition: join(query),
        is_materialized,
    })))
}

/// `CREATE SEQUENCE name [options]`
pub(super) fn parse_create_sequence(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    skip_create_modifiers(cur);
    cur.expect_keyword("SEQUENCE")?;
    cur.eat_if_exists();
    let name = ctx.object_name(cur)?;
    let mut seq = Sequence {
        name: name.name,
        namespace: name.namespace,
        ..Default::default()
    };

    while !cur.is_done() {
        if cur.eat_keyword("AS") {
            parse_type(ctx, cur)?;
        } else if cur.eat_keyword("START") {
            cur.eat_keyword("WITH");
            seq.start = Some(sequence_number(cur)?);
        } else if cur.eat_keyword("INCREMENT") {
            cur.eat_keyword("BY");
            seq.increment = Some(sequence_number(cur)?);
        } else if cur.eat_keyword("MINVALUE") {
            seq.min_value = Some(sequence_number(cur)?);
        } else if cur.eat_keyword("MAXVALUE") {
            seq.max_value = Some(sequence_number(cur)?);
        } else if cur.eat_keyword("CACHE") {
            seq.cache = Some(sequence_number(cur)?);
        } else if cur.eat_keyword("CYCLE") {
            seq.cycle = true;
        } else if cur.eat_keywords(&["NO", "CYCLE"]) || cur.eat_keyword("NOCYCLE") {
            seq.cycle = false;
        } else if cur.eat_keywords(&["OWNED", "BY"]) {
            cur.object_name()?;
        } else {
            // NO MINVALUE, NOCACHE, ORDER, NOORDER and friends.
            cur.skip_item()?;
        }
    }
    Ok(Some(SchemaObject::Sequence(seq)))
}

fn sequence_number(cur: &mut Cursor<'_, '_>) -> ConvertResult<i128> {
    cur.integer().ok_or_else(|| cur.error("expected number"))
}

/// `CREATE TYPE name AS ENUM (...)` and composite types.
pub(super) fn parse_create_type(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    skip_create_modifiers(cur);
    cur.expect_keyword("TYPE")?;
    let name = ctx.object_name(cur)?;
    cur.eat_keyword("FORCE");
    if cur.eat_keyword("FROM") {
        return Err(ConvertError::unsupported("CREATE TYPE FROM", fragment(cur.sql())));
    }
    if cur.eat_any_keyword(&["AS", "IS"]).is_none() {
        return Err(ConvertError::unsupported("CREATE TYPE", fragment(cur.sql())));
    }

    let kind = if cur.eat_keyword("ENUM") {
        TypeKind::Enum
    } else if cur.eat_keyword("OBJECT") || cur.eat_keyword("TABLE") || cur.peek_punct("(") {
        TypeKind::Composite
    } else {
        return Err(ConvertError::unsupported("CREATE TYPE", fragment(cur.sql())));
    };
    let definition = format!("({})", join(cur.group()?));

    Ok(Some(SchemaObject::Type(TypeDef {
        name: name.name,
        namespace: name.namespace,
        kind,
        definition,
    })))
}

/// `CREATE EXTENSION [IF NOT EXISTS] name [WITH] [SCHEMA s] [VERSION v]`
pub(super) fn parse_create_extension(
    _ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    cur.expect_keyword("EXTENSION")?;
    cur.eat_if_exists();
    let mut extension = Extension {
        name: cur.identifier()?,
        schema: None,
        version: None,
    };
    cur.eat_keyword("WITH");
    while !cur.is_done() {
        if cur.eat_keyword("SCHEMA") {
            extension.schema = Some(cur.identifier()?);
        } else if cur.eat_keyword("VERSION") {
            extension.version = cur.advance().map(Token::ident);
        } else {
            cur.skip_item()?;
        }
    }
    Ok(Some(SchemaObject::Extension(extension)))
}

/// `CREATE SCHEMA`. MySQL treats it as `CREATE DATABASE`.
pub(super) fn parse_create_schema(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    cur.expect_keyword("SCHEMA")?;
    cur.eat_if_exists();
    if cur.peek_keyword("AUTHORIZATION") {
        debug!("CREATE SCHEMA AUTHORIZATION without a name; ignored");
        return Ok(None);
    }
    let name = cur.identifier()?;
    if ctx.dialect == Dialect::MySql {
        return Ok(Some(SchemaObject::Database(name)));
    }
    let namespace = ctx.namespace(&name);
    if namespace.is_empty() {
        return Ok(None);
    }
    Ok(Some(SchemaObject::Namespace(namespace)))
}

pub(super) fn parse_create_database(
    _ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    cur.expect_keyword("DATABASE")?;
    cur.eat_if_exists();
    Ok(Some(SchemaObject::Database(cur.identifier()?)))
}

pub(super) fn parse_use(
    _ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("USE")?;
    Ok(Some(SchemaObject::Database(cur.identifier()?)))
}

/// `ALTER SESSION SET CURRENT_SCHEMA = name`; other session settings are ignored.
pub(super) fn parse_alter_session(
    _ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("ALTER")?;
    cur.expect_keyword("SESSION")?;
    if !cur.eat_keywords(&["SET", "CURRENT_SCHEMA"]) {
        return Ok(None);
    }
    cur.eat_operator("=");
    Ok(Some(SchemaObject::Database(cur.identifier()?)))
}

/// `COMMENT ON TABLE|COLUMN name IS 'text'`
pub(super) fn parse_comment(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("COMMENT")?;
    cur.expect_keyword("ON")?;
    let Some(target) = cur.eat_any_keyword(&["TABLE", "COLUMN"]) else {
        debug!("Comment target not modeled: {}", fragment(cur.sql()));
        return Ok(None);
    };
    let mut parts = cur.object_name()?;
    cur.expect_keyword("IS")?;
    let Some(text) = cur.advance().and_then(Token::string_value) else {
        return Ok(None);
    };

    let column = if target == "COLUMN" {
        if parts.len() < 2 {
            return Err(cur.error("expected table.column"));
        }
        parts.pop()
    } else {
        None
    };
    Ok(Some(SchemaObject::Alteration(TableAlteration::new(
        ctx.name(parts),
        AlterAction::Comment { column, text },
    ))))
}

const EXTENDED_PROPERTY_ARGS: &[&str] = &[
    "name", "value", "level0type", "level0name", "level1type", "level1name", "level2type",
    "level2name",
];

/// `EXEC sp_addextendedproperty` carrying an `MS_Description` on a table or column.
pub(super) fn parse_extended_property(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    if cur.eat_any_keyword(&["EXEC", "EXECUTE"]).is_none() {
        return Err(cur.error("expected EXEC"));
    }
    cur.object_name()?;

    let mut args: HashMap<String, Option<String>> = HashMap::new();
    for (i, arg) in split_top_level(cur.rest()).into_iter().enumerate() {
        let (key, value) = match arg {
            [var, eq, value, ..] if var.kind == TokenKind::Variable && eq.is_operator("=") => {
                (var.text.trim_start_matches('@').to_lowercase(), value)
            }
            [value, ..] => match EXTENDED_PROPERTY_ARGS.get(i) {
                Some(key) => (key.to_string(), value),
                None => continue,
            },
            [] => continue,
        };
        let value = match value.kind {
            TokenKind::String => value.string_value(),
            _ if value.is_keyword("NULL") => None,
            _ => Some(value.ident()),
        };
        args.insert(key, value);
    }

    let arg = |key: &str| args.get(key).cloned().flatten().unwrap_or_default();
    if !arg("name").eq_ignore_ascii_case("MS_Description")
        || !arg("level1type").eq_ignore_ascii_case("TABLE")
    {
        debug!("Extended property not modeled: {}", fragment(cur.sql()));
        return Ok(None);
    }
    let namespace = if arg("level0type").eq_ignore_ascii_case("SCHEMA") {
        ctx.namespace(&arg("level0name"))
    } else {
        String::new()
    };
    let column = if arg("level2type").eq_ignore_ascii_case("COLUMN") {
        Some(arg("level2name"))
    } else {
        None
    };

    Ok(Some(SchemaObject::Alteration(TableAlteration::new(
        ObjectName::new(namespace, arg("level1name")),
        AlterAction::Comment {
            column,
            text: arg("value"),
        },
    ))))
}

/// `GRANT privs [ON object] TO grantees [WITH GRANT OPTION]` and `REVOKE`.
pub(super) fn parse_permission(
    _ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    let kind = if cur.eat_keyword("GRANT") {
        PermissionKind::Grant
    } else {
        cur.expect_keyword("REVOKE")?;
        cur.eat_keywords(&["GRANT", "OPTION", "FOR"]);
        PermissionKind::Revoke
    };

    let privileges: Vec<String> = split_top_level(cur.take_until_keyword(&["ON", "TO", "FROM"]))
        .into_iter()
        .map(join)
        .collect();
    if privileges.is_empty() {
        return Err(cur.error("expected privileges"));
    }

    let object = if cur.eat_keyword("ON") {
        join(cur.take_until_keyword(&["TO", "FROM"]))
    } else {
        String::new()
    };
    if cur.eat_any_keyword(&["TO", "FROM"]).is_none() {
        return Err(cur.error("expected TO or FROM"));
    }
    let grantees = cur.take_until_keyword(&["WITH", "CASCADE", "RESTRICT", "GRANTED"]);
    let grantee = split_top_level(grantees)
        .into_iter()
        .map(join)
        .collect::<Vec<_>>()
        .join(", ");
    if grantee.is_empty() {
        return Err(cur.error("expected grantee"));
    }
    let with_grant = cur.eat_keywords(&["WITH", "GRANT", "OPTION"]);

    Ok(Some(SchemaObject::Permission(Permission {
        kind,
        privileges,
        object,
        grantee,
        with_grant,
    })))
}
