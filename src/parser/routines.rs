//! Functions, procedures and triggers.
//!
//! Bodies are kept verbatim: only the header is parsed, and everything
//! after the dialect's body marker is stored as written.

use super::cursor::{expression_text, fragment, Cursor};
use super::lexer::{join, split_top_level, Token, TokenKind};
use super::table::parse_type;
use super::{skip_create_modifiers, Context};
use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::schema::{
    DataType, Function, ObjectName, ParamDirection, Parameter, SchemaObject, Trigger,
    TriggerEvent, TriggerTiming,
};

pub(super) fn parse_create_routine(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    skip_create_modifiers(cur);
    let is_procedure = match cur.eat_any_keyword(&["FUNCTION", "PROCEDURE", "PROC"]) {
        Some(keyword) => keyword != "FUNCTION",
        None => return Err(cur.error("expected FUNCTION or PROCEDURE")),
    };
    if ctx.dialect == Dialect::Sqlite {
        return Err(ConvertError::unsupported("CREATE FUNCTION", fragment(cur.sql())));
    }
    cur.eat_if_exists();
    let name = ctx.object_name(cur)?;

    let parameters = if cur.peek_punct("(") {
        let group = cur.group()?;
        parse_parameters(ctx, cur, group)?
    } else if ctx.dialect == Dialect::SqlServer {
        let tokens = cur.take_until_keyword(&["AS", "WITH", "RETURNS"]);
        parse_parameters(ctx, cur, tokens)?
    } else {
        Vec::new()
    };

    let return_type = if cur.eat_any_keyword(&["RETURNS", "RETURN"]).is_some() {
        Some(parse_return_type(ctx, cur)?)
    } else {
        None
    };

    let (body, language) = match ctx.dialect {
        Dialect::Postgres => postgres_body(cur)?,
        Dialect::MySql => mysql_body(cur),
        Dialect::Oracle => oracle_body(cur)?,
        Dialect::SqlServer | Dialect::Sqlite => sqlserver_body(cur)?,
    };
    if body.is_empty() {
        return Err(cur.error("expected routine body"));
    }

    Ok(Some(SchemaObject::Function(Function {
        name: name.name,
        namespace: name.namespace,
        parameters,
        return_type,
        body,
        language,
        is_procedure,
    })))
}

fn parse_parameters<'t, 'a>(
    ctx: &Context,
    cur: &Cursor<'t, 'a>,
    tokens: &'t [Token<'a>],
) -> ConvertResult<Vec<Parameter>> {
    split_top_level(tokens)
        .into_iter()
        .map(|part| parse_parameter(ctx, &mut cur.sub(part)))
        .collect()
}

fn eat_direction(cur: &mut Cursor<'_, '_>) -> Option<ParamDirection> {
    if cur.eat_keywords(&["IN", "OUT"]) || cur.eat_keyword("INOUT") {
        Some(ParamDirection::InOut)
    } else if cur.eat_any_keyword(&["OUT", "OUTPUT"]).is_some() {
        Some(ParamDirection::Out)
    } else if cur.eat_keyword("IN") {
        Some(ParamDirection::In)
    } else {
        None
    }
}

/// `[dir] name [dir] type [default]`, or an unnamed `type`.
fn parse_parameter(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Parameter> {
    let mut direction = eat_direction(cur).unwrap_or_default();
    cur.eat_keyword("VARIADIC");

    let name = match (cur.peek(), cur.peek_nth(1)) {
        (Some(first), _) if first.kind == TokenKind::Variable => {
            cur.advance();
            first.text.trim_start_matches('@').to_string()
        }
        (Some(first), Some(second))
            if first.is_identifier()
                && second.is_identifier()
                && !second.is_any_keyword(&["PRECISION", "VARYING", "WITH", "WITHOUT"]) =>
        {
            cur.identifier()?
        }
        _ => String::new(),
    };

    if let Some(d) = eat_direction(cur) {
        direction = d;
    }
    while cur.eat_any_keyword(&["NOCOPY", "AS"]).is_some() {}
    let data_type = parse_type(ctx, cur)?.data_type;

    while !cur.is_done() {
        if cur.eat_any_keyword(&["OUT", "OUTPUT"]).is_some() {
            direction = ParamDirection::Out;
        } else if cur.peek_keyword("DEFAULT") || cur.peek().is_some_and(|t| t.is_operator("=") || t.is_operator(":=")) {
            break;
        } else {
            cur.skip_item()?;
        }
    }

    Ok(Parameter {
        name,
        data_type,
        direction,
    })
}

fn parse_return_type(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<DataType> {
    if cur.eat_keyword("SETOF") {
        let ty = parse_type(ctx, cur)?.data_type;
        return Ok(DataType::new(format!("SETOF {}", ty)));
    }
    if cur.peek().is_some_and(|t| t.kind == TokenKind::Variable) {
        cur.advance();
    }
    if cur.eat_keyword("TABLE") {
        if cur.peek_punct("(") {
            let columns = cur.group()?;
            return Ok(DataType::new(format!("TABLE ({})", join(columns))));
        }
        return Ok(DataType::new("TABLE"));
    }
    Ok(parse_type(ctx, cur)?.data_type)
}

/// `AS $$...$$ LANGUAGE x`, in any order with the other attributes.
fn postgres_body(cur: &mut Cursor<'_, '_>) -> ConvertResult<(String, String)> {
    let mut body = None;
    let mut language = None;
    while !cur.is_done() {
        if cur.eat_keyword("LANGUAGE") {
            language = Some(cur.identifier()?.to_lowercase());
        } else if cur.eat_keyword("AS") {
            body = cur.advance().and_then(Token::string_value);
            // C functions: AS 'file', 'symbol'.
            if cur.eat_punct(",") {
                cur.advance();
            }
        } else if cur.peek_keywords(&["BEGIN", "ATOMIC"]) || cur.peek_keyword("RETURN") {
            body = Some(cur.raw_rest().to_string());
            cur.skip_all();
        } else {
            cur.skip_item()?;
        }
    }
    let body = body.ok_or_else(|| cur.error("expected function body"))?;
    Ok((
        strip_terminator(&body),
        language.unwrap_or_else(|| "plpgsql".to_string()),
    ))
}

fn mysql_body(cur: &mut Cursor<'_, '_>) -> (String, String) {
    loop {
        if cur.eat_keywords(&["NOT", "DETERMINISTIC"])
            || cur.eat_keyword("DETERMINISTIC")
            || cur.eat_keywords(&["CONTAINS", "SQL"])
            || cur.eat_keywords(&["NO", "SQL"])
            || cur.eat_keywords(&["READS", "SQL", "DATA"])
            || cur.eat_keywords(&["MODIFIES", "SQL", "DATA"])
            || cur.eat_keywords(&["LANGUAGE", "SQL"])
        {
            continue;
        }
        if cur.eat_keywords(&["SQL", "SECURITY"])
            || cur.eat_keywords(&["CHARACTER", "SET"])
            || cur.eat_any_keyword(&["COMMENT", "CHARSET", "COLLATE"]).is_some()
        {
            cur.advance();
            continue;
        }
        break;
    }
    (strip_terminator(cur.raw_rest()), "SQL".to_string())
}

fn oracle_body(cur: &mut Cursor<'_, '_>) -> ConvertResult<(String, String)> {
    cur.take_until_keyword(&["IS", "AS"]);
    if cur.eat_any_keyword(&["IS", "AS"]).is_none() {
        return Err(cur.error("expected IS or AS"));
    }
    Ok((strip_terminator(cur.raw_rest()), "PLSQL".to_string()))
}

fn sqlserver_body(cur: &mut Cursor<'_, '_>) -> ConvertResult<(String, String)> {
    cur.take_until_keyword(&["AS"]);
    cur.expect_keyword("AS")?;
    Ok((strip_terminator(cur.raw_rest()), "TSQL".to_string()))
}

/// Trim and drop one trailing `;`.
fn strip_terminator(body: &str) -> String {
    let body = body.trim();
    body.strip_suffix(';').unwrap_or(body).trim_end().to_string()
}

pub(super) fn parse_create_trigger(
    ctx: &Context,
    cur: &mut Cursor<'_, '_>,
) -> ConvertResult<Option<SchemaObject>> {
    cur.expect_keyword("CREATE")?;
    skip_create_modifiers(cur);
    cur.expect_keyword("TRIGGER")?;
    cur.eat_if_exists();
    let name = ctx.object_name(cur)?;

    let mut trigger = if ctx.dialect == Dialect::SqlServer {
        sqlserver_trigger_header(ctx, cur)?
    } else {
        trigger_header(ctx, cur)?
    };
    trigger.name = name.name;
    trigger.namespace = name.namespace;
    trigger.body = strip_terminator(cur.raw_rest());
    if trigger.body.is_empty() {
        return Err(cur.error("expected trigger body"));
    }
    Ok(Some(SchemaObject::Trigger(trigger)))
}

fn empty_trigger(ctx: &Context, table: ObjectName) -> Trigger {
    Trigger {
        name: String::new(),
        namespace: String::new(),
        table,
        timing: TriggerTiming::Before,
        events: Vec::new(),
        condition: None,
        body: String::new(),
        for_each_row: matches!(ctx.dialect, Dialect::Sqlite | Dialect::MySql),
    }
}

fn trigger_event(cur: &mut Cursor<'_, '_>) -> Option<TriggerEvent> {
    match cur.eat_any_keyword(&["INSERT", "UPDATE", "DELETE"])?.as_str() {
        "INSERT" => Some(TriggerEvent::Insert),
        "UPDATE" => Some(TriggerEvent::Update),
        _ => Some(TriggerEvent::Delete),
    }
}

/// `ON table FOR|AFTER|INSTEAD OF events AS`
fn sqlserver_trigger_header(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Trigger> {
    cur.expect_keyword("ON")?;
    let table = ctx.object_name(cur)?;
    let mut trigger = empty_trigger(ctx, table);
    cur.take_until_keyword(&["FOR", "AFTER", "INSTEAD"]);
    trigger.timing = if cur.eat_keywords(&["INSTEAD", "OF"]) {
        TriggerTiming::InsteadOf
    } else if cur.eat_any_keyword(&["FOR", "AFTER"]).is_some() {
        TriggerTiming::After
    } else {
        return Err(cur.error("expected FOR, AFTER or INSTEAD OF"));
    };
    while let Some(event) = trigger_event(cur) {
        trigger.events.push(event);
        cur.eat_punct(",");
    }
    cur.eat_keywords(&["NOT", "FOR", "REPLICATION"]);
    cur.expect_keyword("AS")?;
    Ok(trigger)
}

/// `timing events ON table [REFERENCING ...] [FOR EACH ROW] [WHEN (...)]`
fn trigger_header(ctx: &Context, cur: &mut Cursor<'_, '_>) -> ConvertResult<Trigger> {
    let timing = if cur.eat_keyword("BEFORE") {
        TriggerTiming::Before
    } else if cur.eat_keyword("AFTER") {
        TriggerTiming::After
    } else if cur.eat_keywords(&["INSTEAD", "OF"]) {
        TriggerTiming::InsteadOf
    } else {
        TriggerTiming::Before
    };

    let mut events = Vec::new();
    loop {
        if let Some(event) = trigger_event(cur) {
            events.push(event);
            if event == TriggerEvent::Update && cur.eat_keyword("OF") {
                cur.take_until_keyword(&["ON", "OR"]);
            }
        } else if !cur.eat_keyword("TRUNCATE") {
            break;
        }
        if !cur.eat_keyword("OR") && !cur.eat_punct(",") {
            break;
        }
    }
    if events.is_empty() {
        return Err(cur.error("expected trigger event"));
    }

    cur.expect_keyword("ON")?;
    let table = ctx.object_name(cur)?;
    let mut trigger = empty_trigger(ctx, table);
    trigger.timing = timing;
    trigger.events = events;

    loop {
        if cur.eat_keyword("REFERENCING") {
            cur.take_until_keyword(&["FOR", "WHEN", "BEGIN", "EXECUTE", "DECLARE"]);
        } else if cur.eat_keywords(&["FOR", "EACH", "ROW"]) {
            trigger.for_each_row = true;
        } else if cur.eat_keywords(&["FOR", "EACH", "STATEMENT"]) {
            trigger.for_each_row = false;
        } else if cur.eat_any_keyword(&["FOLLOWS", "PRECEDES", "INITIALLY", "FROM"]).is_some() {
            cur.object_name()?;
        } else if cur.eat_keywords(&["NOT", "DEFERRABLE"])
            || cur.eat_any_keyword(&["DEFERRABLE", "ENABLE", "DISABLE"]).is_some()
        {
        } else if cur.eat_keyword("WHEN") {
            trigger.condition = Some(if cur.peek_punct("(") {
                expression_text(cur.group()?)
            } else {
                join(cur.take_until_keyword(&["BEGIN"]))
            });
        } else {
            return Ok(trigger);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_statement, UnrecognizedPolicy};
    use pretty_assertions::assert_eq;

    fn function(dialect: Dialect, sql: &str) -> Function {
        match parse_statement(dialect, sql, UnrecognizedPolicy::Error).unwrap() {
            Some(SchemaObject::Function(f)) => f,
            other => panic!("expected function, got {:?}", other),
        }
    }

    fn trigger(dialect: Dialect, sql: &str) -> Trigger {
        match parse_statement(dialect, sql, UnrecognizedPolicy::Error).unwrap() {
            Some(SchemaObject::Trigger(t)) => t,
            other => panic!("expected trigger, got {:?}", other),
        }
    }

    #[test]
    fn test_postgres_function() {
        let f = function(
            Dialect::Postgres,
            "CREATE OR REPLACE FUNCTION public.add(a integer, b integer DEFAULT 1) RETURNS integer \
             LANGUAGE sql IMMUTABLE AS $$ SELECT a + b; $$",
        );
        assert_eq!(f.name, "add");
        assert_eq!(f.namespace, "");
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.parameters[1].name, "b");
        assert_eq!(f.parameters[1].data_type, DataType::new("INT"));
        assert_eq!(f.return_type, Some(DataType::new("INT")));
        assert_eq!(f.body, "SELECT a + b");
        assert_eq!(f.language, "sql");
        assert!(!f.is_procedure);
    }

    #[test]
    fn test_postgres_setof_and_unnamed_params() {
        let f = function(
            Dialect::Postgres,
            "CREATE FUNCTION f(integer, OUT total numeric) RETURNS SETOF record AS 'select 1' LANGUAGE sql",
        );
        assert_eq!(f.parameters[0].name, "");
        assert_eq!(f.parameters[1].direction, ParamDirection::Out);
        assert_eq!(f.return_type, Some(DataType::new("SETOF record")));
        assert_eq!(f.body, "select 1");
    }

    #[test]
    fn test_mysql_procedure() {
        let f = function(
            Dialect::MySql,
            "CREATE DEFINER=`root`@`localhost` PROCEDURE `bump`(IN p_id INT, OUT p_total DECIMAL(10,2))\n\
             MODIFIES SQL DATA\nBEGIN\n  UPDATE t SET n = n + 1 WHERE id = p_id;\nEND",
        );
        assert!(f.is_procedure);
        assert_eq!(f.parameters[1].direction, ParamDirection::Out);
        assert_eq!(f.parameters[1].data_type.to_string(), "DECIMAL(10,2)");
        assert!(f.body.starts_with("BEGIN"));
        assert!(f.body.ends_with("END"));
    }

    #[test]
    fn test_sqlserver_procedure_without_parens() {
        let f = function(
            Dialect::SqlServer,
            "CREATE PROCEDURE [dbo].[GetUser] @Id INT, @Name NVARCHAR(50) OUTPUT AS BEGIN SELECT 1 END",
        );
        assert_eq!(f.parameters[0].name, "Id");
        assert_eq!(f.parameters[1].direction, ParamDirection::Out);
        assert_eq!(f.body, "BEGIN SELECT 1 END");
        assert_eq!(f.language, "TSQL");
    }

    #[test]
    fn test_oracle_function() {
        let f = function(
            Dialect::Oracle,
            "CREATE OR REPLACE FUNCTION get_bonus (p_sal IN NUMBER) RETURN NUMBER IS BEGIN RETURN p_sal * 0.1; END;",
        );
        assert_eq!(f.parameters[0].name, "p_sal");
        assert_eq!(f.parameters[0].direction, ParamDirection::In);
        assert_eq!(f.return_type, Some(DataType::new("DECIMAL")));
        assert_eq!(f.body, "BEGIN RETURN p_sal * 0.1; END");
    }

    #[test]
    fn test_sqlite_function_is_unsupported() {
        let parsed = parse_statement(
            Dialect::Sqlite,
            "CREATE FUNCTION f() RETURNS INT AS 1",
            UnrecognizedPolicy::Skip,
        );
        assert_eq!(parsed.unwrap(), None);
    }

    #[test]
    fn test_postgres_trigger() {
        let t = trigger(
            Dialect::Postgres,
            "CREATE TRIGGER audit AFTER INSERT OR UPDATE OF name ON public.users \
             FOR EACH ROW WHEN (NEW.name IS NOT NULL) EXECUTE FUNCTION log_change()",
        );
        assert_eq!(t.table, ObjectName::unqualified("users"));
        assert_eq!(t.timing, TriggerTiming::After);
        assert_eq!(t.events, vec![TriggerEvent::Insert, TriggerEvent::Update]);
        assert!(t.for_each_row);
        assert_eq!(t.condition.as_deref(), Some("NEW.name IS NOT NULL"));
        assert_eq!(t.body, "EXECUTE FUNCTION log_change()");
    }

    #[test]
    fn test_sqlserver_trigger() {
        let t = trigger(
            Dialect::SqlServer,
            "CREATE TRIGGER [dbo].[trg] ON [dbo].[Orders] FOR INSERT, DELETE AS BEGIN SET NOCOUNT ON; END",
        );
        assert_eq!(t.timing, TriggerTiming::After);
        assert_eq!(t.events, vec![TriggerEvent::Insert, TriggerEvent::Delete]);
        assert_eq!(t.body, "BEGIN SET NOCOUNT ON; END");
    }

    #[test]
    fn test_sqlite_trigger_when_without_parens() {
        let t = trigger(
            Dialect::Sqlite,
            "CREATE TRIGGER IF NOT EXISTS t_upd AFTER UPDATE ON items WHEN new.qty < 0 BEGIN SELECT RAISE(ABORT, 'neg'); END",
        );
        assert_eq!(t.condition.as_deref(), Some("new.qty < 0"));
        assert!(t.for_each_row);
        assert_eq!(t.body, "BEGIN SELECT RAISE(ABORT, 'neg'); END");
    }
}
