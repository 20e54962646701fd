//! Sequential streaming parse.
//!
//! Statements are read, parsed and delivered one at a time in source order.
//! Objects already handed to the callback stay delivered when a later
//! statement fails; the failure is returned once and nothing follows it.

use serde::Serialize;
use std::io::Read;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::parser::{self, UnrecognizedPolicy};
use crate::schema::{Schema, SchemaAssembler, SchemaObject};
use crate::tokenizer::StatementTokenizer;

/// Counters reported by the streaming entry points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Statements read from the input.
    pub statements: usize,
    /// Objects handed to the callback.
    pub delivered: usize,
    /// Statements that produced no object.
    pub skipped: usize,
}

/// Parse `reader` statement by statement, calling `callback` for every
/// schema object in source order.
///
/// The first parse, I/O or callback error stops the stream.
pub fn parse_stream<R, F>(
    reader: R,
    dialect: Dialect,
    policy: UnrecognizedPolicy,
    mut callback: F,
) -> ConvertResult<StreamStats>
where
    R: Read,
    F: FnMut(SchemaObject) -> ConvertResult<()>,
{
    let mut stats = StreamStats::default();

    for statement in StatementTokenizer::new(reader, dialect.tokenizer_options()) {
        let statement = statement?;
        stats.statements += 1;
        match parser::parse_statement(dialect, &statement.text, policy)
            .map_err(|e| e.at_offset(statement.offset))?
        {
            Some(object) => {
                callback(object)?;
                stats.delivered += 1;
            }
            None => stats.skipped += 1,
        }
    }

    if stats.statements == 0 {
        return Err(ConvertError::EmptyInput);
    }
    debug!(
        "Stream finished: {} statements, {} objects",
        stats.statements, stats.delivered
    );
    Ok(stats)
}

/// Parse a stream into a whole schema.
pub fn parse_reader<R: Read>(
    reader: R,
    dialect: Dialect,
    policy: UnrecognizedPolicy,
) -> ConvertResult<Schema> {
    let mut assembler = SchemaAssembler::new();
    parse_stream(reader, dialect, policy, |object| {
        assembler.push(object);
        Ok(())
    })?;
    Ok(assembler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DUMP: &str = "\
CREATE TABLE a (id INT PRIMARY KEY);
INSERT INTO a VALUES (1);
CREATE TABLE b (id INT, a_id INT REFERENCES a (id));
CREATE INDEX idx_b_a ON b (a_id);
";

    #[test]
    fn test_stream_delivers_in_source_order() {
        let mut labels = Vec::new();
        let stats = parse_stream(DUMP.as_bytes(), Dialect::Postgres, UnrecognizedPolicy::Skip, |obj| {
            labels.push(format!("{} {}", obj.kind(), obj.label()));
            Ok(())
        })
        .unwrap();
        assert_eq!(labels, vec!["table a", "table b", "index idx_b_a"]);
        assert_eq!(
            stats,
            StreamStats {
                statements: 4,
                delivered: 3,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_stream_stops_at_first_error() {
        let sql = "CREATE TABLE a (id INT);\nCREATE TABLE b id INT;\nCREATE TABLE c (id INT);";
        let mut seen = 0;
        let err = parse_stream(sql.as_bytes(), Dialect::MySql, UnrecognizedPolicy::Skip, |_| {
            seen += 1;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(seen, 1);
        match err {
            ConvertError::MalformedStatement { offset, .. } => assert!(offset >= 25),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_callback_error_aborts() {
        let mut seen = 0;
        let err = parse_stream(DUMP.as_bytes(), Dialect::Postgres, UnrecognizedPolicy::Skip, |_| {
            seen += 1;
            Err(ConvertError::Callback("stop".into()))
        })
        .unwrap_err();
        assert_eq!(seen, 1);
        assert!(matches!(err, ConvertError::Callback(_)));
    }

    #[test]
    fn test_empty_stream() {
        let err = parse_stream("  -- nothing\n".as_bytes(), Dialect::Sqlite, UnrecognizedPolicy::Skip, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput));
    }

    #[test]
    fn test_parse_reader_links_fragments() {
        let schema = parse_reader(DUMP.as_bytes(), Dialect::Postgres, UnrecognizedPolicy::Skip).unwrap();
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[1].indexes[0].name, "idx_b_a");
    }
}
