//! Worker pool behavior over whole dumps.

use std::io::Cursor;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sqlport::prelude::*;

fn statements(k: usize, malformed_at: Option<usize>) -> String {
    (0..k)
        .map(|i| {
            if Some(i) == malformed_at {
                format!("CREATE TABLE t{} id INT;\n", i)
            } else {
                format!("CREATE TABLE t{} (id INT NOT NULL, v VARCHAR(20));\n", i)
            }
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_k_statements_give_k_callbacks() {
    for workers in [1, 2, 4, 8] {
        let mut calls = 0;
        let stats = WorkerPool::new(Dialect::Postgres, workers)
            .with_queue_capacity(4)
            .run(Cursor::new(statements(40, None)), |_| {
                calls += 1;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(calls, 40, "{workers} workers");
        assert_eq!(stats.delivered, 40);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_malformed_statement_surfaces_once() {
    let mut calls = 0;
    let err = WorkerPool::new(Dialect::Postgres, 4)
        .run(Cursor::new(statements(40, Some(17))), |_| {
            calls += 1;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(calls < 40);
    match err {
        ConvertError::Worker { statement, source } => {
            assert_eq!(statement, 18);
            assert!(matches!(*source, ConvertError::MalformedStatement { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_and_sequential_build_the_same_schema() {
    let sql = "\
CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL);
CREATE INDEX idx_users_email ON users (email);
CREATE VIEW active AS SELECT id FROM users;
ALTER TABLE users ADD COLUMN name TEXT;
COMMENT ON TABLE users IS 'people';
";
    let sequential = sqlport::parse(Dialect::Postgres, sql).unwrap();
    let parallel = WorkerPool::new(Dialect::Postgres, 3)
        .parse_schema(Cursor::new(sql.to_string()))
        .await
        .unwrap();

    let users = &parallel.tables[0];
    assert_eq!(users.indexes.len(), sequential.tables[0].indexes.len());
    assert_eq!(users.comment.as_deref(), Some("people"));
    assert_eq!(parallel.views.len(), 1);
    let mut columns: Vec<_> = users.columns.iter().map(|c| c.name.clone()).collect();
    columns.sort();
    assert_eq!(columns, vec!["email", "id", "name"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_policy_delivers_unrecognized() {
    let sql = "CREATE TABLE a (id INT);\nCREATE ROLE reader;\n";
    let mut unrecognized = Vec::new();
    WorkerPool::new(Dialect::Postgres, 2)
        .with_policy(UnrecognizedPolicy::Report)
        .run(Cursor::new(sql.to_string()), |obj| {
            if let SchemaObject::Unrecognized { category, .. } = obj {
                unrecognized.push(category);
            }
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(unrecognized.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_slow_callback_does_not_hang_a_full_queue() {
    let mut calls = 0;
    let pool = WorkerPool::new(Dialect::Postgres, 1).with_queue_capacity(1);
    let run = pool
        .run(Cursor::new(statements(200, None)), |_| {
            calls += 1;
            std::thread::sleep(Duration::from_millis(200));
            Err(ConvertError::Callback("stop".into()))
        });
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("pool did not shut down after the callback failed")
        .unwrap_err();
    assert!(matches!(err, ConvertError::Callback(ref msg) if msg == "stop"));
    assert_eq!(calls, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_callback_error_with_many_workers() {
    let mut calls = 0;
    let pool = WorkerPool::new(Dialect::Postgres, 4).with_queue_capacity(1);
    let run = pool
        .run(Cursor::new(statements(200, None)), |_| {
            calls += 1;
            std::thread::sleep(Duration::from_millis(5));
            if calls == 10 {
                return Err(ConvertError::Callback("tenth".into()));
            }
            Ok(())
        });
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("pool did not shut down after the callback failed")
        .unwrap_err();
    assert!(matches!(err, ConvertError::Callback(_)));
    assert_eq!(calls, 10);
}
