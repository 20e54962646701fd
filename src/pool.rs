//! Parallel statement parsing.
//!
//! A producer on the blocking thread pool tokenizes the input into a bounded
//! work queue. A fixed set of worker tasks parse statements and push tagged
//! results to a second queue, which the caller's task drains to invoke the
//! callback.
//!
//! Objects arrive in completion order, not source order. Consumers that
//! care (an index arriving before its table) should link by name, as
//! [`SchemaAssembler`] does.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{ConvertError, ConvertResult};
use crate::parser::{self, UnrecognizedPolicy};
use crate::schema::{Schema, SchemaAssembler, SchemaObject};
use crate::tokenizer::{Statement, StatementTokenizer};

pub use crate::stream::StreamStats as PoolStats;

/// Default bound of the work and result queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One queued statement and its 1-based position in the input.
struct Job {
    seq: usize,
    statement: Statement,
}

type Outcome = ConvertResult<Option<SchemaObject>>;

/// Fixed-size pool of parser tasks for one dialect.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    dialect: Dialect,
    workers: usize,
    queue_capacity: usize,
    policy: UnrecognizedPolicy,
}

impl WorkerPool {
    pub fn new(dialect: Dialect, workers: usize) -> Self {
        Self {
            dialect,
            workers: workers.max(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            policy: UnrecognizedPolicy::default(),
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_policy(mut self, policy: UnrecognizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parse `reader` and call `callback` once per schema object.
    ///
    /// The first error from the tokenizer, a worker, or the callback aborts
    /// the pool: no further callbacks run, and statements still queued are
    /// drained without being parsed. Errors from pool tasks are wrapped in
    /// [`ConvertError::Worker`] with the statement's position.
    ///
    /// `callback` runs on the task awaiting `run` and blocks it while it
    /// executes. Results queue up behind a slow callback (backpressure
    /// reaches the producer); a callback doing heavy or blocking work should
    /// hand it to its own channel or `spawn_blocking` task and return.
    pub async fn run<R, F>(&self, reader: R, mut callback: F) -> ConvertResult<PoolStats>
    where
        R: Read + Send + 'static,
        F: FnMut(SchemaObject) -> ConvertResult<()>,
    {
        let abort = Arc::new(AtomicBool::new(false));
        let (work_tx, work_rx) = mpsc::channel::<Job>(self.queue_capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<Outcome>(self.queue_capacity);

        debug!("Starting {} pool: {} workers", self.dialect, self.workers);

        let producer = {
            let abort = Arc::clone(&abort);
            let result_tx = result_tx.clone();
            let opts = self.dialect.tokenizer_options();
            tokio::task::spawn_blocking(move || {
                let mut queued = 0usize;
                for (i, statement) in StatementTokenizer::new(reader, opts).enumerate() {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let seq = i + 1;
                    let statement = match statement {
                        Ok(statement) => statement,
                        Err(e) => {
                            let _ = result_tx.blocking_send(Err(ConvertError::worker(seq, e)));
                            break;
                        }
                    };
                    if work_tx.blocking_send(Job { seq, statement }).is_err() {
                        break;
                    }
                    queued += 1;
                }
                queued
            })
        };

        let work_rx = Arc::new(Mutex::new(work_rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let abort = Arc::clone(&abort);
            let dialect = self.dialect;
            let policy = self.policy;

            workers.spawn(async move {
                loop {
                    let job = work_rx.lock().await.recv().await;
                    let Some(Job { seq, statement }) = job else {
                        break;
                    };
                    if abort.load(Ordering::Relaxed) {
                        continue;
                    }
                    let outcome = parser::parse_statement(dialect, &statement.text, policy)
                        .map_err(|e| ConvertError::worker(seq, e.at_offset(statement.offset)));
                    if result_tx.send(outcome).await.is_err() {
                        // The reducer is gone; keep draining so the producer never blocks.
                        abort.store(true, Ordering::Relaxed);
                    }
                }
                debug!("Worker {} done", worker_id);
            });
        }
        // Workers own the receiver now: once they all exit the work queue
        // closes and a blocked producer wakes up.
        drop(work_rx);
        drop(result_tx);

        let mut stats = PoolStats::default();
        let mut failure = None;
        while let Some(outcome) = result_rx.recv().await {
            let delivered = match outcome {
                Ok(Some(object)) => callback(object).map(|_| true),
                Ok(None) => Ok(false),
                Err(e) => Err(e),
            };
            match delivered {
                Ok(true) => stats.delivered += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    abort.store(true, Ordering::Relaxed);
                    failure = Some(e);
                    break;
                }
            }
        }
        // Workers still sending see a closed channel and stop.
        drop(result_rx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                failure.get_or_insert(ConvertError::Pool(e.to_string()));
            }
        }
        stats.statements = producer
            .await
            .map_err(|e| ConvertError::Pool(e.to_string()))?;

        if let Some(e) = failure {
            debug!("Pool aborted after {} objects", stats.delivered);
            return Err(e);
        }
        if stats.statements == 0 {
            return Err(ConvertError::EmptyInput);
        }
        debug!(
            "Pool finished: {} statements, {} objects, {} skipped",
            stats.statements, stats.delivered, stats.skipped
        );
        Ok(stats)
    }

    /// Parse a whole stream in parallel and assemble the schema.
    pub async fn parse_schema<R>(&self, reader: R) -> ConvertResult<Schema>
    where
        R: Read + Send + 'static,
    {
        let mut assembler = SchemaAssembler::new();
        self.run(reader, |object| {
            assembler.push(object);
            Ok(())
        })
        .await?;
        Ok(assembler.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tables(n: usize) -> String {
        (0..n)
            .map(|i| format!("CREATE TABLE t{} (id INT PRIMARY KEY, v TEXT);\n", i))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_statement_is_delivered() {
        let pool = WorkerPool::new(Dialect::Postgres, 4).with_queue_capacity(8);
        let mut seen = Vec::new();
        let stats = pool
            .run(Cursor::new(tables(50)), |obj| {
                seen.push(obj.label());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(stats.statements, 50);
        assert_eq!(stats.delivered, 50);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 50);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_callback_error_stops_delivery() {
        let pool = WorkerPool::new(Dialect::MySql, 2);
        let mut calls = 0;
        let err = pool
            .run(Cursor::new(tables(20)), |_| {
                calls += 1;
                Err(ConvertError::Callback("enough".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, ConvertError::Callback(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parse_schema_links_out_of_order_fragments() {
        let sql = "CREATE INDEX idx_a ON a (id);\nCREATE TABLE a (id INT);\n";
        let schema = WorkerPool::new(Dialect::Sqlite, 3)
            .parse_schema(Cursor::new(sql.to_string()))
            .await
            .unwrap();
        assert_eq!(schema.tables[0].indexes.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_input_through_pool() {
        let err = WorkerPool::new(Dialect::Oracle, 2)
            .run(Cursor::new(String::from("\n\n")), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput));
    }
}
