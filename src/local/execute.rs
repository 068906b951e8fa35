//! Statement execution and D1-shaped result synthesis.

use super::classify::{StatementKind, classify};
use crate::types::{QueryMeta, QueryResult, Row, Timings, Value};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::{Batch, Connection, params_from_iter};
use std::time::Duration;

/// Region reported in emulated metadata.
pub const LOCAL_REGION: &str = "local";

/// What one statement did, before metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Read { rows: Vec<Row> },
    Write { changes: u64, last_row_id: i64 },
}

/// Runs `sql` on the path chosen by [`classify`].
///
/// # Errors
///
/// Returns the engine error for anything that goes wrong while preparing,
/// binding, stepping or reading the statement.
pub fn execute(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Execution> {
    match classify(sql) {
        StatementKind::Read => read(conn, sql, params),
        StatementKind::Write => write(conn, sql, params),
    }
}

fn bind(params: &[Value]) -> impl Iterator<Item = rusqlite::types::Value> + '_ {
    params.iter().map(Value::to_rusqlite)
}

fn read(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Execution> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut cursor = stmt.query(params_from_iter(bind(params)))?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = Value::from(row.get_ref(idx)?);
            record.insert(column.clone(), value.into_json());
        }
        rows.push(record);
    }

    Ok(Execution::Read { rows })
}

/// Runs every statement in `sql` in order, discarding any rows they return.
///
/// Parameters are consumed left to right, each statement taking as many as
/// it declares; surplus parameters are reported only after the statements
/// have run. The change count is the `total_changes` delta, so DDL reports
/// zero instead of the previous statement's count.
fn write(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Execution> {
    let before = conn.total_changes();
    let mut remaining = params;
    let mut batch = Batch::new(conn, sql);

    while let Some(mut stmt) = batch.next()? {
        let wanted = stmt.parameter_count();
        if wanted > remaining.len() {
            let bound = params.len() - remaining.len();
            return Err(rusqlite::Error::InvalidParameterCount(
                params.len(),
                bound + wanted,
            ));
        }
        let (own, rest) = remaining.split_at(wanted);
        for (idx, value) in own.iter().enumerate() {
            stmt.raw_bind_parameter(idx + 1, value.to_rusqlite())?;
        }
        remaining = rest;

        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
    }

    if !remaining.is_empty() {
        return Err(rusqlite::Error::InvalidParameterCount(
            params.len(),
            params.len() - remaining.len(),
        ));
    }

    Ok(Execution::Write {
        changes: conn.total_changes().saturating_sub(before),
        last_row_id: conn.last_insert_rowid(),
    })
}

impl Execution {
    /// Wraps the outcome as a successful [`QueryResult`].
    ///
    /// Reads report `rows_read` as the number of rows returned; writes report
    /// the affected count as both `rows_read` and `rows_written`. `results`
    /// is always an array, empty for writes.
    pub fn into_query_result(self, elapsed: Duration, size_after: i64) -> QueryResult {
        let millis = elapsed.as_secs_f64() * 1000.0;
        let mut meta = QueryMeta {
            duration: millis,
            served_by_primary: true,
            served_by_region: LOCAL_REGION.to_string(),
            size_after,
            timings: Some(Timings {
                sql_duration_ms: millis,
            }),
            ..QueryMeta::default()
        };

        let results = match self {
            Self::Read { rows } => {
                meta.rows_read = rows.len() as u64;
                serde_json::Value::Array(rows.into_iter().map(serde_json::Value::Object).collect())
            }
            Self::Write {
                changes,
                last_row_id,
            } => {
                meta.changes = changes;
                meta.changed_db = changes > 0;
                meta.rows_read = changes;
                meta.rows_written = changes;
                meta.last_row_id = last_row_id;
                serde_json::Value::Array(Vec::new())
            }
        };

        QueryResult {
            meta,
            results,
            success: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, avatar BLOB)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_write_reports_changes_and_rowid() {
        let conn = memory();
        let outcome = execute(
            &conn,
            "INSERT INTO users (name) VALUES (?), (?)",
            &[Value::from("alice"), Value::from("bob")],
        )
        .unwrap();
        assert_eq!(
            outcome,
            Execution::Write {
                changes: 2,
                last_row_id: 2
            }
        );
    }

    #[test]
    fn test_read_preserves_column_order_and_types() {
        let conn = memory();
        execute(
            &conn,
            "INSERT INTO users (name, score, avatar) VALUES (?, ?, ?)",
            &[
                Value::from("alice"),
                Value::from(9.5),
                Value::from(b"png".to_vec()),
            ],
        )
        .unwrap();

        let Execution::Read { rows } = execute(&conn, "SELECT * FROM users", &[]).unwrap() else {
            panic!("expected read");
        };
        assert_eq!(rows.len(), 1);
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(columns, ["id", "name", "score", "avatar"]);
        assert_eq!(
            serde_json::Value::Object(rows[0].clone()),
            json!({"id": 1, "name": "alice", "score": 9.5, "avatar": "png"})
        );
    }

    #[test]
    fn test_read_binds_params() {
        let conn = memory();
        execute(&conn, "INSERT INTO users (name) VALUES ('a'), ('b'), ('c')", &[]).unwrap();
        let Execution::Read { rows } =
            execute(&conn, "SELECT name FROM users WHERE id > ?", &[Value::from(1)]).unwrap()
        else {
            panic!("expected read");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("b"));
    }

    #[test]
    fn test_ddl_does_not_inherit_previous_changes() {
        let conn = memory();
        execute(&conn, "INSERT INTO users (name) VALUES ('a'), ('b')", &[]).unwrap();

        let created = execute(&conn, "CREATE TABLE tags (x INTEGER)", &[]).unwrap();
        assert_eq!(
            created,
            Execution::Write {
                changes: 0,
                last_row_id: 2
            }
        );
        let meta = created.into_query_result(Duration::ZERO, 0).meta;
        assert_eq!(meta.changes, 0);
        assert_eq!(meta.rows_written, 0);
        assert!(!meta.changed_db);

        let dropped = execute(&conn, "DROP TABLE tags", &[]).unwrap();
        assert!(matches!(dropped, Execution::Write { changes: 0, .. }));
    }

    #[test]
    fn test_row_returning_writes_execute() {
        let conn = memory();
        let returning = execute(
            &conn,
            "INSERT INTO users (name) VALUES (?) RETURNING id",
            &[Value::from("carol")],
        )
        .unwrap();
        assert_eq!(
            returning,
            Execution::Write {
                changes: 1,
                last_row_id: 1
            }
        );

        let pragma = execute(&conn, "PRAGMA journal_mode = WAL", &[]).unwrap();
        assert!(matches!(pragma, Execution::Write { changes: 0, .. }));
    }

    #[test]
    fn test_multi_statement_write_runs_in_order() {
        let conn = memory();
        let outcome = execute(
            &conn,
            "CREATE TABLE v (x INTEGER); INSERT INTO v VALUES (?); INSERT INTO v VALUES (?), (?);",
            &[Value::from(1), Value::from(2), Value::from(3)],
        )
        .unwrap();
        assert!(matches!(outcome, Execution::Write { changes: 3, .. }));

        let Execution::Read { rows } =
            execute(&conn, "SELECT sum(x) AS total FROM v", &[]).unwrap()
        else {
            panic!("expected read");
        };
        assert_eq!(rows[0]["total"], json!(6));
    }

    #[test]
    fn test_write_param_count_mismatch() {
        let conn = memory();
        let too_few = execute(&conn, "INSERT INTO users (name, score) VALUES (?, ?)", &[
            Value::from("a"),
        ]);
        assert!(matches!(
            too_few,
            Err(rusqlite::Error::InvalidParameterCount(1, 2))
        ));

        let too_many = execute(&conn, "INSERT INTO users (name) VALUES (?)", &[
            Value::from("a"),
            Value::from("b"),
        ]);
        assert!(matches!(
            too_many,
            Err(rusqlite::Error::InvalidParameterCount(2, 1))
        ));
    }

    #[test]
    fn test_engine_errors_surface() {
        let conn = memory();
        assert!(execute(&conn, "INSERT INTO users (missing) VALUES (1)", &[]).is_err());
        assert!(execute(&conn, "SELECT missing FROM users", &[]).is_err());
    }

    #[test]
    fn test_query_result_metadata() {
        let read = Execution::Read { rows: Vec::new() }
            .into_query_result(Duration::from_micros(1500), 8192);
        assert!(read.success);
        assert_eq!(read.results, json!([]));
        assert_eq!(read.meta.rows_read, 0);
        assert!(!read.meta.changed_db);
        assert!(read.meta.served_by_primary);
        assert_eq!(read.meta.served_by_region, LOCAL_REGION);
        assert_eq!(read.meta.size_after, 8192);
        assert!((read.meta.duration - 1.5).abs() < 1e-9);

        let write = Execution::Write {
            changes: 3,
            last_row_id: 7,
        }
        .into_query_result(Duration::ZERO, 0);
        assert_eq!(write.results, json!([]));
        assert_eq!(write.meta.rows_read, 3);
        assert_eq!(write.meta.rows_written, 3);
        assert_eq!(write.meta.changes, 3);
        assert_eq!(write.meta.last_row_id, 7);
        assert!(write.meta.changed_db);
    }
}
