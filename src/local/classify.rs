//! Read/write routing for SQL text.
//!
//! SQLite exposes separate APIs for statements that return rows and statements
//! that only change data. Without a SQL parser the choice is a textual
//! heuristic: any occurrence of `select` (case-insensitive) means read.
//!
//! Known misroutes:
//! - `INSERT INTO t SELECT ...` and other writes with sub-selects run as reads,
//!   so `last_row_id` and the write counters stay at zero.
//! - A write whose comment or string literal mentions "select" runs as a read.
//! - Identifiers containing the substring (`selection`, `preselected`) count.
//! - Row-returning statements without the word (`PRAGMA table_info(t)`,
//!   `INSERT ... RETURNING`) run as writes: they execute, but their rows are
//!   dropped and only the change counters are reported.
//!
//! Text holding several statements runs statement by statement on the write
//! path. On the read path only a single statement is accepted.

/// Execution path for one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows; executed with a cursor.
    Read,
    /// Mutates data or schema; executed for its change count.
    Write,
}

const READ_MARKER: &[u8] = b"select";

/// Classifies `sql` by searching for the `select` marker.
pub fn classify(sql: &str) -> StatementKind {
    let found = sql
        .as_bytes()
        .windows(READ_MARKER.len())
        .any(|window| window.eq_ignore_ascii_case(READ_MARKER));
    if found {
        StatementKind::Read
    } else {
        StatementKind::Write
    }
}
