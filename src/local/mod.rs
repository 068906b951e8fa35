//! Local D1 emulation on SQLite.
//!
//! Makes an embedded SQLite engine answer like the D1 service: same envelope,
//! same record and metadata shapes, same split between contract errors and
//! `success: false` statement failures.
//!
//! - [`classify`] picks the read or write path for each statement
//! - `execute` runs it and synthesizes D1 metadata
//! - [`LocalSession`] owns the files, connections and name registry
//!
//! # Example
//!
//! ```ignore
//! use d1kit::{D1Session, LocalSession};
//!
//! let session = LocalSession::open("./.d1")?;
//! let id = session.create_database("t1")?.result.uuid;
//! let out = session.execute_query(id, "SELECT 1 AS one", &[])?;
//! assert_eq!(out.result[0].meta.rows_read, 1);
//! ```

mod classify;
mod execute;
mod session;

pub use classify::{StatementKind, classify};
pub use execute::LOCAL_REGION;
pub use session::{DATABASE_EXTENSION, LOCAL_ERROR_CODE, LOCAL_VERSION, LocalSession};
