//! Cloudflare D1 client with a drop-in local SQLite emulator.
//!
//! - [`RemoteSession`] talks to the D1 REST API
//! - [`LocalSession`] emulates it with one SQLite file per database
//!
//! Both implement [`D1Session`] and return the same [`Envelope`] shapes, so
//! tests and offline development can swap one for the other.

pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod local;
pub mod paths;
pub mod remote;
pub mod session;
pub mod types;

pub use config::{Config, LocalConfig, RemoteConfig};
pub use envelope::{ApiError, Envelope};
pub use error::{Error, Result};
pub use identity::IdentityRegistry;
pub use local::LocalSession;
pub use remote::RemoteSession;
pub use session::{Backend, D1Session, connect, find_database};
pub use types::{
    DatabaseRecord, DatabaseSettings, DeleteResult, QueryMeta, QueryResult, ReadReplication,
    ReplicationMode, Row, Timings, Value,
};
