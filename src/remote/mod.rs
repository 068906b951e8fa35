//! Client for the Cloudflare D1 REST API.
//!
//! Every operation maps to exactly one HTTP request. The service already
//! answers with the canonical [`Envelope`](crate::Envelope), so responses are
//! decoded and returned without reshaping.
//!
//! # Example
//!
//! ```ignore
//! use d1kit::{D1Session, RemoteSession};
//!
//! let session = RemoteSession::new("account-id", "api-token")?;
//! let created = session.create_database("t1")?;
//! let id = session.resolve("t1")?;
//! ```

mod session;
mod transport;

pub use session::RemoteSession;
