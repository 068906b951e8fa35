//! CLI command implementations for d1kit.
//!
//! - [`database`] - create/delete/get/list/update
//! - [`query`] - statement execution

pub mod database;
pub mod query;

use anyhow::{Context, Result};
use d1kit::Envelope;
use serde::Serialize;

/// Prints an envelope as pretty JSON on stdout.
///
/// A `success: false` envelope is still printed, then reported as an error so
/// the process exits non-zero.
pub fn print_envelope<T: Serialize>(envelope: &Envelope<T>) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(envelope).context("Failed to render response")?;
    println!("{rendered}");

    if envelope.success {
        return Ok(());
    }
    match envelope.first_error() {
        Some(error) => anyhow::bail!("Request failed ({}): {}", error.code, error.message),
        None => anyhow::bail!("Request failed"),
    }
}
