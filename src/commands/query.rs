//! Statement execution command.

use super::print_envelope;
use anyhow::{Context, Result};
use d1kit::{D1Session, Value, find_database};

pub fn execute(
    session: &dyn D1Session,
    db: &str,
    sql: &str,
    params: &[String],
    raw: bool,
) -> Result<()> {
    let id = find_database(session, db)?;
    let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();

    let envelope = if raw {
        session.execute_query_raw(id, sql, &params)
    } else {
        session.execute_query(id, sql, &params)
    }
    .with_context(|| format!("Failed to query database {id}"))?;

    print_envelope(&envelope)
}

/// Integer, then float, then `null`, else text.
fn parse_param(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>()
        && f.is_finite()
    {
        Value::Real(f)
    } else if raw == "null" {
        Value::Null
    } else {
        Value::Text(raw.to_string())
    }
}
