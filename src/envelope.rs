//! The response envelope shared by every session operation.
//!
//! Wire shape:
//!
//! ```json
//! { "result": ..., "success": true, "messages": [], "errors": [] }
//! ```
//!
//! Use [`Envelope::success`] and [`Envelope::failure`] to build one so that
//! `success` always agrees with `errors`.

use serde::{Deserialize, Deserializer, Serialize};

/// A structured error reported inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

/// Canonical result wrapper returned by both backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    /// Operation payload. Defaults when the service sends `null`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: T,
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiError>,
}

impl<T> Envelope<T> {
    /// Wraps a successful payload.
    pub fn success(result: T) -> Self {
        Self {
            result,
            success: true,
            messages: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Returns the payload, or the reported errors for a failed envelope.
    pub fn into_result(self) -> Result<T, Vec<ApiError>> {
        if self.success {
            Ok(self.result)
        } else {
            Err(self.errors)
        }
    }

    /// First reported error, if any.
    pub fn first_error(&self) -> Option<&ApiError> {
        self.errors.first()
    }
}

impl<T: Default> Envelope<T> {
    /// Builds an application failure carrying a single error and a default
    /// payload.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: T::default(),
            success: false,
            messages: Vec::new(),
            errors: vec![ApiError {
                code,
                message: message.into(),
            }],
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
