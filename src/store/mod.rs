//! Record store abstraction over a ServiceNow-style Table API.
//!
//! The tool layer only talks to [`RecordStore`]; [`RestStore`] is the HTTP
//! implementation used by the server binary and [`memory::MemoryStore`] backs
//! the tests.

pub mod memory;
mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::filter::FilterExpression;

pub use rest::{Auth, RestStore};

/// A table row as returned by the API.
pub type Record = Map<String, JsonValue>;

/// `sysparm_display_value` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayValue {
    /// Raw stored values.
    False,
    /// Display values only.
    True,
    /// Both, as `{ "value", "display_value" }` objects.
    All,
}

impl DisplayValue {
    /// Value of the `sysparm_display_value` parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::True => "true",
            Self::All => "all",
        }
    }
}

/// Optional parameters of a table query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// `sysparm_limit`.
    pub limit: Option<u32>,
    /// `sysparm_offset`.
    pub offset: Option<u32>,
    /// `sysparm_fields`.
    pub fields: Option<Vec<String>>,
    /// `sysparm_display_value`.
    pub display_value: Option<DisplayValue>,
    /// `sysparm_exclude_reference_link`.
    pub exclude_reference_link: Option<bool>,
}

/// Failure talking to the record store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials rejected or insufficient rights.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth {
        /// HTTP status, 401 or 403.
        status: u16,
        /// Reason reported by the instance.
        message: String,
    },

    /// The addressed record does not exist.
    #[error("record not found: {table}/{sys_id}")]
    NotFound {
        /// Addressed table.
        table: String,
        /// Requested native key.
        sys_id: String,
    },

    /// Structured error payload from the remote side.
    #[error("{}", remote_message(.status, .message, .detail))]
    Remote {
        /// HTTP status.
        status: u16,
        /// `error.message` of the response body.
        message: String,
        /// `error.detail`, when present.
        detail: Option<String>,
    },

    /// The response body was not the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

fn remote_message(status: &u16, message: &str, detail: &Option<String>) -> String {
    match detail.as_deref() {
        Some(detail) if !detail.is_empty() => {
            format!("remote error (HTTP {}): {} ({})", status, message, detail)
        }
        _ => format!("remote error (HTTP {}): {}", status, message),
    }
}

/// Table API operations consumed by the incident tools.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows matching `filter` (all rows when `None`).
    async fn query(
        &self,
        table: &str,
        filter: Option<&FilterExpression>,
        options: &QueryOptions,
    ) -> Result<Vec<Record>, StoreError>;

    /// Single row by native key.
    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: Option<&[String]>,
    ) -> Result<Record, StoreError>;

    /// Insert a row and return it as stored.
    async fn create(&self, table: &str, data: &Record) -> Result<Record, StoreError>;

    /// Patch the given fields of a row and return the result.
    async fn update(&self, table: &str, sys_id: &str, data: &Record) -> Result<Record, StoreError>;

    /// Remove a row.
    async fn delete(&self, table: &str, sys_id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_include_detail_when_present() {
        let err = StoreError::Remote {
            status: 400,
            message: "Invalid query".to_string(),
            detail: Some("field 'foo' does not exist".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "remote error (HTTP 400): Invalid query (field 'foo' does not exist)"
        );

        let err = StoreError::Remote {
            status: 500,
            message: "boom".to_string(),
            detail: None,
        };
        assert_eq!(err.to_string(), "remote error (HTTP 500): boom");
    }
}
