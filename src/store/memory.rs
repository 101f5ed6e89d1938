//! In-memory [`RecordStore`].
//!
//! Evaluates encoded-query filters locally and logs every call, which makes it
//! the store of choice for exercising the tool layer without a live instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{QueryOptions, Record, RecordStore, StoreError};
use crate::filter::{FilterExpression, FilterValue, Operator, Scalar};
use crate::render::field_text;

/// A call received by [`MemoryStore`], with the filter already serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// A `query` call.
    Query {
        /// Queried table.
        table: String,
        /// Encoded query, `None` when unfiltered.
        query: Option<String>,
        /// Paging and selection options.
        options: QueryOptions,
    },
    /// A `get` call.
    Get {
        /// Addressed table.
        table: String,
        /// Requested native key.
        sys_id: String,
        /// Requested fields.
        fields: Option<Vec<String>>,
    },
    /// A `create` call.
    Create {
        /// Addressed table.
        table: String,
        /// Payload as sent.
        data: Record,
    },
    /// An `update` call.
    Update {
        /// Addressed table.
        table: String,
        /// Updated native key.
        sys_id: String,
        /// Payload as sent.
        data: Record,
    },
    /// A `delete` call.
    Delete {
        /// Addressed table.
        table: String,
        /// Deleted native key.
        sys_id: String,
    },
}

/// [`RecordStore`] over in-process tables, recording every call it receives.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    calls: Mutex<Vec<StoreCall>>,
    failure: Mutex<Option<StoreError>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row. Non-object values are ignored.
    pub fn insert(&self, table: &str, row: JsonValue) {
        if let JsonValue::Object(record) = row {
            self.tables
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entry(table.to_string())
                .or_default()
                .push(record);
        }
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn record_call(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn not_found(table: &str, sys_id: &str) -> StoreError {
    StoreError::NotFound {
        table: table.to_string(),
        sys_id: sys_id.to_string(),
    }
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}

fn select(record: &Record, fields: Option<&[String]>) -> Record {
    match fields {
        Some(fields) if !fields.is_empty() => record
            .iter()
            .filter(|(key, _)| fields.iter().any(|f| f == *key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => record.clone(),
    }
}

fn compare(actual: &str, expected: &str) -> Option<std::cmp::Ordering> {
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(actual.cmp(expected)),
    }
}

fn condition_matches(record: &Record, field: &str, value: &FilterValue) -> bool {
    let actual = field_text(record, field);
    let (op, expected) = match value {
        FilterValue::Literal(s) => (Operator::Eq, s),
        FilterValue::Operator(op, s) => (*op, s),
    };
    let expected = match expected {
        Scalar::String(s) => s.clone(),
        other => other.to_string(),
    };

    match op {
        Operator::IsEmpty => actual.is_none(),
        Operator::IsNotEmpty => actual.is_some(),
        Operator::In | Operator::NotIn => {
            let listed = actual
                .as_deref()
                .is_some_and(|a| expected.split(',').any(|part| part.trim() == a));
            listed == (op == Operator::In)
        }
        _ => {
            let actual = actual.unwrap_or_default();
            match op {
                Operator::Eq => actual == expected,
                Operator::Neq => actual != expected,
                Operator::Gt => compare(&actual, &expected).is_some_and(|o| o.is_gt()),
                Operator::Gte => compare(&actual, &expected).is_some_and(|o| o.is_ge()),
                Operator::Lt => compare(&actual, &expected).is_some_and(|o| o.is_lt()),
                Operator::Lte => compare(&actual, &expected).is_some_and(|o| o.is_le()),
                Operator::Like | Operator::Contains => actual.contains(&expected),
                Operator::StartsWith => actual.starts_with(&expected),
                Operator::EndsWith => actual.ends_with(&expected),
                Operator::In | Operator::NotIn | Operator::IsEmpty | Operator::IsNotEmpty => false,
            }
        }
    }
}

fn matches_filter(record: &Record, filter: Option<&FilterExpression>) -> bool {
    filter.map_or(true, |filter| {
        filter
            .conditions()
            .iter()
            .all(|(field, value)| condition_matches(record, field, value))
    })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(
        &self,
        table: &str,
        filter: Option<&FilterExpression>,
        options: &QueryOptions,
    ) -> Result<Vec<Record>, StoreError> {
        self.record_call(StoreCall::Query {
            table: table.to_string(),
            query: filter.and_then(FilterExpression::to_query),
            options: options.clone(),
        })?;

        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(self
            .rows(table)
            .iter()
            .filter(|record| matches_filter(record, filter))
            .skip(offset)
            .take(limit)
            .map(|record| select(record, options.fields.as_deref()))
            .collect())
    }

    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: Option<&[String]>,
    ) -> Result<Record, StoreError> {
        self.record_call(StoreCall::Get {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
            fields: fields.map(<[String]>::to_vec),
        })?;

        self.rows(table)
            .iter()
            .find(|record| field_text(record, "sys_id").as_deref() == Some(sys_id))
            .map(|record| select(record, fields))
            .ok_or_else(|| not_found(table, sys_id))
    }

    async fn create(&self, table: &str, data: &Record) -> Result<Record, StoreError> {
        self.record_call(StoreCall::Create {
            table: table.to_string(),
            data: data.clone(),
        })?;

        let seq = self.next_sequence();
        let now = timestamp();
        let mut record = data.clone();
        record.insert("sys_id".to_string(), format!("{:032x}", seq).into());
        record.insert("number".to_string(), format!("INC{:07}", 10_000 + seq).into());
        record.insert("sys_created_on".to_string(), now.clone().into());
        record.insert("sys_updated_on".to_string(), now.into());

        self.insert(table, JsonValue::Object(record.clone()));
        Ok(record)
    }

    async fn update(&self, table: &str, sys_id: &str, data: &Record) -> Result<Record, StoreError> {
        self.record_call(StoreCall::Update {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
            data: data.clone(),
        })?;

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let record = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|record| field_text(record, "sys_id").as_deref() == Some(sys_id))
            })
            .ok_or_else(|| not_found(table, sys_id))?;

        for (key, value) in data {
            record.insert(key.clone(), value.clone());
        }
        record.insert("sys_updated_on".to_string(), timestamp().into());
        Ok(record.clone())
    }

    async fn delete(&self, table: &str, sys_id: &str) -> Result<(), StoreError> {
        self.record_call(StoreCall::Delete {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
        })?;

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| not_found(table, sys_id))?;
        let before = rows.len();
        rows.retain(|record| field_text(record, "sys_id").as_deref() != Some(sys_id));
        if rows.len() == before {
            return Err(not_found(table, sys_id));
        }
        Ok(())
    }
}
