//! Identifier resolution.
//!
//! Callers may address a record by its native key (`sys_id`, 32 hex characters)
//! or by its human-facing number (`INC0010001`). Numbers are looked up with a
//! single-row query before the record is read or mutated. The lookup and the
//! mutation are separate requests; a record changed in between is not detected.

use crate::filter::FilterExpression;
use crate::render::field_text;
use crate::store::{QueryOptions, Record, RecordStore, StoreError};

/// Field holding the native key.
pub const KEY_FIELD: &str = "sys_id";
/// Field holding the human-facing number.
pub const NUMBER_FIELD: &str = "number";

/// Whether `identifier` has the shape of a native key.
pub fn is_native_key(identifier: &str) -> bool {
    identifier.len() == 32 && identifier.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether `record` carries `identifier` as its number.
///
/// Lookups go through the remote query engine, so a returned row is only
/// trusted once its number has been compared with what was asked for.
pub fn number_matches(record: &Record, identifier: &str) -> bool {
    field_text(record, NUMBER_FIELD).is_some_and(|number| number.eq_ignore_ascii_case(identifier))
}

/// How much a native-key identifier needs to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Native keys are used as-is, without a round trip.
    KeyOnly,
    /// Native keys are fetched to learn the record number.
    WithNumber,
}

/// A record located by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// Native key of the record.
    pub sys_id: String,
    /// Unknown when a native key was accepted without a fetch.
    pub number: Option<String>,
}

/// Outcome of [`resolve`]. Not finding a record is an ordinary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The identifier names an existing record.
    Found(ResolvedRecord),
    /// No record carries the identifier.
    NotFound,
}

/// Filter and options of the single-row lookup by record number.
pub fn number_lookup(
    identifier: &str,
    fields: Option<Vec<String>>,
) -> (FilterExpression, QueryOptions) {
    let filter = FilterExpression::equals(NUMBER_FIELD, identifier);
    let options = QueryOptions {
        limit: Some(1),
        fields,
        ..Default::default()
    };
    (filter, options)
}

fn key_fields() -> Vec<String> {
    vec![KEY_FIELD.to_string(), NUMBER_FIELD.to_string()]
}

/// Resolve `identifier` in `table` to its native key.
///
/// Transport, auth and remote errors propagate unchanged.
pub async fn resolve(
    store: &dyn RecordStore,
    table: &str,
    identifier: &str,
    lookup: Lookup,
) -> Result<Resolution, StoreError> {
    if is_native_key(identifier) {
        if lookup == Lookup::KeyOnly {
            return Ok(Resolution::Found(ResolvedRecord {
                sys_id: identifier.to_string(),
                number: None,
            }));
        }

        let fields = key_fields();
        return match store.get(table, identifier, Some(&fields)).await {
            Ok(record) => Ok(Resolution::Found(ResolvedRecord {
                sys_id: field_text(&record, KEY_FIELD).unwrap_or_else(|| identifier.to_string()),
                number: field_text(&record, NUMBER_FIELD),
            })),
            Err(StoreError::NotFound { .. }) => Ok(Resolution::NotFound),
            Err(e) => Err(e),
        };
    }

    let (filter, options) = number_lookup(identifier, Some(key_fields()));
    tracing::debug!(table, query = %filter, "resolving record number");
    let records = store.query(table, Some(&filter), &options).await?;

    let Some(record) = records.iter().find(|r| number_matches(r, identifier)) else {
        if !records.is_empty() {
            tracing::warn!(table, identifier, "lookup returned a row for a different number");
        }
        return Ok(Resolution::NotFound);
    };
    match field_text(record, KEY_FIELD) {
        Some(sys_id) => Ok(Resolution::Found(ResolvedRecord {
            sys_id,
            number: field_text(record, NUMBER_FIELD),
        })),
        None => Err(StoreError::Decode(format!(
            "lookup of '{}' returned a row without {}",
            identifier, KEY_FIELD
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, StoreCall};
    use crate::store::{Auth, RestStore};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    const KEY: &str = "46d44a5fa9fe198100bd3e5a94f2a1c3";

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            "incident",
            json!({"sys_id": KEY, "number": "INC0010001", "short_description": "Printer jam"}),
        );
        store
    }

    fn rest_store(url: &str) -> RestStore {
        RestStore::new(url, Auth::Bearer("token".to_string()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn native_key_shape() {
        assert!(is_native_key(KEY));
        assert!(is_native_key(&KEY.to_ascii_uppercase()));
        assert!(!is_native_key("INC0010001"));
        assert!(!is_native_key(&KEY[..31]));
        assert!(!is_native_key(&format!("{}0", KEY)));
        assert!(!is_native_key("g6d44a5fa9fe198100bd3e5a94f2a1c3"));
    }

    #[tokio::test]
    async fn native_keys_skip_lookup_for_key_only() {
        let store = store();
        let resolution = resolve(&store, "incident", KEY, Lookup::KeyOnly).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Found(ResolvedRecord {
                sys_id: KEY.to_string(),
                number: None,
            })
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn native_keys_are_fetched_when_number_is_needed() {
        let store = store();
        let resolution = resolve(&store, "incident", KEY, Lookup::WithNumber).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Found(ResolvedRecord {
                sys_id: KEY.to_string(),
                number: Some("INC0010001".to_string()),
            })
        );
        assert!(matches!(store.calls().as_slice(), [StoreCall::Get { .. }]));

        let missing = "ffffffffffffffffffffffffffffffff";
        let resolution = resolve(&store, "incident", missing, Lookup::WithNumber)
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn numbers_issue_exactly_one_lookup() {
        let store = store();
        let resolution = resolve(&store, "incident", "INC0010001", Lookup::KeyOnly)
            .await
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Found(ResolvedRecord {
                sys_id: KEY.to_string(),
                number: Some("INC0010001".to_string()),
            })
        );
        match store.calls().as_slice() {
            [StoreCall::Query { query, options, .. }] => {
                assert_eq!(query.as_deref(), Some("number=INC0010001"));
                assert_eq!(options.limit, Some(1));
                assert_eq!(
                    options.fields,
                    Some(vec!["sys_id".to_string(), "number".to_string()])
                );
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_numbers_are_not_found() {
        let store = store();
        let resolution = resolve(&store, "incident", "INC9999999", Lookup::WithNumber)
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn rows_for_a_different_number_are_not_trusted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/now/table/incident")
            .match_query(Matcher::UrlEncoded(
                "sysparm_query".into(),
                "number=INC0099999".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"result":[{"sys_id":"fedcba9876543210fedcba9876543210","number":"INC0010002"}]}"#,
            )
            .create_async()
            .await;

        let store = rest_store(&server.url());
        let resolution = resolve(&store, "incident", "INC0099999", Lookup::WithNumber)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn number_match_ignores_case() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/now/table/incident")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"result":[{{"sys_id":"{}","number":"INC0010001"}}]}}"#,
                KEY
            ))
            .create_async()
            .await;

        let store = rest_store(&server.url());
        let resolution = resolve(&store, "incident", "inc0010001", Lookup::KeyOnly)
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Found(ResolvedRecord {
                sys_id: KEY.to_string(),
                number: Some("INC0010001".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let store = store();
        store.fail_with(StoreError::Transport("connection reset".to_string()));
        let err = resolve(&store, "incident", "INC0010001", Lookup::KeyOnly)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Transport("connection reset".to_string()));
    }
}
