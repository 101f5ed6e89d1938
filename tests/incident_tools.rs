//! End-to-end tool behaviour against the in-memory record store.

use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};
use servicenow_mcp::store::memory::StoreCall;
use servicenow_mcp::store::QueryOptions;
use servicenow_mcp::{InstanceName, McpError, McpSession, MemoryStore, StoreError, ToolRegistry};

const SYS_ID: &str = "0123456789abcdef0123456789abcdef";

fn args(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => panic!("arguments must be an object"),
    }
}

fn setup() -> (Arc<MemoryStore>, McpSession) {
    let store = Arc::new(MemoryStore::new());
    let session = McpSession::new(store.clone());
    (store, session)
}

fn seed(store: &MemoryStore) {
    store.insert(
        "incident",
        json!({
            "sys_id": SYS_ID,
            "number": "INC0010001",
            "short_description": "Email down",
            "state": "2",
            "priority": "1"
        }),
    );
    store.insert(
        "incident",
        json!({
            "sys_id": "fedcba9876543210fedcba9876543210",
            "number": "INC0010002",
            "short_description": "Printer jammed",
            "state": "1",
            "priority": "4"
        }),
    );
}

async fn call(session: &McpSession, name: &str, value: JsonValue) -> Result<String, McpError> {
    ToolRegistry::new().dispatch(session, name, args(value)).await
}

#[tokio::test]
async fn get_by_number_looks_up_a_single_row() {
    let (store, session) = setup();

    let text = call(&session, "incident_get", json!({"identifier": "INC0010001"}))
        .await
        .unwrap();
    assert_eq!(text, "Incident \"INC0010001\" not found.");

    assert_eq!(
        store.calls(),
        vec![StoreCall::Query {
            table: "incident".to_string(),
            query: Some("number=INC0010001".to_string()),
            options: QueryOptions {
                limit: Some(1),
                ..Default::default()
            },
        }]
    );
}

#[tokio::test]
async fn get_returns_the_record() {
    let (store, session) = setup();
    seed(&store);

    let text = call(&session, "incident_get", json!({"identifier": "INC0010002"}))
        .await
        .unwrap();
    assert!(text.starts_with("Incident INC0010002:\n\n"), "{}", text);
    assert!(text.contains("Printer jammed"));

    let text = call(&session, "incident_get", json!({"identifier": SYS_ID.to_uppercase()}))
        .await
        .unwrap();
    assert_eq!(text, format!("Incident \"{}\" not found.", SYS_ID.to_uppercase()));
    assert!(matches!(store.calls().last(), Some(StoreCall::Get { .. })));
}

#[tokio::test]
async fn create_translates_labels_to_codes() {
    let (store, session) = setup();

    let text = call(
        &session,
        "incident_create",
        json!({
            "short_description": "VPN unreachable",
            "priority": "Critical",
            "urgency": "High",
            "state": "2",
            "u_site": "Berlin"
        }),
    )
    .await
    .unwrap();

    assert!(text.starts_with("Incident created successfully.\nNumber: INC0010001\nSys ID: "));

    let calls = store.calls();
    let [StoreCall::Create { table, data }] = calls.as_slice() else {
        panic!("expected a single create, got {:?}", calls);
    };
    assert_eq!(table, "incident");
    assert_eq!(data["priority"], "1");
    assert_eq!(data["urgency"], "1");
    assert_eq!(data["state"], "2");
    assert_eq!(data["u_site"], "Berlin");
}

#[tokio::test]
async fn query_serializes_operator_conditions() {
    let (store, session) = setup();
    seed(&store);

    let text = call(
        &session,
        "incident_query",
        json!({"filter": {"priority": {"operator": "<=", "value": "Moderate"}}}),
    )
    .await
    .unwrap();

    assert!(text.starts_with("Found 1 incident(s):\n\n"), "{}", text);
    assert!(text.contains("INC0010001 [state: In Progress, priority: Critical] Email down"));

    let calls = store.calls();
    let [StoreCall::Query { query, options, .. }] = calls.as_slice() else {
        panic!("expected a single query, got {:?}", calls);
    };
    assert_eq!(query.as_deref(), Some("priority<=3"));
    assert_eq!(options.limit, Some(100));
}

#[tokio::test]
async fn query_without_matches_uses_fixed_text() {
    let (store, session) = setup();
    seed(&store);

    let text = call(
        &session,
        "incident_query",
        json!({"filter": {"state": "Closed", "active": true}}),
    )
    .await
    .unwrap();
    assert_eq!(text, "No incidents found matching the criteria.");

    let calls = store.calls();
    let [StoreCall::Query { query, .. }] = calls.as_slice() else {
        panic!("expected a single query, got {:?}", calls);
    };
    assert_eq!(query.as_deref(), Some("state=7^active=true"));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_store() {
    let (store, session) = setup();
    seed(&store);

    let err = call(&session, "incident_delete", json!({"identifier": "INC0010001"}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Validation(ref f) if f.has_path("confirm")));

    let err = call(
        &session,
        "incident_query",
        json!({"filter": {"priority": "Urgent"}, "limit": 0}),
    )
    .await
    .unwrap_err();
    let McpError::Validation(failure) = err else {
        panic!("expected validation failure");
    };
    assert!(failure.has_path("filter.priority"));
    assert!(failure.has_path("limit"));

    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn identifiers_with_query_syntax_never_reach_the_store() {
    let (store, session) = setup();
    seed(&store);

    let err = call(
        &session,
        "incident_delete",
        json!({"identifier": "INC0099999^ORnumber!=INC0099999", "confirm": true}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, McpError::Validation(ref f) if f.has_path("identifier")));

    let err = call(
        &session,
        "incident_query",
        json!({"filter": {"short_description": "x^NQactive=true"}}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, McpError::Validation(ref f) if f.has_path("filter.short_description")));

    assert!(store.calls().is_empty());
    assert_eq!(store.rows("incident").len(), 2);
}

#[tokio::test]
async fn native_keys_skip_the_number_lookup() {
    let (store, session) = setup();
    seed(&store);

    let text = call(
        &session,
        "incident_update",
        json!({"identifier": SYS_ID, "state": "Resolved", "close_notes": "Rebooted"}),
    )
    .await
    .unwrap();
    assert!(text.starts_with("Incident INC0010001 updated successfully."), "{}", text);

    let calls = store.calls();
    let [StoreCall::Update { sys_id, data, .. }] = calls.as_slice() else {
        panic!("expected a single update, got {:?}", calls);
    };
    assert_eq!(sys_id, SYS_ID);
    assert_eq!(data["state"], "6");
    assert_eq!(data["close_notes"], "Rebooted");
}

#[tokio::test]
async fn update_by_number_resolves_first() {
    let (store, session) = setup();
    seed(&store);

    call(
        &session,
        "incident_update",
        json!({"identifier": "INC0010002", "priority": "High"}),
    )
    .await
    .unwrap();

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert!(
        matches!(&calls[0], StoreCall::Query { query, options, .. }
            if query.as_deref() == Some("number=INC0010002") && options.limit == Some(1))
    );
    assert!(
        matches!(&calls[1], StoreCall::Update { sys_id, .. }
            if sys_id == "fedcba9876543210fedcba9876543210")
    );
}

#[tokio::test]
async fn update_of_missing_record_is_not_an_error() {
    let (store, session) = setup();

    let text = call(
        &session,
        "incident_update",
        json!({"identifier": "INC0099999", "state": "Closed"}),
    )
    .await
    .unwrap();
    assert_eq!(text, "Incident \"INC0099999\" not found.");
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn delete_reports_the_number() {
    let (store, session) = setup();
    seed(&store);

    let text = call(&session, "incident_delete", json!({"identifier": SYS_ID, "confirm": true}))
        .await
        .unwrap();
    assert_eq!(text, "Incident INC0010001 deleted successfully.");
    assert_eq!(store.rows("incident").len(), 1);

    let calls = store.calls();
    assert!(matches!(&calls[0], StoreCall::Get { sys_id, .. } if sys_id == SYS_ID));
    assert!(matches!(&calls[1], StoreCall::Delete { sys_id, .. } if sys_id == SYS_ID));
}

#[tokio::test]
async fn store_failures_propagate_with_context() {
    let (store, session) = setup();
    store.fail_with(StoreError::Auth {
        status: 401,
        message: "User Not Authenticated".to_string(),
    });

    let err = call(&session, "incident_query", json!({})).await.unwrap_err();
    match err {
        McpError::Store {
            operation,
            table,
            source,
        } => {
            assert_eq!(operation, "query");
            assert_eq!(table, "incident");
            assert!(matches!(source, StoreError::Auth { status: 401, .. }));
        }
        other => panic!("expected store error, got {:?}", other),
    }

    let err = call(
        &session,
        "incident_delete",
        json!({"identifier": "INC0010001", "confirm": true}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, McpError::Store { operation: "lookup", .. }));
}

#[tokio::test]
async fn read_only_sessions_refuse_writes() {
    let (store, session) = setup();
    let session = session.with_read_only(true);

    let err = call(&session, "incident_create", json!({"short_description": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::AccessDenied(_)));
    assert!(store.calls().is_empty());

    call(&session, "incident_query", json!({})).await.unwrap();
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn calls_route_to_the_named_instance() {
    let (dev, session) = setup();
    let prod = Arc::new(MemoryStore::new());
    let session = session.with_instance(InstanceName::Prod, prod.clone());

    call(&session, "incident_query", json!({"instance": "prod"}))
        .await
        .unwrap();
    assert_eq!(prod.calls().len(), 1);
    assert!(dev.calls().is_empty());

    let err = call(&session, "incident_query", json!({"instance": "test"}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::InstanceNotConfigured(InstanceName::Test)));

    let err = call(&session, "incident_query", json!({"instance": "staging"}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Validation(ref f) if f.has_path("instance")));
}
