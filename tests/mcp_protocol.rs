//! JSON-RPC round trips through the server with an in-memory store.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use servicenow_mcp::{McpServer, McpSession, MemoryStore};

async fn send(server: &McpServer, message: JsonValue) -> Option<JsonValue> {
    let reply = server.handle_line(&message.to_string()).await?;
    Some(serde_json::from_str(&reply).unwrap())
}

fn tool_call(id: u64, name: &str, arguments: JsonValue) -> JsonValue {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn text(reply: &JsonValue) -> &str {
    reply["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn session_lifecycle() {
    let server = McpServer::new(McpSession::new(Arc::new(MemoryStore::new())));

    let init = send(
        &server,
        json!({"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {}}),
    )
    .await
    .unwrap();
    assert!(init["result"]["protocolVersion"].is_string());

    let initialized = send(
        &server,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(initialized.is_none());

    let created = send(
        &server,
        tool_call(
            1,
            "incident_create",
            json!({"short_description": "Laptop will not boot", "impact": "Low"}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(created["result"]["isError"], false);
    assert!(text(&created).contains("Number: INC0010001"));

    let fetched = send(
        &server,
        tool_call(2, "incident_get", json!({"identifier": "INC0010001"})),
    )
    .await
    .unwrap();
    let body = text(&fetched);
    assert!(body.starts_with("Incident INC0010001:"), "{}", body);
    assert!(body.contains("\"impact\": \"3\""));

    let listed = send(
        &server,
        tool_call(3, "incident_query", json!({"filter": {"impact": "Low"}})),
    )
    .await
    .unwrap();
    assert!(text(&listed).starts_with("Found 1 incident(s):"));

    let deleted = send(
        &server,
        tool_call(4, "incident_delete", json!({"identifier": "INC0010001", "confirm": true})),
    )
    .await
    .unwrap();
    assert_eq!(text(&deleted), "Incident INC0010001 deleted successfully.");

    let empty = send(&server, tool_call(5, "incident_query", json!({})))
        .await
        .unwrap();
    assert_eq!(text(&empty), "No incidents found matching the criteria.");
}

#[tokio::test]
async fn validation_failures_are_tool_errors() {
    let server = McpServer::new(McpSession::new(Arc::new(MemoryStore::new())));

    let reply = send(
        &server,
        tool_call(1, "incident_update", json!({"identifier": "INC0010001"})),
    )
    .await
    .unwrap();
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(
        text(&reply),
        "Error: Invalid input:\nat least one field to update is required"
    );
}

#[tokio::test]
async fn malformed_tool_calls_are_protocol_errors() {
    let server = McpServer::new(McpSession::new(Arc::new(MemoryStore::new())));

    let reply = send(
        &server,
        json!({"jsonrpc": "2.0", "id": 9, "method": "tools/call", "params": {"arguments": {}}}),
    )
    .await
    .unwrap();
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["id"], 9);
}
