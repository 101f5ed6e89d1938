//! Incident tools.
//!
//! Tools: incident_query, incident_get, incident_create, incident_update,
//! incident_delete
//!
//! Each call runs the same pipeline: validate and normalize the payload, pick
//! the instance's record store, resolve the identifier when the operation needs
//! one, make the store call(s), and render the outcome as text. A record that
//! cannot be found is an ordinary answer, not an error.

use serde_json::{json, Map, Value as JsonValue};

use crate::config::InstanceName;
use crate::error::{McpError, Result};
use crate::filter::Operator;
use crate::render::{field_text, record_json, records_json, summary_line};
use crate::resolve::{is_native_key, number_lookup, number_matches, resolve, Lookup, Resolution};
use crate::schema;
use crate::session::McpSession;
use crate::store::StoreError;
use crate::tools::ToolDef;
use crate::validate::{
    validate, CreateInput, DeleteInput, GetInput, NormalizedInput, Operation, QueryInput,
    UpdateInput, DEFAULT_LIMIT, ENUM_FIELDS, MAX_LIMIT, TEXT_FIELDS,
};
use crate::vocabulary::FieldKind;

/// Table backing every incident tool.
pub const TABLE: &str = "incident";
/// Name prefix shared by the incident tools.
pub const PREFIX: &str = "incident_";

/// Reply to a query without matches.
pub const NO_MATCHES: &str = "No incidents found matching the criteria.";

fn not_found(identifier: &str) -> String {
    format!("Incident \"{}\" not found.", identifier)
}

fn instance_names() -> Vec<&'static str> {
    InstanceName::ALL.iter().map(|n| n.as_str()).collect()
}

/// Create/update schema built from the validator's field lists.
fn incident_schema(key: &str) -> JsonValue {
    let mut props = Map::new();
    props.insert(key.to_string(), json!({"type": "string"}));
    for name in TEXT_FIELDS {
        props.insert(name.to_string(), json!({"type": "string"}));
    }
    for name in ENUM_FIELDS {
        let values = FieldKind::for_field(name).map(FieldKind::accepted_values);
        props.insert(name.to_string(), json!({"type": "string", "enum": values}));
    }
    props.insert(
        "instance".to_string(),
        json!({"type": "string", "enum": instance_names()}),
    );

    json!({
        "type": "object",
        "properties": props,
        "required": [key],
        "additionalProperties": true
    })
}

/// Get all incident tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "incident_query",
            "Search incidents. `filter` maps field names to either a value (equality) or an \
             {operator, value} object; all conditions must hold (AND). Operators: =, !=, >, >=, \
             <, <=, LIKE, STARTSWITH, ENDSWITH, CONTAINS, IN, NOT IN, ISEMPTY, ISNOTEMPTY. \
             state, priority, urgency and impact accept labels such as 'In Progress' or \
             'Critical' as well as their numeric codes. OR conditions and grouping are not \
             supported. Returns a summary line per incident followed by the full records.",
            json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "object",
                        "description": "Field conditions, e.g. {\"priority\": {\"operator\": \"<=\", \"value\": \"High\"}, \"active\": true}",
                        "additionalProperties": {
                            "oneOf": [
                                {"type": ["string", "number", "boolean"]},
                                {
                                    "type": "object",
                                    "properties": {
                                        "operator": {"type": "string", "enum": Operator::accepted()},
                                        "value": {"type": ["string", "number", "boolean", "array"]}
                                    },
                                    "required": ["operator"]
                                }
                            ]
                        }
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_LIMIT,
                        "default": DEFAULT_LIMIT,
                        "description": "Maximum number of incidents to return"
                    },
                    "offset": {"type": "integer", "minimum": 0},
                    "fields": {
                        "oneOf": [
                            {"type": "array", "items": {"type": "string"}},
                            {"type": "string"}
                        ],
                        "description": "Fields to return, as a list or comma-separated; all fields when omitted"
                    },
                    "display_value": {
                        "type": ["boolean", "string"],
                        "description": "true for display values, 'all' for both raw and display values"
                    },
                    "exclude_reference_link": {"type": "boolean"},
                    "instance": {"type": "string", "enum": instance_names()}
                },
                "required": []
            }),
        ),
        ToolDef::new(
            "incident_get",
            "Get one incident by sys_id (32 hex characters) or by number such as \
             'INC0010001'. Returns the full record, or a not-found message.",
            schema!(object {
                required: { "identifier": string },
                optional: {
                    "fields": field_list,
                    "instance": (enum instance_names())
                }
            }),
        ),
        ToolDef::new(
            "incident_create",
            "Create an incident. short_description is required. state, priority, urgency and \
             impact accept labels or codes. Any other field of the incident table may be \
             passed and is sent unchanged. Returns the new number and sys_id.",
            incident_schema("short_description"),
        ),
        ToolDef::new(
            "incident_update",
            "Update an incident identified by sys_id or number. Only the fields given are \
             changed; state, priority, urgency and impact accept labels or codes, and other \
             incident fields are sent unchanged. Returns the updated record.",
            incident_schema("identifier"),
        ),
        ToolDef::new(
            "incident_delete",
            "Delete an incident identified by sys_id or number. Requires confirm: true. \
             This cannot be undone.",
            schema!(object {
                required: { "identifier": string, "confirm": boolean },
                optional: { "instance": (enum instance_names()) }
            }),
        ),
    ]
}

fn operation_for(name: &str) -> Option<Operation> {
    match name {
        "incident_query" => Some(Operation::Query),
        "incident_get" => Some(Operation::Get),
        "incident_create" => Some(Operation::Create),
        "incident_update" => Some(Operation::Update),
        "incident_delete" => Some(Operation::Delete),
        _ => None,
    }
}

/// Dispatch an incident tool call.
pub async fn dispatch(
    session: &McpSession,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<String> {
    let operation = operation_for(name).ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
    if operation.is_write() {
        session.check_write_access(name)?;
    }

    let input = validate(operation, &args).map_err(|failure| {
        tracing::warn!(tool = name, issues = failure.issues().len(), "invalid tool input");
        McpError::from(failure)
    })?;

    match input {
        NormalizedInput::Query(input) => dispatch_query(session, input).await,
        NormalizedInput::Get(input) => dispatch_get(session, input).await,
        NormalizedInput::Create(input) => dispatch_create(session, input).await,
        NormalizedInput::Update(input) => dispatch_update(session, input).await,
        NormalizedInput::Delete(input) => dispatch_delete(session, input).await,
    }
}

// ── Query ────────────────────────────────────────────────────────────────

async fn dispatch_query(session: &McpSession, input: QueryInput) -> Result<String> {
    let (instance, store) = session.store(input.instance)?;
    tracing::info!(
        %instance,
        table = TABLE,
        query = %input.filter,
        limit = input.options.limit,
        "querying incidents"
    );

    let records = store
        .query(TABLE, Some(&input.filter), &input.options)
        .await
        .map_err(|e| McpError::store("query", TABLE, e))?;

    if records.is_empty() {
        return Ok(NO_MATCHES.to_string());
    }

    let summaries: Vec<String> = records.iter().map(summary_line).collect();
    Ok(format!(
        "Found {} incident(s):\n\n{}\n\n{}",
        records.len(),
        summaries.join("\n"),
        records_json(&records)
    ))
}

// ── Get ──────────────────────────────────────────────────────────────────

async fn dispatch_get(session: &McpSession, input: GetInput) -> Result<String> {
    let (instance, store) = session.store(input.instance)?;
    let identifier = input.identifier;
    tracing::info!(%instance, table = TABLE, identifier = %identifier, "getting incident");

    let record = if is_native_key(&identifier) {
        match store.get(TABLE, &identifier, input.fields.as_deref()).await {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => return Ok(not_found(&identifier)),
            Err(e) => return Err(McpError::store("get", TABLE, e)),
        }
    } else {
        let (filter, options) = number_lookup(&identifier, input.fields);
        let records = store
            .query(TABLE, Some(&filter), &options)
            .await
            .map_err(|e| McpError::store("get", TABLE, e))?;
        match records
            .into_iter()
            .find(|record| number_matches(record, &identifier))
        {
            Some(record) => record,
            None => return Ok(not_found(&identifier)),
        }
    };

    let number = field_text(&record, "number").unwrap_or(identifier);
    Ok(format!("Incident {}:\n\n{}", number, record_json(&record)))
}

// ── Create ───────────────────────────────────────────────────────────────

async fn dispatch_create(session: &McpSession, input: CreateInput) -> Result<String> {
    let (instance, store) = session.store(input.instance)?;
    let data = input.fields.to_record();
    tracing::info!(%instance, table = TABLE, fields = data.len(), "creating incident");

    let record = store
        .create(TABLE, &data)
        .await
        .map_err(|e| McpError::store("create", TABLE, e))?;

    let number = field_text(&record, "number").unwrap_or_else(|| "(unknown)".to_string());
    let sys_id = field_text(&record, "sys_id").unwrap_or_else(|| "(unknown)".to_string());
    tracing::info!(%instance, number = %number, sys_id = %sys_id, "incident created");

    Ok(format!(
        "Incident created successfully.\nNumber: {}\nSys ID: {}\n\n{}",
        number,
        sys_id,
        record_json(&record)
    ))
}

// ── Update ───────────────────────────────────────────────────────────────

async fn dispatch_update(session: &McpSession, input: UpdateInput) -> Result<String> {
    let (instance, store) = session.store(input.instance)?;
    let identifier = input.identifier;

    let target = match resolve(store, TABLE, &identifier, Lookup::KeyOnly)
        .await
        .map_err(|e| McpError::store("lookup", TABLE, e))?
    {
        Resolution::Found(target) => target,
        Resolution::NotFound => return Ok(not_found(&identifier)),
    };

    let data = input.fields.to_record();
    tracing::info!(
        %instance,
        table = TABLE,
        sys_id = %target.sys_id,
        fields = data.len(),
        "updating incident"
    );

    let record = match store.update(TABLE, &target.sys_id, &data).await {
        Ok(record) => record,
        Err(StoreError::NotFound { .. }) => return Ok(not_found(&identifier)),
        Err(e) => return Err(McpError::store("update", TABLE, e)),
    };

    let number = field_text(&record, "number")
        .or(target.number)
        .unwrap_or(identifier);
    Ok(format!(
        "Incident {} updated successfully.\n\n{}",
        number,
        record_json(&record)
    ))
}

// ── Delete ───────────────────────────────────────────────────────────────

async fn dispatch_delete(session: &McpSession, input: DeleteInput) -> Result<String> {
    let (instance, store) = session.store(input.instance)?;
    let identifier = input.identifier;

    let target = match resolve(store, TABLE, &identifier, Lookup::WithNumber)
        .await
        .map_err(|e| McpError::store("lookup", TABLE, e))?
    {
        Resolution::Found(target) => target,
        Resolution::NotFound => return Ok(not_found(&identifier)),
    };

    tracing::info!(%instance, table = TABLE, sys_id = %target.sys_id, "deleting incident");
    match store.delete(TABLE, &target.sys_id).await {
        Ok(()) => {}
        Err(StoreError::NotFound { .. }) => return Ok(not_found(&identifier)),
        Err(e) => return Err(McpError::store("delete", TABLE, e)),
    }

    let number = target.number.unwrap_or(identifier);
    Ok(format!("Incident {} deleted successfully.", number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_maps_to_an_operation() {
        for tool in tools() {
            assert!(tool.name.starts_with(PREFIX));
            assert!(operation_for(&tool.name).is_some(), "{}", tool.name);
        }
        assert_eq!(operation_for("incident_archive"), None);
    }

    #[test]
    fn schemas_advertise_vocabulary_labels() {
        let tools = tools();
        let create = tools.iter().find(|t| t.name == "incident_create").unwrap();
        let priority = &create.input_schema["properties"]["priority"]["enum"];
        assert_eq!(priority[0], "Critical");
        assert_eq!(create.input_schema["required"], json!(["short_description"]));

        let delete = tools.iter().find(|t| t.name == "incident_delete").unwrap();
        assert_eq!(
            delete.input_schema["required"],
            json!(["identifier", "confirm"])
        );
    }

    #[test]
    fn write_schemas_cover_every_validated_field() {
        let tools = tools();
        for name in ["incident_create", "incident_update"] {
            let tool = tools.iter().find(|t| t.name == name).unwrap();
            let props = tool.input_schema["properties"].as_object().unwrap();
            for field in TEXT_FIELDS.iter().chain(ENUM_FIELDS).chain(&["instance"]) {
                assert!(props.contains_key(*field), "{} lacks {}", name, field);
            }
        }

        let update = tools.iter().find(|t| t.name == "incident_update").unwrap();
        assert_eq!(update.input_schema["required"], json!(["identifier"]));
        assert_eq!(
            update.input_schema["properties"]["impact"]["enum"],
            json!(FieldKind::Severity.accepted_values())
        );
    }

    #[test]
    fn field_selection_accepts_list_or_comma_string() {
        let tools = tools();
        for name in ["incident_query", "incident_get"] {
            let tool = tools.iter().find(|t| t.name == name).unwrap();
            let fields = &tool.input_schema["properties"]["fields"]["oneOf"];
            assert_eq!(fields[0]["type"], "array", "{}", name);
            assert_eq!(fields[1]["type"], "string", "{}", name);
        }
    }

    #[test]
    fn not_found_message_quotes_identifier() {
        assert_eq!(not_found("INC0010001"), "Incident \"INC0010001\" not found.");
    }
}
