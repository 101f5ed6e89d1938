//! Tool payload validation and normalization.
//!
//! Every incident tool validates its raw JSON arguments here before any request
//! is made. Validation runs in two passes:
//!
//! 1. structural checks (required fields, types, enumerations, lengths, ranges),
//!    collecting every violation instead of stopping at the first one;
//! 2. vocabulary normalization of `state`, `priority`, `urgency` and `impact`,
//!    including when they appear as filter keys.
//!
//! Create and update accept arbitrary additional fields. Those are forwarded to
//! the table API verbatim and are deliberately not validated.

use std::fmt;

use serde_json::{Map, Value as JsonValue};

use crate::config::InstanceName;
use crate::filter::{FilterExpression, FilterValue, Operator, Scalar};
use crate::store::{DisplayValue, QueryOptions, Record};
use crate::vocabulary::{self, FieldKind};

/// Default number of rows returned by a query.
pub const DEFAULT_LIMIT: u32 = 100;
/// Largest page a query may request.
pub const MAX_LIMIT: u32 = 1000;

/// Free-text incident fields with a dedicated slot in [`IncidentFields`].
pub const TEXT_FIELDS: &[&str] = &[
    "short_description",
    "description",
    "caller_id",
    "category",
    "subcategory",
    "assignment_group",
    "assigned_to",
    "close_code",
    "close_notes",
    "work_notes",
    "comments",
];

/// Vocabulary-backed incident fields.
pub const ENUM_FIELDS: &[&str] = &["state", "priority", "urgency", "impact"];

/// Selector fields that never reach the record payload.
const RESERVED_FIELDS: &[&str] = &["identifier", "instance"];

/// Condition separator of the encoded query grammar.
const QUERY_SEPARATOR: char = '^';

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path of the offending field; empty for payload-level problems.
    pub path: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// All violations found in one payload, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    /// Violations in the order they were found.
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Whether no violation was recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any violation concerns `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// The five incident operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `incident_query`
    Query,
    /// `incident_get`
    Get,
    /// `incident_create`
    Create,
    /// `incident_update`
    Update,
    /// `incident_delete`
    Delete,
}

impl Operation {
    /// Lowercase operation name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether the operation modifies records.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

/// Validated payload of any operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedInput {
    /// Validated query.
    Query(QueryInput),
    /// Validated get.
    Get(GetInput),
    /// Validated create.
    Create(CreateInput),
    /// Validated update.
    Update(UpdateInput),
    /// Validated delete.
    Delete(DeleteInput),
}

/// Validate `payload` against the schema of `operation`.
pub fn validate(
    operation: Operation,
    payload: &Map<String, JsonValue>,
) -> Result<NormalizedInput, ValidationFailure> {
    match operation {
        Operation::Query => QueryInput::from_args(payload).map(NormalizedInput::Query),
        Operation::Get => GetInput::from_args(payload).map(NormalizedInput::Get),
        Operation::Create => CreateInput::from_args(payload).map(NormalizedInput::Create),
        Operation::Update => UpdateInput::from_args(payload).map(NormalizedInput::Update),
        Operation::Delete => DeleteInput::from_args(payload).map(NormalizedInput::Delete),
    }
}

// ── Inputs ───────────────────────────────────────────────────────────────

/// Normalized `incident_query` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInput {
    /// Conditions with enumerated values already coded.
    pub filter: FilterExpression,
    /// `limit` is always set.
    pub options: QueryOptions,
    /// Target instance, default when `None`.
    pub instance: Option<InstanceName>,
}

impl QueryInput {
    /// Validate and normalize query arguments.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self, ValidationFailure> {
        let mut check = Checker::new(args);
        let filter = check.filter();
        let limit = check.integer("limit", 1, MAX_LIMIT);
        let offset = check.integer("offset", 0, u32::MAX);
        let fields = check.field_list();
        let display_value = check.display_value();
        let exclude_reference_link = check.boolean("exclude_reference_link");
        let instance = check.instance();
        check.finish()?;

        Ok(Self {
            filter: normalize_filter(filter.unwrap_or_default()),
            options: QueryOptions {
                limit: Some(limit.unwrap_or(DEFAULT_LIMIT)),
                offset,
                fields,
                display_value,
                exclude_reference_link,
            },
            instance,
        })
    }
}

/// Normalized `incident_get` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GetInput {
    /// Native key or record number.
    pub identifier: String,
    /// Fields to return; all when `None`.
    pub fields: Option<Vec<String>>,
    /// Target instance, default when `None`.
    pub instance: Option<InstanceName>,
}

impl GetInput {
    /// Validate get arguments.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self, ValidationFailure> {
        let mut check = Checker::new(args);
        let identifier = check.identifier();
        let fields = check.field_list();
        let instance = check.instance();
        check.finish()?;

        Ok(Self {
            identifier: identifier.unwrap_or_default(),
            fields,
            instance,
        })
    }
}

/// Known incident fields plus the passthrough escape hatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentFields {
    /// Required on create.
    pub short_description: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Caller, as a user `sys_id` or name.
    pub caller_id: Option<String>,
    /// Category.
    pub category: Option<String>,
    /// Subcategory.
    pub subcategory: Option<String>,
    /// Assignment group, as a `sys_id` or name.
    pub assignment_group: Option<String>,
    /// Assignee, as a user `sys_id` or name.
    pub assigned_to: Option<String>,
    /// Resolution code.
    pub close_code: Option<String>,
    /// Resolution notes.
    pub close_notes: Option<String>,
    /// Internal journal entry.
    pub work_notes: Option<String>,
    /// Customer-visible journal entry.
    pub comments: Option<String>,
    /// Coded values after normalization.
    pub state: Option<String>,
    /// Priority code, `1` (Critical) to `5` (Planning).
    pub priority: Option<String>,
    /// Urgency code, `1` (High) to `3` (Low).
    pub urgency: Option<String>,
    /// Impact code, `1` (High) to `3` (Low).
    pub impact: Option<String>,
    /// Unrecognized fields, forwarded as given.
    pub extra: Record,
}

impl IncidentFields {
    fn from_checker(check: &mut Checker<'_>) -> Self {
        let mut fields = Self::default();
        for name in TEXT_FIELDS {
            let min_len = usize::from(*name == "short_description");
            let value = check.string(name, false, min_len);
            *fields.text_slot(name) = value;
        }
        for name in ENUM_FIELDS {
            let value = check.enumerated(name);
            *fields.enum_slot(name) = value;
        }
        for (key, value) in check.args {
            let known = TEXT_FIELDS.contains(&key.as_str())
                || ENUM_FIELDS.contains(&key.as_str())
                || RESERVED_FIELDS.contains(&key.as_str());
            if !known {
                fields.extra.insert(key.clone(), value.clone());
            }
        }
        fields
    }

    fn text_slot(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "short_description" => &mut self.short_description,
            "description" => &mut self.description,
            "caller_id" => &mut self.caller_id,
            "category" => &mut self.category,
            "subcategory" => &mut self.subcategory,
            "assignment_group" => &mut self.assignment_group,
            "assigned_to" => &mut self.assigned_to,
            "close_code" => &mut self.close_code,
            "close_notes" => &mut self.close_notes,
            "work_notes" => &mut self.work_notes,
            _ => &mut self.comments,
        }
    }

    fn enum_slot(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "state" => &mut self.state,
            "priority" => &mut self.priority,
            "urgency" => &mut self.urgency,
            _ => &mut self.impact,
        }
    }

    /// Replace enumerated labels with their codes.
    fn normalize(mut self) -> Self {
        for name in ENUM_FIELDS {
            if let Some(kind) = FieldKind::for_field(name) {
                let slot = self.enum_slot(name);
                if let Some(raw) = slot.take() {
                    *slot = Some(vocabulary::normalize(kind, &raw).to_string());
                }
            }
        }
        self
    }

    /// Outgoing record payload: named fields first, then passthrough fields.
    pub fn to_record(&self) -> Record {
        let named = [
            ("short_description", &self.short_description),
            ("description", &self.description),
            ("caller_id", &self.caller_id),
            ("category", &self.category),
            ("subcategory", &self.subcategory),
            ("state", &self.state),
            ("priority", &self.priority),
            ("urgency", &self.urgency),
            ("impact", &self.impact),
            ("assignment_group", &self.assignment_group),
            ("assigned_to", &self.assigned_to),
            ("close_code", &self.close_code),
            ("close_notes", &self.close_notes),
            ("work_notes", &self.work_notes),
            ("comments", &self.comments),
        ];

        let mut record = Record::new();
        for (name, value) in named {
            if let Some(value) = value {
                record.insert(name.to_string(), JsonValue::String(value.clone()));
            }
        }
        for (key, value) in &self.extra {
            record.insert(key.clone(), value.clone());
        }
        record
    }

    /// Whether no field, named or passthrough, is set.
    pub fn is_empty(&self) -> bool {
        self.to_record().is_empty()
    }
}

/// Normalized `incident_create` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    /// Record fields to insert.
    pub fields: IncidentFields,
    /// Target instance, default when `None`.
    pub instance: Option<InstanceName>,
}

impl CreateInput {
    /// Validate and normalize create arguments.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self, ValidationFailure> {
        let mut check = Checker::new(args);
        if !args.contains_key("short_description") {
            check.issue("short_description", "is required");
        }
        let fields = IncidentFields::from_checker(&mut check);
        let instance = check.instance();
        check.finish()?;

        Ok(Self {
            fields: fields.normalize(),
            instance,
        })
    }
}

/// Normalized `incident_update` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput {
    /// Native key or record number.
    pub identifier: String,
    /// Fields to change.
    pub fields: IncidentFields,
    /// Target instance, default when `None`.
    pub instance: Option<InstanceName>,
}

impl UpdateInput {
    /// Validate and normalize update arguments.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self, ValidationFailure> {
        let mut check = Checker::new(args);
        let identifier = check.identifier();
        let fields = IncidentFields::from_checker(&mut check);
        let instance = check.instance();
        if fields.is_empty() {
            check.issue("", "at least one field to update is required");
        }
        check.finish()?;

        Ok(Self {
            identifier: identifier.unwrap_or_default(),
            fields: fields.normalize(),
            instance,
        })
    }
}

/// Normalized `incident_delete` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteInput {
    /// Native key or record number.
    pub identifier: String,
    /// Target instance, default when `None`.
    pub instance: Option<InstanceName>,
}

impl DeleteInput {
    /// Validate delete arguments.
    pub fn from_args(args: &Map<String, JsonValue>) -> Result<Self, ValidationFailure> {
        let mut check = Checker::new(args);
        let identifier = check.identifier();
        match args.get("confirm") {
            Some(JsonValue::Bool(true)) => {}
            Some(JsonValue::Bool(false)) | None => {
                check.issue("confirm", "must be true to delete a record")
            }
            Some(other) => check.issue(
                "confirm",
                format!("expected boolean, got {}", type_name(other)),
            ),
        }
        let instance = check.instance();
        check.finish()?;

        Ok(Self {
            identifier: identifier.unwrap_or_default(),
            instance,
        })
    }
}

// ── Structural checks ────────────────────────────────────────────────────

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Collects violations while extracting typed values.
struct Checker<'a> {
    args: &'a Map<String, JsonValue>,
    failure: ValidationFailure,
}

impl<'a> Checker<'a> {
    fn new(args: &'a Map<String, JsonValue>) -> Self {
        Self {
            args,
            failure: ValidationFailure::default(),
        }
    }

    fn issue(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.failure.issues.push(FieldIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationFailure> {
        if self.failure.is_empty() {
            Ok(())
        } else {
            Err(self.failure)
        }
    }

    fn string(&mut self, name: &str, required: bool, min_len: usize) -> Option<String> {
        match self.args.get(name) {
            None if required => {
                self.issue(name, "is required");
                None
            }
            None => None,
            Some(JsonValue::String(s)) if s.trim().chars().count() < min_len => {
                self.issue(name, "must not be empty");
                None
            }
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other) => {
                self.issue(name, format!("expected string, got {}", type_name(other)));
                None
            }
        }
    }

    fn identifier(&mut self) -> Option<String> {
        let identifier = self.string("identifier", true, 1)?.trim().to_string();
        if !identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.issue("identifier", "must contain only letters, digits and underscores");
            return None;
        }
        Some(identifier)
    }

    fn enumerated(&mut self, name: &str) -> Option<String> {
        let kind = FieldKind::for_field(name)?;
        let value = self.string(name, false, 0)?;
        if kind.accepts(&value) {
            Some(value)
        } else {
            self.issue(
                name,
                format!("must be one of: {}", kind.accepted_values().join(", ")),
            );
            None
        }
    }

    fn integer(&mut self, name: &str, min: u32, max: u32) -> Option<u32> {
        let value = self.args.get(name)?;
        let out_of_range = format!("must be between {} and {}", min, max);
        match value.as_i64() {
            Some(n) => match u32::try_from(n) {
                Ok(n) if n >= min && n <= max => Some(n),
                _ => {
                    self.issue(name, out_of_range);
                    None
                }
            },
            None if value.is_u64() => {
                self.issue(name, out_of_range);
                None
            }
            None if value.is_number() => {
                self.issue(name, "must be an integer");
                None
            }
            None => {
                self.issue(name, format!("expected integer, got {}", type_name(value)));
                None
            }
        }
    }

    fn boolean(&mut self, name: &str) -> Option<bool> {
        match self.args.get(name)? {
            JsonValue::Bool(b) => Some(*b),
            other => {
                self.issue(name, format!("expected boolean, got {}", type_name(other)));
                None
            }
        }
    }

    /// `fields` as an array of names or a comma-separated string.
    fn field_list(&mut self) -> Option<Vec<String>> {
        let names: Vec<String> = match self.args.get("fields")? {
            JsonValue::String(s) => s.split(',').map(|f| f.trim().to_string()).collect(),
            JsonValue::Array(items) => {
                let mut names = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => names.push(s.trim().to_string()),
                        None => self.issue(
                            format!("fields.{}", i),
                            format!("expected string, got {}", type_name(item)),
                        ),
                    }
                }
                names
            }
            other => {
                self.issue(
                    "fields",
                    format!("expected array or string, got {}", type_name(other)),
                );
                return None;
            }
        };
        let names: Vec<String> = names.into_iter().filter(|f| !f.is_empty()).collect();
        (!names.is_empty()).then_some(names)
    }

    fn display_value(&mut self) -> Option<DisplayValue> {
        match self.args.get("display_value")? {
            JsonValue::Bool(true) => Some(DisplayValue::True),
            JsonValue::Bool(false) => Some(DisplayValue::False),
            JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(DisplayValue::True),
                "false" => Some(DisplayValue::False),
                "all" => Some(DisplayValue::All),
                _ => {
                    self.issue("display_value", "must be one of: true, false, all");
                    None
                }
            },
            other => {
                self.issue(
                    "display_value",
                    format!("expected boolean or string, got {}", type_name(other)),
                );
                None
            }
        }
    }

    fn instance(&mut self) -> Option<InstanceName> {
        let raw = self.string("instance", false, 0)?;
        match raw.parse() {
            Ok(instance) => Some(instance),
            Err(_) => {
                let names: Vec<&str> = InstanceName::ALL.iter().map(|n| n.as_str()).collect();
                self.issue("instance", format!("must be one of: {}", names.join(", ")));
                None
            }
        }
    }

    fn filter(&mut self) -> Option<FilterExpression> {
        let entries = match self.args.get("filter")? {
            JsonValue::Object(entries) => entries,
            other => {
                self.issue("filter", format!("expected object, got {}", type_name(other)));
                return None;
            }
        };

        let mut filter = FilterExpression::new();
        for (field, value) in entries {
            if field.trim().is_empty() {
                self.issue("filter", "field names must not be empty");
                continue;
            }
            if !is_field_name(field) {
                self.issue(
                    "filter",
                    format!(
                        "invalid field name '{}': only letters, digits, '_' and '.' are allowed",
                        field
                    ),
                );
                continue;
            }
            let path = format!("filter.{}", field);
            if let Some(value) = self.filter_value(&path, value) {
                let separated = self.operand_separator_free(&path, &value);
                if self.enum_operand_ok(&path, field, &value) && separated {
                    filter.push(field.clone(), value);
                }
            }
        }
        Some(filter)
    }

    fn filter_value(&mut self, path: &str, value: &JsonValue) -> Option<FilterValue> {
        if let Some(scalar) = Scalar::from_json(value) {
            return Some(FilterValue::Literal(scalar));
        }
        let JsonValue::Object(condition) = value else {
            self.issue(
                path,
                format!(
                    "expected string, number, boolean or {{operator, value}} object, got {}",
                    type_name(value)
                ),
            );
            return None;
        };

        let op_path = format!("{}.operator", path);
        let operator = match condition.get("operator") {
            Some(JsonValue::String(raw)) => match raw.parse::<Operator>() {
                Ok(op) => Some(op),
                Err(_) => {
                    self.issue(
                        &op_path,
                        format!("must be one of: {}", Operator::accepted().join(", ")),
                    );
                    None
                }
            },
            Some(other) => {
                self.issue(&op_path, format!("expected string, got {}", type_name(other)));
                None
            }
            None => {
                self.issue(&op_path, "is required");
                None
            }
        };

        let value_path = format!("{}.value", path);
        let operand = match condition.get("value") {
            Some(v) => match (Scalar::from_json(v), v) {
                (Some(scalar), _) => Some(scalar),
                (None, JsonValue::Array(items)) if operator.is_some_and(Operator::is_list) => {
                    self.list_operand(&value_path, items)
                }
                (None, other) => {
                    self.issue(
                        &value_path,
                        format!("expected string, number or boolean, got {}", type_name(other)),
                    );
                    None
                }
            },
            None if operator.is_some_and(Operator::is_unary) => Some(Scalar::String(String::new())),
            None => {
                if operator.is_some() {
                    self.issue(&value_path, "is required");
                }
                None
            }
        };

        Some(FilterValue::Operator(operator?, operand?))
    }

    /// `IN` / `NOT IN` operands given as arrays become comma-separated lists.
    fn list_operand(&mut self, path: &str, items: &[JsonValue]) -> Option<Scalar> {
        let mut parts = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match Scalar::from_json(item) {
                Some(scalar) => parts.push(scalar.to_string()),
                None => self.issue(
                    format!("{}.{}", path, i),
                    format!("expected string, number or boolean, got {}", type_name(item)),
                ),
            }
        }
        (parts.len() == items.len()).then(|| Scalar::String(parts.join(",")))
    }

    /// Operands must not contain the `^` condition separator.
    fn operand_separator_free(&mut self, path: &str, value: &FilterValue) -> bool {
        let (path, scalar) = match value {
            FilterValue::Literal(s) => (path.to_string(), s),
            FilterValue::Operator(_, s) => (format!("{}.value", path), s),
        };
        if matches!(scalar, Scalar::String(s) if s.contains(QUERY_SEPARATOR)) {
            self.issue(path, "must not contain '^'");
            return false;
        }
        true
    }

    /// Enumerated filter keys only take labels or codes.
    fn enum_operand_ok(&mut self, path: &str, field: &str, value: &FilterValue) -> bool {
        let Some(kind) = FieldKind::for_field(field) else {
            return true;
        };
        let (operator, scalar) = match value {
            FilterValue::Literal(s) => (None, s),
            FilterValue::Operator(op, s) => (Some(*op), s),
        };
        if operator.is_some_and(Operator::is_unary) {
            return true;
        }
        let text = scalar.to_string();
        let accepted = if operator.is_some_and(Operator::is_list) {
            text.split(',').all(|part| kind.accepts(part.trim()))
        } else if operator.is_some_and(|op| {
            matches!(
                op,
                Operator::Like | Operator::StartsWith | Operator::EndsWith | Operator::Contains
            )
        }) {
            true
        } else {
            kind.accepts(&text)
        };

        if !accepted {
            let path = if operator.is_some() {
                format!("{}.value", path)
            } else {
                path.to_string()
            };
            self.issue(
                path,
                format!("must be one of: {}", kind.accepted_values().join(", ")),
            );
        }
        accepted
    }
}

/// Dotted column names such as `assigned_to.name`.
fn is_field_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// ── Normalization ────────────────────────────────────────────────────────

fn normalize_scalar(kind: FieldKind, scalar: Scalar, list: bool) -> Scalar {
    match scalar {
        Scalar::String(s) if list => Scalar::String(
            s.split(',')
                .map(|part| vocabulary::normalize(kind, part.trim()))
                .collect::<Vec<_>>()
                .join(","),
        ),
        Scalar::String(s) => Scalar::String(vocabulary::normalize(kind, &s).to_string()),
        other => other,
    }
}

/// Map labels to codes for every enumerated field in the filter.
fn normalize_filter(filter: FilterExpression) -> FilterExpression {
    let mut normalized = FilterExpression::new();
    for (field, value) in filter.conditions() {
        let value = match FieldKind::for_field(field) {
            None => value.clone(),
            Some(kind) => match value.clone() {
                FilterValue::Literal(s) => FilterValue::Literal(normalize_scalar(kind, s, false)),
                FilterValue::Operator(op, s) => {
                    FilterValue::Operator(op, normalize_scalar(kind, s, op.is_list()))
                }
            },
        };
        normalized.push(field.clone(), value);
    }
    normalized
}
