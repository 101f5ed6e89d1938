//! Encoded-query filter model.
//!
//! A [`FilterExpression`] is an ordered list of `field -> value` conditions that
//! serializes to ServiceNow's encoded query grammar (`priority<=3^state=2`).
//! Conditions are implicitly ANDed; the grammar has no OR or grouping here.

use std::fmt;
use std::str::FromStr;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `LIKE`
    Like,
    /// `STARTSWITH`
    StartsWith,
    /// `ENDSWITH`
    EndsWith,
    /// `CONTAINS`
    Contains,
    /// `IN`, comma-separated operand.
    In,
    /// `NOT IN`, comma-separated operand.
    NotIn,
    /// `ISEMPTY`, no operand.
    IsEmpty,
    /// `ISNOTEMPTY`, no operand.
    IsNotEmpty,
}

impl Operator {
    /// Operator text as it appears in an encoded query.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::StartsWith => "STARTSWITH",
            Self::EndsWith => "ENDSWITH",
            Self::Contains => "CONTAINS",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsEmpty => "ISEMPTY",
            Self::IsNotEmpty => "ISNOTEMPTY",
        }
    }

    /// Operators that take no operand.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    /// Operators whose operand is a comma-separated list.
    pub fn is_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// All operator spellings accepted on input, for schemas and error messages.
    pub fn accepted() -> &'static [&'static str] {
        &[
            "=", "!=", ">", ">=", "<", "<=", "LIKE", "STARTSWITH", "ENDSWITH", "CONTAINS", "IN",
            "NOT IN", "ISEMPTY", "ISNOTEMPTY",
        ]
    }
}

impl FromStr for Operator {
    type Err = String;

    /// Accepts either the encoded-query symbol or the enum-style name
    /// (`"<="` / `"LTE"`, `"NOT IN"` / `"NOT_IN"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" | "EQ" => Self::Eq,
            "!=" | "NEQ" => Self::Neq,
            ">" | "GT" => Self::Gt,
            ">=" | "GTE" => Self::Gte,
            "<" | "LT" => Self::Lt,
            "<=" | "LTE" => Self::Lte,
            "LIKE" => Self::Like,
            "STARTSWITH" => Self::StartsWith,
            "ENDSWITH" => Self::EndsWith,
            "CONTAINS" => Self::Contains,
            "IN" => Self::In,
            "NOT IN" | "NOT_IN" | "NOTIN" => Self::NotIn,
            "ISEMPTY" | "IS_EMPTY" => Self::IsEmpty,
            "ISNOTEMPTY" | "IS_NOT_EMPTY" => Self::IsNotEmpty,
            other => return Err(format!("unknown operator '{}'", other)),
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single filter operand. Never a list or object.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Text operand, emitted verbatim.
    String(String),
    /// Numeric operand in its JSON text form.
    Number(serde_json::Number),
    /// `true` / `false`.
    Bool(bool),
}

impl Scalar {
    /// Convert a JSON value, rejecting null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Number(n) => Some(Self::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Plain equality: `field=value`.
    Literal(Scalar),
    /// `field<op>value`.
    Operator(Operator, Scalar),
}

/// Ordered set of ANDed conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    conditions: Vec<(String, FilterValue)>,
}

impl FilterExpression {
    /// Empty filter, matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single equality condition, the shape used for number lookups.
    pub fn equals(field: &str, value: impl Into<Scalar>) -> Self {
        let mut filter = Self::new();
        filter.push(field, FilterValue::Literal(value.into()));
        filter
    }

    /// Append a condition. Field names must be non-empty; the validator
    /// guarantees this for caller-supplied filters.
    pub fn push(&mut self, field: impl Into<String>, value: FilterValue) {
        let field = field.into();
        debug_assert!(!field.is_empty(), "filter field names must be non-empty");
        self.conditions.push((field, value));
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Conditions in insertion order.
    pub fn conditions(&self) -> &[(String, FilterValue)] {
        &self.conditions
    }

    /// Encoded-query text. Empty for an empty filter; callers then omit
    /// `sysparm_query` altogether.
    pub fn serialize(&self) -> String {
        self.conditions
            .iter()
            .map(|(field, value)| match value {
                FilterValue::Literal(v) => format!("{}={}", field, v),
                FilterValue::Operator(op, v) => format!("{}{}{}", field, op.symbol(), v),
            })
            .collect::<Vec<_>>()
            .join("^")
    }

    /// `None` for an empty filter, so the query parameter is dropped.
    pub fn to_query(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.serialize())
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
