//! Label/code vocabulary for incident classification fields.
//!
//! ServiceNow stores `state`, `priority`, `urgency` and `impact` as numeric codes.
//! Agents tend to speak in labels ("Critical", "In Progress"), so every value for
//! these fields passes through [`normalize`] before it reaches the table API, and
//! [`label`] maps codes back for display.

/// Semantic kind of an enumerated incident field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Incident lifecycle state.
    State,
    /// Computed or explicit priority.
    Priority,
    /// Urgency and impact share one table.
    Severity,
}

const STATE: &[(&str, &str)] = &[
    ("New", "1"),
    ("In Progress", "2"),
    ("On Hold", "3"),
    ("Resolved", "6"),
    ("Closed", "7"),
    ("Canceled", "8"),
];

const PRIORITY: &[(&str, &str)] = &[
    ("Critical", "1"),
    ("High", "2"),
    ("Moderate", "3"),
    ("Low", "4"),
    ("Planning", "5"),
];

const SEVERITY: &[(&str, &str)] = &[("High", "1"), ("Medium", "2"), ("Low", "3")];

impl FieldKind {
    /// Kind of the named incident field, if it is enumerated.
    pub fn for_field(field: &str) -> Option<Self> {
        match field {
            "state" => Some(Self::State),
            "priority" => Some(Self::Priority),
            "urgency" | "impact" => Some(Self::Severity),
            _ => None,
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::State => STATE,
            Self::Priority => PRIORITY,
            Self::Severity => SEVERITY,
        }
    }

    /// Every accepted input value: labels first, then codes.
    pub fn accepted_values(self) -> Vec<&'static str> {
        let table = self.table();
        table
            .iter()
            .map(|(label, _)| *label)
            .chain(table.iter().map(|(_, code)| *code))
            .collect()
    }

    /// Whether `raw` is a known label or code for this kind.
    pub fn accepts(self, raw: &str) -> bool {
        self.table()
            .iter()
            .any(|(label, code)| *label == raw || *code == raw)
    }
}

/// Map a label to its code. Codes and unknown values come back unchanged.
pub fn normalize(kind: FieldKind, raw: &str) -> &str {
    kind.table()
        .iter()
        .find(|(label, _)| *label == raw)
        .map_or(raw, |(_, code)| *code)
}

/// Reverse lookup of a code's label.
pub fn label(kind: FieldKind, code: &str) -> Option<&'static str> {
    kind.table()
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(label, _)| *label)
}
