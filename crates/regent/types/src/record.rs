//! Governed records and their dynamic field data.
//!
//! The engine governs heterogeneous record shapes (enrollments carry
//! financial and academic fields, templates carry versioning fields), so a
//! record's fields are a dynamic map of name to JSON value. The snapshot
//! type [`Record`] adds the identity, ownership, and liveness attributes the
//! policy layer keys on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ── Identifiers ──────────────────────────────────────────────────────

/// Identity of an authenticated actor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a governed record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workflow status value. Statuses are per-record-type strings; the
/// workflow graph for the type decides which values and transitions exist.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Status(pub String);

impl Status {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Record types ─────────────────────────────────────────────────────

/// The governed record types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Enrollment,
    Lead,
    Template,
    CourseRun,
    Media,
    Faq,
    User,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::Enrollment,
        RecordType::Lead,
        RecordType::Template,
        RecordType::CourseRun,
        RecordType::Media,
        RecordType::Faq,
        RecordType::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Enrollment => "enrollments",
            RecordType::Lead => "leads",
            RecordType::Template => "templates",
            RecordType::CourseRun => "course_runs",
            RecordType::Media => "media",
            RecordType::Faq => "faqs",
            RecordType::User => "users",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Record data ──────────────────────────────────────────────────────

/// Dynamic field data: field name to JSON value.
///
/// A field is *set* when it is present with a non-null, non-empty-string
/// value. Immutability and trigger rules key on that distinction — a null
/// or empty value behaves like an absent one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordData(pub HashMap<String, Value>);

impl RecordData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The field's value, only when it is set (non-null, non-empty).
    pub fn get_set(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| value_is_set(v))
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get_set(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get_set(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get_set(field).and_then(Value::as_bool)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.get_set(field).is_some()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of this data, the overlay winning per field.
    pub fn merged_with(&self, other: &RecordData) -> RecordData {
        let mut merged = self.clone();
        for (field, value) in &other.0 {
            merged.0.insert(field.clone(), value.clone());
        }
        merged
    }
}

fn value_is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

impl From<HashMap<String, Value>> for RecordData {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for RecordData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Record snapshot ──────────────────────────────────────────────────

/// A snapshot of a governed record, as the persistence layer knows it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: RecordType,
    /// The creator reference. `None` for records created anonymously
    /// (public lead intake).
    pub owner: Option<ActorId>,
    /// The staff member the record is assigned to, where applicable.
    pub assigned_to: Option<ActorId>,
    /// Soft-delete flag: inactive records are hidden, not destroyed.
    pub active: bool,
    pub data: RecordData,
}

impl Record {
    pub fn new(id: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            id: RecordId::new(id),
            record_type,
            owner: None,
            assigned_to: None,
            active: true,
            data: RecordData::new(),
        }
    }

    pub fn with_owner(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_assigned_to(mut self, assignee: ActorId) -> Self {
        self.assigned_to = Some(assignee);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.data.set("status", Value::String(status.into()));
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.set(field, value);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The record's current workflow status, if it carries one.
    pub fn status(&self) -> Option<Status> {
        self.data.get_str("status").map(Status::new)
    }
}
