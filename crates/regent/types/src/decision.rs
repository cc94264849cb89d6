//! Governance decisions.
//!
//! A record-level evaluation yields a [`Decision`]; ownership- and
//! visibility-scoped roles get [`Decision::AllowWithFilter`], whose
//! [`RecordFilter`] the persistence layer must apply at query time. The
//! filter is not a per-record boolean gate checked after the fact — that
//! would leak existence information and scale poorly.

use crate::record::{ActorId, Record};
use serde::{Deserialize, Serialize};

/// The outcome of a record-level policy evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Not permitted. Callers surface a generic "forbidden" with no detail
    /// on which rule triggered.
    Deny,
    /// Permitted unconditionally.
    Allow,
    /// Permitted for the subset of records matching the filter; the caller
    /// applies the filter at query time.
    AllowWithFilter(RecordFilter),
}

impl Decision {
    /// Whether the decision permits the operation at all.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny)
    }

    /// Resolve the decision against a concrete record.
    pub fn permits(&self, record: &Record) -> bool {
        match self {
            Decision::Deny => false,
            Decision::Allow => true,
            Decision::AllowWithFilter(filter) => filter.matches(record),
        }
    }
}

/// A query-time predicate scoping which records a role may touch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFilter {
    /// The record's creator must be the acting principal.
    OwnerIs(ActorId),
    /// The record must be assigned to the acting principal, or unassigned.
    AssignedToOrUnassigned(ActorId),
    /// Only records in the explicitly published state.
    PublishedOnly,
    /// Only records not soft-deleted.
    ActiveOnly,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordFilter::OwnerIs(actor) => record.owner.as_ref() == Some(actor),
            RecordFilter::AssignedToOrUnassigned(actor) => match &record.assigned_to {
                Some(assignee) => assignee == actor,
                None => true,
            },
            RecordFilter::PublishedOnly => {
                record.data.get_str("status") == Some("published")
                    || record.data.get_bool("published") == Some(true)
            }
            RecordFilter::ActiveOnly => record.active,
        }
    }
}

/// How a denied field write is handled, configured per field: some fields
/// reject the whole write, others are silently dropped from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationMode {
    /// Drop the field from the write and continue.
    Strip,
    /// Reject the entire write.
    Reject,
}

/// The outcome of a field-level policy evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldDecision {
    Allow,
    Deny(ViolationMode),
}

impl FieldDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, FieldDecision::Allow)
    }
}
