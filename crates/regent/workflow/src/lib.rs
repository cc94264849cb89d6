//! Regent Workflow - status transition validation
//!
//! A [`StatusWorkflow`] is a fixed, per-record-type adjacency list over
//! status values. A transition is legal iff its edge exists; terminal
//! states have zero outgoing edges. Side effects — timestamp stamps and
//! capacity ledger effects — are declared per edge, not per target state,
//! because the same target reached via different edges needs different
//! effects (cancelling from `pending` stamps a timestamp; cancelling from
//! `confirmed` also releases a seat).
//!
//! Requesting the current status is a no-op, never an error, and never
//! re-runs edge effects.

#![deny(unsafe_code)]

pub mod catalog;

pub use catalog::{
    course_run_workflow, enrollment_workflow, lead_workflow, template_workflow,
};

use regent_types::{RecordData, RecordType, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

// ── Edges ────────────────────────────────────────────────────────────

/// What an admission-governed transition does to the capacity ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityEffect {
    /// Claim a seat (or join the waitlist when full).
    Admit,
    /// Give a committed seat back, promoting the waitlist head.
    Release,
    /// Join the waitlist without claiming a seat.
    Waitlist,
    /// Leave the waitlist.
    DropWaitlisted,
}

/// A data precondition gating an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Precondition {
    /// The field must be present with a numeric value in `min..=max`.
    FieldInRange { field: String, min: f64, max: f64 },
    /// The field must be set.
    FieldSet { field: String },
}

impl Precondition {
    fn check(&self, data: &RecordData) -> Result<(), String> {
        match self {
            Precondition::FieldInRange { field, min, max } => match data.get_f64(field) {
                Some(value) if (*min..=*max).contains(&value) => Ok(()),
                Some(_) => Err(format!("{field} must be within {min}..={max}")),
                None => Err(format!("{field} must be present and within {min}..={max}")),
            },
            Precondition::FieldSet { field } => {
                if data.is_set(field) {
                    Ok(())
                } else {
                    Err(format!("{field} must be set"))
                }
            }
        }
    }
}

/// One legal transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEdge {
    pub from: Status,
    pub to: Status,
    /// Timestamp fields stamped when this edge fires.
    pub stamps: Vec<String>,
    pub preconditions: Vec<Precondition>,
    pub capacity: Option<CapacityEffect>,
}

impl StatusEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Status::new(from),
            to: Status::new(to),
            stamps: Vec::new(),
            preconditions: Vec::new(),
            capacity: None,
        }
    }

    pub fn stamp(mut self, field: impl Into<String>) -> Self {
        self.stamps.push(field.into());
        self
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn capacity(mut self, effect: CapacityEffect) -> Self {
        self.capacity = Some(effect);
        self
    }
}

// ── Workflow ─────────────────────────────────────────────────────────

/// The transition graph for one record type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusWorkflow {
    pub record_type: RecordType,
    pub initial: Status,
    edges: Vec<StatusEdge>,
}

/// The outcome of a legal transition request.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Requested status equals the current one; nothing fires.
    NoOp,
    Move(SideEffects),
}

/// Effects the caller must apply together with the status write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideEffects {
    pub from: Status,
    pub to: Status,
    pub stamps: Vec<String>,
    pub capacity: Option<CapacityEffect>,
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("no transition from {from} to {to} for {record_type}")]
    InvalidTransition {
        record_type: RecordType,
        from: Status,
        to: Status,
    },
    #[error("precondition failed: {reason}")]
    PreconditionFailed { reason: String },
    #[error("unknown status {status} for {record_type}")]
    UnknownStatus {
        record_type: RecordType,
        status: Status,
    },
    #[error("workflow validation failed: {0}")]
    ValidationError(String),
}

impl StatusWorkflow {
    pub fn new(record_type: RecordType, initial: impl Into<String>) -> Self {
        Self {
            record_type,
            initial: Status::new(initial),
            edges: Vec::new(),
        }
    }

    pub fn edge(mut self, edge: StatusEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// All statuses appearing in the graph.
    pub fn states(&self) -> BTreeSet<&Status> {
        let mut states: BTreeSet<&Status> = BTreeSet::new();
        states.insert(&self.initial);
        for edge in &self.edges {
            states.insert(&edge.from);
            states.insert(&edge.to);
        }
        states
    }

    pub fn outgoing(&self, status: &Status) -> impl Iterator<Item = &StatusEdge> {
        self.edges.iter().filter(move |edge| &edge.from == status)
    }

    /// A terminal status has zero outgoing edges.
    pub fn is_terminal(&self, status: &Status) -> bool {
        self.outgoing(status).next().is_none()
    }

    /// Structural validation: no duplicate edges, no self-loop edges (a
    /// same-status request is a no-op, not an edge).
    pub fn validate(&self) -> Result<(), TransitionError> {
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.from == edge.to {
                return Err(TransitionError::ValidationError(format!(
                    "self-loop edge on {}",
                    edge.from
                )));
            }
            if self.edges[..i]
                .iter()
                .any(|prior| prior.from == edge.from && prior.to == edge.to)
            {
                return Err(TransitionError::ValidationError(format!(
                    "duplicate edge {} -> {}",
                    edge.from, edge.to
                )));
            }
        }
        Ok(())
    }

    /// Validate a transition request against the graph and the record's
    /// data, returning the edge's declared side effects.
    pub fn transition(
        &self,
        current: &Status,
        requested: &Status,
        data: &RecordData,
    ) -> Result<Transition, TransitionError> {
        if current == requested {
            return Ok(Transition::NoOp);
        }

        let known = self.states();
        if !known.contains(current) {
            return Err(TransitionError::UnknownStatus {
                record_type: self.record_type,
                status: current.clone(),
            });
        }
        if !known.contains(requested) {
            return Err(TransitionError::UnknownStatus {
                record_type: self.record_type,
                status: requested.clone(),
            });
        }

        let Some(edge) = self
            .edges
            .iter()
            .find(|edge| &edge.from == current && &edge.to == requested)
        else {
            debug!(
                record_type = %self.record_type,
                from = %current,
                to = %requested,
                terminal = self.is_terminal(current),
                "transition rejected"
            );
            return Err(TransitionError::InvalidTransition {
                record_type: self.record_type,
                from: current.clone(),
                to: requested.clone(),
            });
        };

        for precondition in &edge.preconditions {
            precondition
                .check(data)
                .map_err(|reason| TransitionError::PreconditionFailed { reason })?;
        }

        debug!(
            record_type = %self.record_type,
            from = %current,
            to = %requested,
            "transition accepted"
        );
        Ok(Transition::Move(SideEffects {
            from: current.clone(),
            to: requested.clone(),
            stamps: edge.stamps.clone(),
            capacity: edge.capacity,
        }))
    }
}
