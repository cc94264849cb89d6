//! Shared fixtures for the Regent conformance suite.
//!
//! The suite drives the assembled engine the way a persistence pipeline
//! would: stored snapshots in, approved mutations out, with the ledger
//! store as the only shared state.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use regent_capacity::{CapacityParams, LedgerStore, ResourceId};
use regent_engine::GovernanceEngine;
use regent_policy::StaticCensus;
use regent_types::{ActorId, Record, RecordType};
use serde_json::json;
use std::sync::Arc;

/// A fixed clock for deterministic stamps.
pub fn fixed_now() -> DateTime<Utc> {
    "2025-03-01T10:00:00Z"
        .parse()
        .unwrap_or_else(|_| Utc::now())
}

/// An engine on the default configuration with one registered course run.
pub fn engine_with_run(resource: &str, seats: u32) -> Arc<GovernanceEngine> {
    let ledgers = Arc::new(LedgerStore::new());
    ledgers.register(ResourceId::new(resource), CapacityParams::new(seats));
    Arc::new(GovernanceEngine::with_defaults(
        ledgers,
        Arc::new(StaticCensus(2)),
    ))
}

/// A stored enrollment snapshot in the given status.
pub fn stored_enrollment(id: &str, run: &str, status: &str) -> Record {
    Record::new(id, RecordType::Enrollment)
        .with_owner(ActorId::new("advisor-1"))
        .with_field("enrollment_id", id)
        .with_field("created_by", "advisor-1")
        .with_field("enrolled_at", "2025-01-01T00:00:00+00:00")
        .with_field("course_run", run)
        .with_field("total_amount", json!(1500.0))
        .with_status(status)
}

/// A stored marketing template owned by the given actor.
pub fn stored_template(id: &str, owner: &str) -> Record {
    Record::new(id, RecordType::Template)
        .with_owner(ActorId::new(owner))
        .with_field("created_by", owner)
        .with_field("name", format!("template-{id}"))
        .with_status("active")
}
