//! Regent Engine - the governance facade
//!
//! Regent governs record mutations: role-based access with ownership
//! carve-outs, defense-in-depth field immutability, status workflows with
//! terminal states, and an atomic seat/waitlist allocator, composed behind
//! one entry point the persistence pipeline calls before every write.
//!
//! # Architecture
//!
//! The [`GovernanceEngine`] composes the specialized crates:
//!
//! - `regent-policy` — record-level and field-level access tables
//! - `regent-fields` — the single authoritative immutability enforcer
//! - `regent-workflow` — per-record-type transition graphs
//! - `regent-capacity` — per-resource capacity ledgers and waitlists
//!
//! # Example
//!
//! ```rust
//! use regent_engine::{GovernanceEngine, MutationRequest};
//! use regent_capacity::{CapacityParams, LedgerStore, ResourceId};
//! use regent_policy::StaticCensus;
//! use regent_types::{ActorId, RecordData, RecordType, Role};
//! use std::sync::Arc;
//!
//! let ledgers = Arc::new(LedgerStore::new());
//! ledgers.register(ResourceId::new("run-1"), CapacityParams::new(25));
//! let engine = GovernanceEngine::with_defaults(ledgers, Arc::new(StaticCensus(1)));
//!
//! let mut incoming = RecordData::new();
//! incoming.set("course_run", "run-1");
//! incoming.set("total_amount", 1500.0);
//!
//! let approved = engine
//!     .authorize_and_apply(MutationRequest::create(
//!         Role::Advisor,
//!         Some(ActorId::new("advisor-1")),
//!         RecordType::Enrollment,
//!         incoming,
//!     ))
//!     .unwrap();
//!
//! assert_eq!(approved.data.get_str("status"), Some("pending"));
//! assert_eq!(approved.data.get_str("created_by"), Some("advisor-1"));
//! assert_eq!(approved.data.get_str("payment_status"), Some("unpaid"));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod duplicate;
pub mod engine;
pub mod financial;

pub use config::{CapacityBinding, GeneratedId, GovernanceConfig, RecordGovernance};
pub use duplicate::{DuplicateAction, DuplicateLeadPolicy, DuplicateResolution};
pub use engine::{
    ApprovedMutation, CapacityResolution, Denial, GovernanceEngine, MutationRequest, StatusChange,
};
pub use financial::FinancialRules;
