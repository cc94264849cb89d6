//! Regent Types - shared vocabulary for the record governance engine
//!
//! Every governed write flows through the same vocabulary: an actor with a
//! [`Role`] performs an [`Operation`] on a [`Record`] of some [`RecordType`],
//! and the engine answers with a [`Decision`]. These types carry no behavior
//! beyond what is needed to state the question and the answer; the policy
//! tables, immutability rules, workflow graphs, and capacity ledgers that
//! produce the answers live in their own crates.

#![deny(unsafe_code)]

pub mod decision;
pub mod record;
pub mod role;

pub use decision::{Decision, FieldDecision, RecordFilter, ViolationMode};
pub use record::{ActorId, Record, RecordData, RecordId, RecordType, Status};
pub use role::{FieldOperation, Operation, Role};
