//! Regent Capacity - seat admission and waitlists
//!
//! Each finite-seat resource (a course run) has a [`CapacityLedger`]:
//! committed count against a maximum, plus an ordered waitlist. Admission
//! is a single atomic step — read, decide, mutate under one lock — so two
//! concurrent requests for the last open seat cannot both commit. The
//! [`LedgerStore`] shards ledgers per resource; requests against different
//! resources never contend.
//!
//! Admission is idempotent per claim: a replayed claim returns its recorded
//! outcome instead of double-counting. Overbooking is representable, but
//! only through the explicitly flagged reservation path, never as the
//! output of a normal admission.

#![deny(unsafe_code)]

pub mod ledger;
pub mod store;

pub use ledger::{Admission, AdmissionOutcome, CapacityLedger, CapacityParams, Release};
pub use store::{LedgerError, LedgerSnapshot, LedgerStore};

use serde::{Deserialize, Serialize};

/// Identity of a finite-seat resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A claim's correlation identity, supplied by the caller so crashed
/// requests can be replayed without double-counting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
