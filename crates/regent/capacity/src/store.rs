//! The ledger store: per-resource exclusion, no ambient globals.
//!
//! The store is explicit, injected state with clear init/reset semantics
//! for tests. Each resource's ledger sits behind its own lock inside a
//! sharded map, so the critical section spans exactly one resource and
//! concurrent requests against different resources proceed in parallel.

use crate::ledger::{Admission, CapacityLedger, CapacityParams, Release};
use crate::{ClaimId, ResourceId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no capacity ledger registered for resource {0}")]
    UnknownResource(ResourceId),
    #[error("capacity ledger for resource {0} is poisoned")]
    Poisoned(ResourceId),
}

/// A point-in-time copy of a ledger, for callers and tests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub resource: ResourceId,
    pub max_capacity: u32,
    pub committed: u32,
    pub open: bool,
    pub waitlist: Vec<ClaimId>,
}

/// All capacity ledgers, keyed by resource.
#[derive(Default)]
pub struct LedgerStore {
    ledgers: DashMap<ResourceId, Arc<Mutex<CapacityLedger>>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource's ledger. Re-registering an existing resource
    /// keeps the live ledger; capacity changes go through `update_params`.
    pub fn register(&self, resource: ResourceId, params: CapacityParams) {
        self.ledgers
            .entry(resource.clone())
            .or_insert_with(|| Arc::new(Mutex::new(CapacityLedger::new(resource, params))));
    }

    pub fn is_registered(&self, resource: &ResourceId) -> bool {
        self.ledgers.contains_key(resource)
    }

    /// Drop every ledger. Test and bootstrap hook.
    pub fn reset(&self) {
        self.ledgers.clear();
    }

    pub fn update_params(
        &self,
        resource: &ResourceId,
        params: CapacityParams,
    ) -> Result<(), LedgerError> {
        self.with_ledger(resource, |ledger| {
            ledger.set_max_capacity(params.max_capacity);
            ledger.set_open(params.open);
        })
    }

    pub fn request_admission(
        &self,
        resource: &ResourceId,
        claim: &ClaimId,
    ) -> Result<Admission, LedgerError> {
        self.with_ledger(resource, |ledger| ledger.request_admission(claim))
    }

    pub fn join_waitlist(
        &self,
        resource: &ResourceId,
        claim: &ClaimId,
    ) -> Result<Admission, LedgerError> {
        self.with_ledger(resource, |ledger| ledger.join_waitlist(claim))
    }

    pub fn reserve_overbooked(
        &self,
        resource: &ResourceId,
        claim: &ClaimId,
    ) -> Result<Admission, LedgerError> {
        self.with_ledger(resource, |ledger| ledger.reserve_overbooked(claim))
    }

    pub fn release(&self, resource: &ResourceId, claim: &ClaimId) -> Result<Release, LedgerError> {
        self.with_ledger(resource, |ledger| ledger.release(claim))
    }

    pub fn snapshot(&self, resource: &ResourceId) -> Result<LedgerSnapshot, LedgerError> {
        self.with_ledger(resource, |ledger| LedgerSnapshot {
            resource: ledger.resource().clone(),
            max_capacity: ledger.max_capacity(),
            committed: ledger.committed(),
            open: ledger.is_open(),
            waitlist: ledger.waitlist().to_vec(),
        })
    }

    /// Run `f` inside the resource's critical section.
    fn with_ledger<T>(
        &self,
        resource: &ResourceId,
        f: impl FnOnce(&mut CapacityLedger) -> T,
    ) -> Result<T, LedgerError> {
        let ledger = self
            .ledgers
            .get(resource)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::UnknownResource(resource.clone()))?;

        let mut guard = ledger
            .lock()
            .map_err(|_| LedgerError::Poisoned(resource.clone()))?;
        Ok(f(&mut guard))
    }
}
