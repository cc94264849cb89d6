//! The per-resource capacity ledger.
//!
//! The ledger itself is single-threaded state; the store wraps each one in
//! its own lock. Waitlist positions are always the live 1..N ranks derived
//! from the ordered list, so removals renumber implicitly and the sequence
//! never has gaps.

use crate::{ClaimId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Static capacity configuration for a resource.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CapacityParams {
    pub max_capacity: u32,
    /// Whether the resource accepts new claims at all. A closed resource
    /// rejects admissions instead of waitlisting them.
    pub open: bool,
}

impl CapacityParams {
    pub fn new(max_capacity: u32) -> Self {
        Self {
            max_capacity,
            open: true,
        }
    }

    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }
}

/// What an admission request resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionOutcome {
    Committed,
    /// Waitlisted at the given 1-based position.
    Waitlisted(u32),
    /// The resource is closed to intake.
    Rejected,
}

/// An admission result, flagged when it is a replay of a recorded claim or
/// came through the overbooking path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub outcome: AdmissionOutcome,
    pub replayed: bool,
    pub overbooked: bool,
}

/// A release result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Whether a committed seat was actually given back.
    pub released: bool,
    /// The waitlisted claim promoted into the freed seat, if any.
    pub promoted: Option<ClaimId>,
}

/// How the journal remembers a claim; positions are never journaled
/// because they shift as the waitlist drains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum ClaimState {
    Committed,
    Waitlisted,
    Rejected,
}

/// Committed/maximum counter plus ordered waitlist for one resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapacityLedger {
    resource: ResourceId,
    max_capacity: u32,
    committed: u32,
    open: bool,
    waitlist: Vec<ClaimId>,
    claims: HashMap<ClaimId, ClaimState>,
}

impl CapacityLedger {
    pub fn new(resource: ResourceId, params: CapacityParams) -> Self {
        Self {
            resource,
            max_capacity: params.max_capacity,
            committed: 0,
            open: params.open,
            waitlist: Vec::new(),
            claims: HashMap::new(),
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn committed(&self) -> u32 {
        self.committed
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Raise or lower the maximum. Lowering never evicts committed claims;
    /// the ledger simply stops admitting until releases catch up.
    pub fn set_max_capacity(&mut self, max: u32) {
        self.max_capacity = max;
    }

    pub fn waitlist(&self) -> &[ClaimId] {
        &self.waitlist
    }

    /// The claim's live 1-based waitlist position.
    pub fn position(&self, claim: &ClaimId) -> Option<u32> {
        self.waitlist
            .iter()
            .position(|entry| entry == claim)
            .map(|index| index as u32 + 1)
    }

    /// Admit a claim, or waitlist it when the resource is full.
    pub fn request_admission(&mut self, claim: &ClaimId) -> Admission {
        match self.claims.get(claim) {
            Some(ClaimState::Committed) => {
                debug!(resource = %self.resource, %claim, "admission replayed");
                return Admission {
                    outcome: AdmissionOutcome::Committed,
                    replayed: true,
                    overbooked: false,
                };
            }
            Some(ClaimState::Waitlisted) => {
                // A waitlisted claim re-requesting admission takes a freed
                // seat if one exists; otherwise it keeps its place.
                if self.committed < self.max_capacity {
                    self.waitlist.retain(|entry| entry != claim);
                    self.committed += 1;
                    self.claims.insert(claim.clone(), ClaimState::Committed);
                    info!(resource = %self.resource, %claim, "waitlisted claim admitted");
                    return Admission {
                        outcome: AdmissionOutcome::Committed,
                        replayed: false,
                        overbooked: false,
                    };
                }
                let position = self.position(claim).unwrap_or(1);
                debug!(resource = %self.resource, %claim, position, "admission replayed");
                return Admission {
                    outcome: AdmissionOutcome::Waitlisted(position),
                    replayed: true,
                    overbooked: false,
                };
            }
            Some(ClaimState::Rejected) => {
                return Admission {
                    outcome: AdmissionOutcome::Rejected,
                    replayed: true,
                    overbooked: false,
                };
            }
            None => {}
        }

        if !self.open {
            debug!(resource = %self.resource, %claim, "admission rejected, intake closed");
            self.claims.insert(claim.clone(), ClaimState::Rejected);
            return Admission {
                outcome: AdmissionOutcome::Rejected,
                replayed: false,
                overbooked: false,
            };
        }

        if self.committed < self.max_capacity {
            self.committed += 1;
            self.claims.insert(claim.clone(), ClaimState::Committed);
            debug!(resource = %self.resource, %claim, committed = self.committed, "claim committed");
            Admission {
                outcome: AdmissionOutcome::Committed,
                replayed: false,
                overbooked: false,
            }
        } else {
            self.waitlist.push(claim.clone());
            self.claims.insert(claim.clone(), ClaimState::Waitlisted);
            let position = self.waitlist.len() as u32;
            debug!(resource = %self.resource, %claim, position, "claim waitlisted");
            Admission {
                outcome: AdmissionOutcome::Waitlisted(position),
                replayed: false,
                overbooked: false,
            }
        }
    }

    /// Join the waitlist without contending for a seat.
    pub fn join_waitlist(&mut self, claim: &ClaimId) -> Admission {
        match self.claims.get(claim) {
            Some(ClaimState::Committed) => {
                return Admission {
                    outcome: AdmissionOutcome::Committed,
                    replayed: true,
                    overbooked: false,
                };
            }
            Some(ClaimState::Waitlisted) => {
                let position = self.position(claim).unwrap_or(1);
                return Admission {
                    outcome: AdmissionOutcome::Waitlisted(position),
                    replayed: true,
                    overbooked: false,
                };
            }
            _ => {}
        }

        if !self.open {
            self.claims.insert(claim.clone(), ClaimState::Rejected);
            return Admission {
                outcome: AdmissionOutcome::Rejected,
                replayed: false,
                overbooked: false,
            };
        }

        self.waitlist.push(claim.clone());
        self.claims.insert(claim.clone(), ClaimState::Waitlisted);
        Admission {
            outcome: AdmissionOutcome::Waitlisted(self.waitlist.len() as u32),
            replayed: false,
            overbooked: false,
        }
    }

    /// The explicitly flagged reservation path that may exceed capacity.
    pub fn reserve_overbooked(&mut self, claim: &ClaimId) -> Admission {
        if let Some(ClaimState::Committed) = self.claims.get(claim) {
            return Admission {
                outcome: AdmissionOutcome::Committed,
                replayed: true,
                overbooked: self.committed > self.max_capacity,
            };
        }

        self.waitlist.retain(|entry| entry != claim);
        self.committed += 1;
        self.claims.insert(claim.clone(), ClaimState::Committed);
        let overbooked = self.committed > self.max_capacity;
        if overbooked {
            warn!(
                resource = %self.resource,
                %claim,
                committed = self.committed,
                max = self.max_capacity,
                "overbooked reservation committed"
            );
        }
        Admission {
            outcome: AdmissionOutcome::Committed,
            replayed: false,
            overbooked,
        }
    }

    /// Give a claim's seat back, or drop it from the waitlist. Frees at
    /// most one seat; a freed seat promotes the waitlist head.
    pub fn release(&mut self, claim: &ClaimId) -> Release {
        let state = self.claims.get(claim).copied();
        match state {
            Some(ClaimState::Committed) => {
                // Floored at zero, never negative.
                self.committed = self.committed.saturating_sub(1);
                self.claims.remove(claim);
                debug!(resource = %self.resource, %claim, committed = self.committed, "claim released");

                let promoted = if self.committed < self.max_capacity {
                    self.promote_head()
                } else {
                    None
                };
                Release {
                    released: true,
                    promoted,
                }
            }
            Some(ClaimState::Waitlisted) => {
                self.waitlist.retain(|entry| entry != claim);
                self.claims.remove(claim);
                debug!(resource = %self.resource, %claim, "waitlisted claim dropped");
                Release {
                    released: false,
                    promoted: None,
                }
            }
            _ => Release {
                released: false,
                promoted: None,
            },
        }
    }

    fn promote_head(&mut self) -> Option<ClaimId> {
        if self.waitlist.is_empty() {
            return None;
        }
        let head = self.waitlist.remove(0);
        self.committed += 1;
        self.claims.insert(head.clone(), ClaimState::Committed);
        info!(resource = %self.resource, claim = %head, "waitlist head promoted");
        Some(head)
    }
}
