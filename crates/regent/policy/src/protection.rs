//! Account self-protection rules.
//!
//! User accounts get guards the policy table cannot express: an actor never
//! deletes their own account, never changes their own role, and no
//! operation may leave the system without an admin. The admin population is
//! consulted through the [`AdminCensus`] invariant query rather than a
//! hardcoded count, so the persistence layer stays the source of truth.

use regent_types::{ActorId, Operation, Record, RecordData, RecordType};
use tracing::debug;

/// Invariant query over the user store: how many active admins exist
/// besides the given actor.
pub trait AdminCensus: Send + Sync {
    fn admins_besides(&self, actor: &ActorId) -> usize;
}

/// Fixed-count census for tests and bootstrap.
#[derive(Clone, Copy, Debug)]
pub struct StaticCensus(pub usize);

impl AdminCensus for StaticCensus {
    fn admins_besides(&self, _actor: &ActorId) -> usize {
        self.0
    }
}

/// Whether the self-protection rules veto this operation. Only user-account
/// records are subject to them.
pub fn account_protection_denies(
    actor: &ActorId,
    operation: Operation,
    record: &Record,
    incoming: Option<&RecordData>,
    census: &dyn AdminCensus,
) -> bool {
    if record.record_type != RecordType::User {
        return false;
    }

    let target_is_self = record.id.as_str() == actor.as_str();
    let target_is_admin = record.data.get_str("role") == Some("admin");

    match operation {
        Operation::Delete => {
            if target_is_self {
                debug!(record = %record.id, "self-delete denied");
                return true;
            }
            if target_is_admin {
                let target = ActorId::new(record.id.as_str());
                if census.admins_besides(&target) == 0 {
                    debug!(record = %record.id, "deleting the last admin denied");
                    return true;
                }
            }
            false
        }
        Operation::Update => {
            let Some(incoming) = incoming else {
                return false;
            };

            let role_change = incoming
                .get_str("role")
                .is_some_and(|new_role| record.data.get_str("role") != Some(new_role));
            if role_change && target_is_self {
                debug!(record = %record.id, "own-role change denied");
                return true;
            }

            let demotes_admin =
                role_change && target_is_admin && incoming.get_str("role") != Some("admin");
            let deactivates = incoming.get_bool("active") == Some(false);
            if target_is_admin && (demotes_admin || deactivates) {
                let target = ActorId::new(record.id.as_str());
                if census.admins_besides(&target) == 0 {
                    debug!(record = %record.id, "removing the last admin denied");
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}
