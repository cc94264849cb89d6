//! Duplicate-lead window policy.
//!
//! The production system quietly updated an existing lead when the same
//! email re-submitted within 24 hours. Whether that is product behavior or
//! a workaround is ambiguous, so it stays configurable: the window and the
//! on-duplicate action are policy, not code. The engine only decides; the
//! persistence layer supplies the most recent matching lead and applies
//! the resolution.

use chrono::{DateTime, Duration, Utc};
use regent_types::RecordId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a submission that falls inside the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    /// Fold the submission into the existing lead.
    UpdateExisting,
    /// Reject the submission outright.
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateLeadPolicy {
    pub window_secs: u64,
    pub on_duplicate: DuplicateAction,
}

impl Default for DuplicateLeadPolicy {
    fn default() -> Self {
        Self {
            window_secs: 24 * 60 * 60,
            on_duplicate: DuplicateAction::UpdateExisting,
        }
    }
}

/// How the caller should proceed with a lead submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DuplicateResolution {
    CreateNew,
    UpdateExisting(RecordId),
    Reject(RecordId),
}

impl DuplicateLeadPolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    /// Resolve a submission against the most recent lead for the same
    /// email, if the persistence layer found one.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        most_recent: Option<(&RecordId, DateTime<Utc>)>,
    ) -> DuplicateResolution {
        let Some((id, created_at)) = most_recent else {
            return DuplicateResolution::CreateNew;
        };

        if now.signed_duration_since(created_at) >= self.window() {
            return DuplicateResolution::CreateNew;
        }

        debug!(lead = %id, "duplicate lead inside window");
        match self.on_duplicate {
            DuplicateAction::UpdateExisting => DuplicateResolution::UpdateExisting(id.clone()),
            DuplicateAction::Reject => DuplicateResolution::Reject(id.clone()),
        }
    }
}
