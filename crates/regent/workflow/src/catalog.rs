//! Default workflow graphs for the governed record types.

use crate::{CapacityEffect, Precondition, StatusEdge, StatusWorkflow};
use regent_types::RecordType;

fn grade_range(field: &str) -> Precondition {
    Precondition::FieldInRange {
        field: field.to_string(),
        min: 0.0,
        max: 100.0,
    }
}

/// Enrollment lifecycle. `completed` is terminal; the two revert edges
/// (`cancelled -> pending`, `withdrawn -> confirmed`) are modeled
/// explicitly because re-activation is a real administrative flow.
pub fn enrollment_workflow() -> StatusWorkflow {
    StatusWorkflow::new(RecordType::Enrollment, "pending")
        .edge(
            StatusEdge::new("pending", "confirmed")
                .stamp("confirmed_at")
                .capacity(CapacityEffect::Admit),
        )
        .edge(StatusEdge::new("pending", "waitlisted").capacity(CapacityEffect::Waitlist))
        .edge(StatusEdge::new("pending", "cancelled").stamp("cancelled_at"))
        .edge(
            StatusEdge::new("confirmed", "completed")
                .stamp("completed_at")
                .require(grade_range("attendance_percentage"))
                .require(grade_range("final_grade")),
        )
        .edge(
            StatusEdge::new("confirmed", "cancelled")
                .stamp("cancelled_at")
                .capacity(CapacityEffect::Release),
        )
        .edge(
            StatusEdge::new("confirmed", "withdrawn")
                .stamp("cancelled_at")
                .capacity(CapacityEffect::Release),
        )
        .edge(
            StatusEdge::new("waitlisted", "confirmed")
                .stamp("confirmed_at")
                .capacity(CapacityEffect::Admit),
        )
        .edge(
            StatusEdge::new("waitlisted", "cancelled")
                .stamp("cancelled_at")
                .capacity(CapacityEffect::DropWaitlisted),
        )
        .edge(StatusEdge::new("cancelled", "pending"))
        .edge(
            StatusEdge::new("withdrawn", "confirmed")
                .stamp("confirmed_at")
                .capacity(CapacityEffect::Admit),
        )
}

/// Lead conversion funnel. `converted` and `lost` are terminal;
/// `unqualified` keeps a re-engagement edge back to `contacted`.
pub fn lead_workflow() -> StatusWorkflow {
    StatusWorkflow::new(RecordType::Lead, "new")
        .edge(StatusEdge::new("new", "contacted"))
        .edge(StatusEdge::new("new", "unqualified"))
        .edge(StatusEdge::new("new", "lost"))
        .edge(StatusEdge::new("contacted", "qualified"))
        .edge(StatusEdge::new("contacted", "unqualified"))
        .edge(StatusEdge::new("contacted", "lost"))
        .edge(StatusEdge::new("qualified", "converted").stamp("converted_at"))
        .edge(StatusEdge::new("qualified", "lost"))
        .edge(StatusEdge::new("unqualified", "contacted"))
}

/// Template lifecycle. `archived` is terminal and stamps `archived_at`.
pub fn template_workflow() -> StatusWorkflow {
    StatusWorkflow::new(RecordType::Template, "draft")
        .edge(StatusEdge::new("draft", "active"))
        .edge(StatusEdge::new("draft", "archived").stamp("archived_at"))
        .edge(StatusEdge::new("active", "archived").stamp("archived_at"))
}

/// Course run lifecycle. Both `completed` and `cancelled` are terminal.
pub fn course_run_workflow() -> StatusWorkflow {
    StatusWorkflow::new(RecordType::CourseRun, "draft")
        .edge(StatusEdge::new("draft", "published").stamp("published_at"))
        .edge(StatusEdge::new("draft", "cancelled"))
        .edge(StatusEdge::new("published", "enrollment_open"))
        .edge(StatusEdge::new("published", "cancelled"))
        .edge(StatusEdge::new("enrollment_open", "in_progress"))
        .edge(StatusEdge::new("enrollment_open", "cancelled"))
        .edge(StatusEdge::new("in_progress", "completed"))
        .edge(StatusEdge::new("in_progress", "cancelled"))
}
