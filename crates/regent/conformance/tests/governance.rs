//! Policy, immutability, and workflow properties through the facade.

use regent_conformance::{engine_with_run, fixed_now, stored_enrollment, stored_template};
use regent_engine::{Denial, MutationRequest};
use regent_types::{ActorId, RecordData, Role};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("regent=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn marketing_updates_own_template_only() {
    init_tracing();
    let engine = engine_with_run("run-1", 5);
    let actor = ActorId::new("42");
    let mut patch = RecordData::new();
    patch.set("name", "renamed");

    let own = stored_template("t-1", "42");
    let approved = engine.authorize_and_apply_at(
        MutationRequest::update(Role::Marketing, Some(actor.clone()), own, patch.clone()),
        fixed_now(),
    );
    assert!(approved.is_ok());

    let foreign = stored_template("t-2", "7");
    let denied = engine.authorize_and_apply_at(
        MutationRequest::update(Role::Marketing, Some(actor), foreign, patch),
        fixed_now(),
    );
    assert_eq!(denied, Err(Denial::NotPermitted));
}

#[test]
fn immutable_fields_survive_a_thousand_admin_updates() {
    let engine = engine_with_run("run-1", 5);

    for i in 0..1000 {
        let record = stored_enrollment("enr-1", "run-1", "pending");
        let mut patch = RecordData::new();
        patch.set("created_by", format!("intruder-{i}"));
        patch.set("enrolled_at", format!("19{:02}-01-01T00:00:00+00:00", i % 100));

        let approved = engine
            .authorize_and_apply_at(
                MutationRequest::update(
                    Role::Admin,
                    Some(ActorId::new("adm-1")),
                    record,
                    patch,
                ),
                fixed_now(),
            )
            .unwrap();
        assert_eq!(approved.data.get_str("created_by"), Some("advisor-1"));
        assert_eq!(
            approved.data.get_str("enrolled_at"),
            Some("2025-01-01T00:00:00+00:00")
        );
    }
}

#[test]
fn pending_cannot_jump_to_completed() {
    let engine = engine_with_run("run-1", 5);
    let mut patch = RecordData::new();
    patch.set("status", "completed");
    patch.set("attendance_percentage", json!(100.0));
    patch.set("final_grade", json!(100.0));

    let denied = engine.authorize_and_apply_at(
        MutationRequest::update(
            Role::Manager,
            Some(ActorId::new("mgr-1")),
            stored_enrollment("enr-1", "run-1", "pending"),
            patch,
        ),
        fixed_now(),
    );
    assert!(matches!(denied, Err(Denial::InvalidTransition { .. })));
}

#[test]
fn completion_without_academics_fails_at_the_edge() {
    let engine = engine_with_run("run-1", 5);
    let mut patch = RecordData::new();
    patch.set("status", "completed");

    let denied = engine.authorize_and_apply_at(
        MutationRequest::update(
            Role::Manager,
            Some(ActorId::new("mgr-1")),
            stored_enrollment("enr-1", "run-1", "confirmed"),
            patch,
        ),
        fixed_now(),
    );
    match denied {
        Err(Denial::PreconditionFailed { reason }) => {
            assert!(reason.contains("attendance_percentage"));
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }
}

#[test]
fn completed_is_terminal_through_the_facade() {
    let engine = engine_with_run("run-1", 5);
    for target in ["pending", "confirmed", "waitlisted", "cancelled"] {
        let mut patch = RecordData::new();
        patch.set("status", target);
        let denied = engine.authorize_and_apply_at(
            MutationRequest::update(
                Role::Admin,
                Some(ActorId::new("adm-1")),
                stored_enrollment("enr-1", "run-1", "completed"),
                patch,
            ),
            fixed_now(),
        );
        assert!(
            matches!(denied, Err(Denial::InvalidTransition { .. })),
            "completed -> {target}"
        );
    }
}

#[test]
fn denial_messages_carry_no_policy_detail() {
    let engine = engine_with_run("run-1", 5);
    let mut patch = RecordData::new();
    patch.set("amount_paid", json!(100.0));

    let denied = engine
        .authorize_and_apply_at(
            MutationRequest::update(
                Role::Advisor,
                Some(ActorId::new("advisor-1")),
                stored_enrollment("enr-1", "run-1", "pending"),
                patch,
            ),
            fixed_now(),
        )
        .unwrap_err();
    assert_eq!(denied.to_string(), "forbidden");
}

#[test]
fn full_enrollment_lifecycle() {
    let engine = engine_with_run("run-1", 1);

    // Created pending.
    let mut create = RecordData::new();
    create.set("course_run", "run-1");
    create.set("total_amount", json!(900.0));
    let approved = engine
        .authorize_and_apply_at(
            MutationRequest::create(
                Role::Advisor,
                Some(ActorId::new("advisor-1")),
                regent_types::RecordType::Enrollment,
                create,
            ),
            fixed_now(),
        )
        .unwrap();
    assert_eq!(approved.data.get_str("status"), Some("pending"));

    // Confirmed: seat taken, stamp set.
    let mut confirm = RecordData::new();
    confirm.set("status", "confirmed");
    let approved = engine
        .authorize_and_apply_at(
            MutationRequest::update(
                Role::Advisor,
                Some(ActorId::new("advisor-1")),
                stored_enrollment("enr-1", "run-1", "pending"),
                confirm,
            ),
            fixed_now(),
        )
        .unwrap();
    assert!(approved.data.is_set("confirmed_at"));

    // Completed with academics in range.
    let mut complete = RecordData::new();
    complete.set("status", "completed");
    complete.set("attendance_percentage", json!(96.0));
    complete.set("final_grade", json!(91.5));
    let record = stored_enrollment("enr-1", "run-1", "confirmed")
        .with_field("confirmed_at", "2025-02-01T00:00:00+00:00");
    let approved = engine
        .authorize_and_apply_at(
            MutationRequest::update(
                Role::Manager,
                Some(ActorId::new("mgr-1")),
                record,
                complete,
            ),
            fixed_now(),
        )
        .unwrap();
    assert!(approved.data.is_set("completed_at"));
    assert_eq!(
        approved.data.get_str("confirmed_at"),
        Some("2025-02-01T00:00:00+00:00")
    );
}
