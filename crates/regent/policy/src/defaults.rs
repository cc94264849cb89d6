//! Default policy tables for the education domain.
//!
//! These mirror the production access matrix: six role tiers over
//! enrollments, leads, templates, course runs, media, FAQs, and user
//! accounts. Financial fields on enrollments are the strictest surface —
//! Advisor reads them, only Admin and Manager write them, and a denied
//! write rejects the whole request rather than stripping the field.

use crate::{Access, FieldRule, RecordPolicy};
use regent_types::{Operation, RecordType, Role, ViolationMode};

use Access::{Allow, AssignedOrUnassigned, OwnerOnly};
use Operation::{Create, Delete, Read, Update};
use Role::{Admin, Advisor, Manager, Marketing, Public, ReadOnly};

/// Enrollment financial fields: Advisor may read, only Admin/Manager write.
pub const FINANCIAL_FIELDS: [&str; 7] = [
    "total_amount",
    "amount_paid",
    "financial_aid_requested",
    "financial_aid_amount",
    "financial_aid_approved",
    "payment_method",
    "payment_reference",
];

/// Enrollment fields owned by the engine itself; client values are dropped.
const ENROLLMENT_SYSTEM_FIELDS: [&str; 8] = [
    "enrollment_id",
    "created_by",
    "enrolled_at",
    "confirmed_at",
    "completed_at",
    "cancelled_at",
    "certificate_issued_at",
    "payment_status",
];

pub fn enrollment_policy() -> RecordPolicy {
    let mut policy = RecordPolicy::new(RecordType::Enrollment)
        .grant_each([Admin, Manager, Advisor, Marketing], Create, Allow)
        .grant_each([Admin, Manager, Advisor, Marketing, ReadOnly], Read, Allow)
        .grant_each([Admin, Manager, Advisor, Marketing], Update, Allow)
        .grant(Admin, Delete, Allow)
        .unlisted_fields([Admin, Manager], ViolationMode::Strip);

    for field in FINANCIAL_FIELDS {
        policy = policy.field_rule(
            FieldRule::new(field)
                .readable_by([Admin, Manager, Advisor])
                .updatable_by([Admin, Manager])
                .rejecting(),
        );
    }
    for field in ENROLLMENT_SYSTEM_FIELDS {
        policy = policy.field_rule(FieldRule::new(field).system_managed());
    }

    policy
        .field_rule(FieldRule::new("waitlist_position").system_managed())
        .field_rule(
            FieldRule::new("status")
                .updatable_by([Admin, Manager, Advisor])
                .rejecting(),
        )
        .field_rule(FieldRule::new("notes").updatable_by([Admin, Manager, Advisor, Marketing]))
        .field_rule(
            FieldRule::new("internal_notes")
                .readable_by([Admin])
                .updatable_by([Admin]),
        )
        .field_rule(FieldRule::new("certificate_issued").updatable_by([Admin, Manager]))
        .field_rule(FieldRule::new("certificate_url").updatable_by([Admin, Manager]))
        .field_rule(
            FieldRule::new("attendance_percentage").updatable_by([Admin, Manager]),
        )
        .field_rule(FieldRule::new("final_grade").updatable_by([Admin, Manager]))
        .field_rule(FieldRule::new("active").updatable_by([Admin, Manager]))
}

pub fn lead_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::Lead)
        // Public intake is the one anonymous write in the system.
        .grant_each([Admin, Manager, Advisor, Marketing, Public], Create, Allow)
        .grant_each([Admin, Manager, Marketing, ReadOnly], Read, Allow)
        .grant(Advisor, Read, AssignedOrUnassigned)
        .grant_each([Admin, Manager], Update, Allow)
        .grant(Advisor, Update, AssignedOrUnassigned)
        .grant(Admin, Delete, Allow)
        // Public intake writes the plain contact fields at creation; the
        // record-level table keeps Public away from updates entirely.
        .unlisted_fields([Admin, Manager, Advisor, Public], ViolationMode::Strip)
        .field_rule(FieldRule::new("lead_id").system_managed())
        .field_rule(FieldRule::new("created_by").system_managed())
        // Consent arrives with the submission; the field guard freezes it
        // and its capture metadata afterwards.
        .field_rule(FieldRule::new("gdpr_consent").updatable_by([Public, Admin, Manager]))
        .field_rule(FieldRule::new("consent_given_at").system_managed())
        .field_rule(FieldRule::new("consent_ip").updatable_by([Public, Admin, Manager]))
        .field_rule(FieldRule::new("converted_at").system_managed())
        .field_rule(
            FieldRule::new("status")
                .updatable_by([Admin, Manager, Advisor])
                .rejecting(),
        )
        .field_rule(
            FieldRule::new("assigned_to")
                .updatable_by([Admin, Manager])
                .rejecting(),
        )
        .field_rule(FieldRule::new("lead_score").updatable_by([Admin, Manager, Advisor]))
        .field_rule(FieldRule::new("active").updatable_by([Admin, Manager]))
}

pub fn template_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::Template)
        .grant_each([Admin, Manager, Marketing], Create, Allow)
        .grant_each([Admin, Manager, ReadOnly], Read, Allow)
        .grant(Marketing, Read, OwnerOnly)
        .grant_each([Admin, Manager], Update, Allow)
        .grant(Marketing, Update, OwnerOnly)
        .grant_each([Admin, Manager], Delete, Allow)
        .unlisted_fields([Admin, Manager, Marketing], ViolationMode::Strip)
        .field_rule(FieldRule::new("created_by").system_managed())
        .field_rule(FieldRule::new("version").system_managed())
        .field_rule(FieldRule::new("usage_count").system_managed())
        .field_rule(FieldRule::new("last_used_at").system_managed())
        .field_rule(FieldRule::new("archived_at").system_managed())
        .field_rule(
            FieldRule::new("status")
                .updatable_by([Admin, Manager, Marketing])
                .rejecting(),
        )
        .field_rule(FieldRule::new("active").updatable_by([Admin, Manager]))
}

pub fn course_run_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::CourseRun)
        .grant_each([Admin, Manager], Create, Allow)
        .grant_each([Admin, Manager, Advisor, Marketing, ReadOnly], Read, Allow)
        .grant_each([Admin, Manager], Update, Allow)
        .grant(Admin, Delete, Allow)
        .unlisted_fields([Admin, Manager], ViolationMode::Strip)
        .field_rule(FieldRule::new("created_by").system_managed())
        // Capacity ledger output, never client-writable.
        .field_rule(FieldRule::new("current_enrollments").system_managed())
        .field_rule(FieldRule::new("published_at").system_managed())
        .field_rule(
            FieldRule::new("status")
                .updatable_by([Admin, Manager])
                .rejecting(),
        )
}

pub fn media_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::Media)
        .grant_each([Admin, Manager, Marketing], Create, Allow)
        .grant_each([Admin, Manager, Advisor, Marketing, ReadOnly], Read, Allow)
        .grant(Public, Read, Access::ActiveOnly)
        .grant_each([Admin, Manager], Update, Allow)
        .grant(Marketing, Update, OwnerOnly)
        .grant_each([Admin, Manager], Delete, Allow)
        .unlisted_fields([Admin, Manager, Marketing], ViolationMode::Strip)
        .field_rule(FieldRule::new("created_by").system_managed())
        .field_rule(FieldRule::new("active").updatable_by([Admin, Manager]))
}

pub fn faq_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::Faq)
        .grant_each([Admin, Manager, Marketing], Create, Allow)
        .grant_each([Admin, Manager, Advisor, Marketing, ReadOnly], Read, Allow)
        .grant(Public, Read, Access::PublishedOnly)
        .grant_each([Admin, Manager], Update, Allow)
        .grant(Marketing, Update, OwnerOnly)
        .grant_each([Admin, Manager], Delete, Allow)
        .unlisted_fields([Admin, Manager, Marketing], ViolationMode::Strip)
        .field_rule(FieldRule::new("created_by").system_managed())
        .field_rule(
            FieldRule::new("status")
                .updatable_by([Admin, Manager, Marketing])
                .rejecting(),
        )
}

pub fn user_policy() -> RecordPolicy {
    RecordPolicy::new(RecordType::User)
        .grant_each([Admin, Manager], Create, Allow)
        .grant_each([Admin, Manager], Read, Allow)
        .grant_each([Advisor, Marketing, ReadOnly], Read, OwnerOnly)
        .grant_each([Admin, Manager], Update, Allow)
        .grant_each([Advisor, Marketing, ReadOnly], Update, OwnerOnly)
        .grant(Admin, Delete, Allow)
        .unlisted_fields(
            [Admin, Manager, Advisor, Marketing, ReadOnly],
            ViolationMode::Strip,
        )
        .field_rule(FieldRule::new("role").updatable_by([Admin]).rejecting())
        .field_rule(FieldRule::new("last_login_at").system_managed())
        .field_rule(FieldRule::new("login_count").system_managed())
        .field_rule(FieldRule::new("active").updatable_by([Admin, Manager]))
}

/// Every default policy, assembled into one evaluator.
pub fn education_defaults() -> crate::PolicyEvaluator {
    let mut evaluator = crate::PolicyEvaluator::new();
    evaluator.add_policy(enrollment_policy());
    evaluator.add_policy(lead_policy());
    evaluator.add_policy(template_policy());
    evaluator.add_policy(course_run_policy());
    evaluator.add_policy(media_policy());
    evaluator.add_policy(faq_policy());
    evaluator.add_policy(user_policy());
    evaluator
}
