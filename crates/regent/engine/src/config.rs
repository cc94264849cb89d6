//! Per-record-type governance configuration.
//!
//! A [`RecordGovernance`] bundles everything the facade needs for one
//! record type: the policy table, the field guard, and optionally a
//! workflow graph, a capacity binding, financial rules, and a duplicate
//! policy. The engine consumes these as static configuration — policies
//! are fixed per record type and role, not end-user configurable.

use crate::duplicate::DuplicateLeadPolicy;
use crate::financial::FinancialRules;
use regent_fields::FieldGuard;
use regent_policy::{defaults, RecordPolicy};
use regent_types::RecordType;
use regent_workflow::{
    course_run_workflow, enrollment_workflow, lead_workflow, template_workflow, StatusWorkflow,
};
use std::collections::HashMap;

/// How a capacity-managed record names its resource: the data field that
/// carries the resource identity (an enrollment's `course_run`).
#[derive(Clone, Debug)]
pub struct CapacityBinding {
    pub resource_field: String,
}

impl CapacityBinding {
    pub fn new(resource_field: impl Into<String>) -> Self {
        Self {
            resource_field: resource_field.into(),
        }
    }
}

/// A system-generated business identifier (`ENR-YYYYMMDD-XXXX`). Clients
/// cannot supply it; the engine mints it at creation.
#[derive(Clone, Debug)]
pub struct GeneratedId {
    pub field: String,
    pub prefix: String,
}

impl GeneratedId {
    pub fn new(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            prefix: prefix.into(),
        }
    }
}

/// Everything the facade knows about one record type.
#[derive(Clone, Debug)]
pub struct RecordGovernance {
    pub record_type: RecordType,
    pub policy: RecordPolicy,
    pub guard: FieldGuard,
    pub workflow: Option<StatusWorkflow>,
    pub capacity: Option<CapacityBinding>,
    pub financial: Option<FinancialRules>,
    pub duplicates: Option<DuplicateLeadPolicy>,
    pub generated_id: Option<GeneratedId>,
}

impl RecordGovernance {
    pub fn new(record_type: RecordType, policy: RecordPolicy, guard: FieldGuard) -> Self {
        Self {
            record_type,
            policy,
            guard,
            workflow: None,
            capacity: None,
            financial: None,
            duplicates: None,
            generated_id: None,
        }
    }

    pub fn with_workflow(mut self, workflow: StatusWorkflow) -> Self {
        self.workflow = Some(workflow);
        self
    }

    pub fn with_capacity(mut self, binding: CapacityBinding) -> Self {
        self.capacity = Some(binding);
        self
    }

    pub fn with_financial(mut self, rules: FinancialRules) -> Self {
        self.financial = Some(rules);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateLeadPolicy) -> Self {
        self.duplicates = Some(policy);
        self
    }

    pub fn with_generated_id(mut self, generated_id: GeneratedId) -> Self {
        self.generated_id = Some(generated_id);
        self
    }
}

/// The full static configuration the engine runs on.
#[derive(Clone, Debug, Default)]
pub struct GovernanceConfig {
    records: HashMap<RecordType, RecordGovernance>,
}

impl GovernanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, governance: RecordGovernance) {
        self.records.insert(governance.record_type, governance);
    }

    pub fn record(&self, record_type: RecordType) -> Option<&RecordGovernance> {
        self.records.get(&record_type)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordGovernance> {
        self.records.values()
    }

    /// The education-domain configuration: seven governed record types
    /// with the production access matrix, guards, and workflows.
    pub fn education_defaults() -> Self {
        let mut config = Self::new();

        config.add(
            RecordGovernance::new(
                RecordType::Enrollment,
                defaults::enrollment_policy(),
                regent_fields::enrollment_guard(),
            )
            .with_workflow(enrollment_workflow())
            .with_capacity(CapacityBinding::new("course_run"))
            .with_financial(FinancialRules::default())
            .with_generated_id(GeneratedId::new("enrollment_id", "ENR")),
        );

        config.add(
            RecordGovernance::new(
                RecordType::Lead,
                defaults::lead_policy(),
                regent_fields::lead_guard(),
            )
            .with_workflow(lead_workflow())
            .with_duplicate_policy(DuplicateLeadPolicy::default())
            .with_generated_id(GeneratedId::new("lead_id", "LEAD")),
        );

        config.add(
            RecordGovernance::new(
                RecordType::Template,
                defaults::template_policy(),
                regent_fields::template_guard(),
            )
            .with_workflow(template_workflow()),
        );

        config.add(
            RecordGovernance::new(
                RecordType::CourseRun,
                defaults::course_run_policy(),
                regent_fields::course_run_guard(),
            )
            .with_workflow(course_run_workflow()),
        );

        config.add(RecordGovernance::new(
            RecordType::Media,
            defaults::media_policy(),
            regent_fields::media_guard(),
        ));

        config.add(RecordGovernance::new(
            RecordType::Faq,
            defaults::faq_policy(),
            regent_fields::faq_guard(),
        ));

        config.add(RecordGovernance::new(
            RecordType::User,
            defaults::user_policy(),
            regent_fields::FieldGuard::new(RecordType::User),
        ));

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_record_type() {
        let config = GovernanceConfig::education_defaults();
        for record_type in RecordType::ALL {
            assert!(config.record(record_type).is_some(), "{record_type}");
        }
    }

    #[test]
    fn test_enrollments_are_capacity_bound() {
        let config = GovernanceConfig::education_defaults();
        let enrollment = config.record(RecordType::Enrollment).unwrap();
        assert!(enrollment.capacity.is_some());
        assert!(enrollment.workflow.is_some());
        assert!(enrollment.financial.is_some());

        let media = config.record(RecordType::Media).unwrap();
        assert!(media.capacity.is_none());
        assert!(media.workflow.is_none());
    }

    #[test]
    fn test_default_workflows_validate() {
        let config = GovernanceConfig::education_defaults();
        for governance in config.records() {
            if let Some(workflow) = &governance.workflow {
                workflow.validate().unwrap();
            }
        }
    }
}
