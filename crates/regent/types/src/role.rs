//! Roles and operations.
//!
//! The role set is a fixed enumeration. There is deliberately no total
//! privilege order: Marketing holds ownership-scoped rights on templates
//! that higher tiers never need, and Advisor holds assignment-scoped rights
//! on leads. Policy tables, not role ranks, decide who may do what.

use serde::{Deserialize, Serialize};

/// A principal's role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full system access.
    Admin,
    /// Manages content and non-admin users.
    Manager,
    /// Works assigned leads and enrollment follow-up.
    Advisor,
    /// Creates campaign content; ownership-scoped on templates and FAQs.
    Marketing,
    /// Reads everything non-privileged, writes nothing.
    ReadOnly,
    /// Anonymous. Public intake (leads) and published content only.
    Public,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Manager,
        Role::Advisor,
        Role::Marketing,
        Role::ReadOnly,
        Role::Public,
    ];

    /// Authenticated staff roles — everything except `Public`.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Advisor => "advisor",
            Role::Marketing => "marketing",
            Role::ReadOnly => "read_only",
            Role::Public => "public",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record-level operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Whether this operation writes record state.
    pub fn mutates(&self) -> bool {
        !matches!(self, Operation::Read)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// A field-level operation. Field checks are a second evaluation pass,
/// consulted independently of the record-level decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperation {
    Read,
    Update,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_excludes_public() {
        for role in Role::ALL {
            assert_eq!(role.is_staff(), role != Role::Public);
        }
    }

    #[test]
    fn test_operation_mutates() {
        assert!(Operation::Create.mutates());
        assert!(Operation::Update.mutates());
        assert!(Operation::Delete.mutates());
        assert!(!Operation::Read.mutates());
    }

    #[test]
    fn test_role_serde_round_trip() {
        let json = serde_json::to_string(&Role::ReadOnly).unwrap();
        assert_eq!(json, "\"read_only\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::ReadOnly);
    }
}
