//! Declared roles and engine routine signatures.

use serde::Serialize;

use crate::data::{Role, VariableRoles};
use crate::error::{Result, TabstatError};

/// How many columns a method accepts for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleSpec {
    pub role: Role,
    pub min: usize,
    pub max: Option<usize>,
}

impl RoleSpec {
    /// Exactly one column.
    pub const fn one(role: Role) -> Self {
        Self {
            role,
            min: 1,
            max: Some(1),
        }
    }

    /// Zero or one column.
    pub const fn optional(role: Role) -> Self {
        Self {
            role,
            min: 0,
            max: Some(1),
        }
    }

    /// Exactly `n` columns.
    pub const fn exactly(role: Role, n: usize) -> Self {
        Self {
            role,
            min: n,
            max: Some(n),
        }
    }

    /// `n` or more columns.
    pub const fn at_least(role: Role, n: usize) -> Self {
        Self {
            role,
            min: n,
            max: None,
        }
    }

    /// Checks the assignment for this role.
    pub fn check(&self, roles: &VariableRoles) -> Result<()> {
        let count = roles.count(self.role);
        if count < self.min {
            if self.min == 1 {
                return Err(TabstatError::validation(self.role.missing_message()));
            }
            return Err(TabstatError::validation(format!(
                "minimum {} {} required",
                self.min,
                self.role.plural_noun()
            )));
        }
        if let Some(max) = self.max {
            if count > max {
                return Err(TabstatError::validation(format!(
                    "at most {max} {} allowed for role '{}'",
                    self.role.plural_noun(),
                    self.role
                )));
            }
        }
        Ok(())
    }
}

/// Kind of one positional engine argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgKind {
    /// One numeric array
    Numbers,
    /// One label array
    Labels,
    /// One numeric array per group
    Groups,
    /// Samples × features matrix
    RowMajor,
    /// Features × samples matrix
    ColumnMajor,
    /// A single number
    Scalar,
    /// A single string
    Text,
}

/// Name and positional argument kinds of one engine routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutineSignature {
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_single_role_uses_domain_message() {
        let err = RoleSpec::one(Role::Dependent)
            .check(&VariableRoles::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "measurement variable required");
    }

    #[test]
    fn test_minimum_arity_message() {
        let roles = VariableRoles::new().with_all(Role::Variables, ["a", "b"]);
        let err = RoleSpec::at_least(Role::Variables, 3)
            .check(&roles)
            .unwrap_err();
        assert_eq!(err.to_string(), "minimum 3 variables required");
    }

    #[test]
    fn test_maximum_arity() {
        let roles = VariableRoles::new().with_all(Role::Group, ["a", "b"]);
        assert!(RoleSpec::one(Role::Group).check(&roles).is_err());
        assert!(RoleSpec::optional(Role::Group)
            .check(&VariableRoles::new())
            .is_ok());
    }
}
