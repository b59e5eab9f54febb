/// Role hierarchy
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Account roles, ordered by privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account
    User,
    /// Can ban regular users and write moderator notes
    Moderator,
    /// Can ban content, dismiss reports, promote up to moderator
    Admin,
    /// Full access, can grant admin and superadmin
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Moderator, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Decode a stored role. Anything outside the fixed set is a data error.
    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(ApiError::InvalidRole(s.to_string())),
        }
    }

    /// Parse a role supplied by a client
    pub fn parse_requested(s: &str) -> ApiResult<Self> {
        Self::from_str(s).map_err(|_| {
            ApiError::Validation(format!(
                "The selected role is invalid: {} (expected one of user, moderator, admin, superadmin)",
                s
            ))
        })
    }

    /// Ordinal privilege level
    pub fn level(&self) -> u8 {
        match self {
            Role::User => 0,
            Role::Moderator => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }

    /// Check if this role meets a fixed minimum
    pub fn can_act_as(&self, required: Role) -> bool {
        self.level() >= required.level()
    }

    /// Admin or superadmin
    pub fn is_staff(&self) -> bool {
        self.can_act_as(Role::Admin)
    }

    /// Strictly senior: equal levels never act on each other
    pub fn can_act_on(&self, target: Role) -> bool {
        self.level() > target.level()
    }

    /// Admins may only move targets within {user, moderator}
    pub fn can_assign_role(&self, target_current: Role, requested: Role) -> bool {
        if !self.can_act_on(target_current) {
            return false;
        }

        if *self == Role::Admin && requested.level() >= Role::Admin.level() {
            return false;
        }

        true
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Require a fixed minimum role or return Forbidden
/// Usage: require_role!(auth.user.role, Role::Admin)?;
#[macro_export]
macro_rules! require_role {
    ($role:expr, $required:expr) => {
        if !$role.can_act_as($required) {
            Err($crate::error::ApiError::Forbidden(format!(
                "Requires {} role or higher",
                $required.as_str()
            )))
        } else {
            Ok(())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::SuperAdmin > Role::Admin);
        assert!(Role::Admin > Role::Moderator);
        assert!(Role::Moderator > Role::User);

        assert!(Role::SuperAdmin.can_act_as(Role::Admin));
        assert!(Role::Admin.can_act_as(Role::Moderator));
        assert!(!Role::Moderator.can_act_as(Role::Admin));
        assert!(!Role::User.can_act_as(Role::Moderator));
    }

    #[test]
    fn test_equal_levels_never_act_on_each_other() {
        for role in Role::ALL {
            assert!(!role.can_act_on(role), "{} acted on itself", role);
        }
    }

    #[test]
    fn test_can_act_on_matches_ordinal_order() {
        for acting in Role::ALL {
            for target in Role::ALL {
                assert_eq!(acting.can_act_on(target), acting.level() > target.level());
            }
        }
    }

    #[test]
    fn test_admin_cannot_grant_admin_or_superadmin() {
        for target in Role::ALL {
            for requested in [Role::Admin, Role::SuperAdmin] {
                assert!(!Role::Admin.can_assign_role(target, requested));
            }
        }
    }

    #[test]
    fn test_admin_moves_users_within_user_and_moderator() {
        assert!(Role::Admin.can_assign_role(Role::User, Role::Moderator));
        assert!(Role::Admin.can_assign_role(Role::Moderator, Role::User));
        assert!(!Role::Admin.can_assign_role(Role::Admin, Role::User));
    }

    #[test]
    fn test_superadmin_can_grant_anything_below_itself() {
        assert!(Role::SuperAdmin.can_assign_role(Role::User, Role::SuperAdmin));
        assert!(Role::SuperAdmin.can_assign_role(Role::Admin, Role::User));
        assert!(!Role::SuperAdmin.can_assign_role(Role::SuperAdmin, Role::User));
    }

    #[test]
    fn test_moderator_can_assign_only_to_users() {
        assert!(Role::Moderator.can_assign_role(Role::User, Role::User));
        assert!(!Role::Moderator.can_assign_role(Role::Moderator, Role::User));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("moderator").unwrap(), Role::Moderator);
        assert_eq!(Role::from_str("superadmin").unwrap(), Role::SuperAdmin);

        assert!(matches!(Role::from_str("moder"), Err(ApiError::InvalidRole(_))));
        assert!(matches!(
            Role::parse_requested("owner"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_require_role_macro() {
        let admin: ApiResult<()> = require_role!(Role::Admin, Role::Admin);
        assert!(admin.is_ok());

        let moderator: ApiResult<()> = require_role!(Role::Moderator, Role::Admin);
        assert!(matches!(moderator, Err(ApiError::Forbidden(_))));
    }
}
