//! Directory roles.
//!
//! Roles are read from the remote role registry. Only `admin` and
//! `super_admin` are ever stored there; everyone else is an implicit `user`.

use serde::{Deserialize, Serialize};

/// Permission level of a signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Guest: may browse and search the directory.
    #[default]
    User,
    /// May add donors.
    Admin,
    /// May add and delete donors.
    SuperAdmin,
}

impl Role {
    /// Map a role value read from the registry to a role.
    ///
    /// Unrecognized values map to [`Role::User`]. Returns whether the value
    /// was recognized so callers can log the downgrade.
    #[must_use]
    pub fn from_registry(value: &str) -> (Self, bool) {
        value.parse().map_or((Self::User, false), |role| (role, true))
    }

    /// The tag stored in the registry (`user`, `admin`, `super_admin`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Text shown in the role badge.
    #[must_use]
    pub const fn badge_label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// CSS modifier for the role badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::User => "role-user",
            Self::Admin => "role-admin",
            Self::SuperAdmin => "role-super",
        }
    }

    /// Whether this role may add donor records.
    #[must_use]
    pub const fn can_add_donors(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Whether this role may delete donor records.
    #[must_use]
    pub const fn can_delete_donors(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_registry_known_values() {
        assert_eq!(Role::from_registry("admin"), (Role::Admin, true));
        assert_eq!(Role::from_registry("super_admin"), (Role::SuperAdmin, true));
        assert_eq!(Role::from_registry("user"), (Role::User, true));
    }

    #[test]
    fn test_from_registry_unknown_fails_closed() {
        assert_eq!(Role::from_registry("owner"), (Role::User, false));
        assert_eq!(Role::from_registry("ADMIN"), (Role::User, false));
        assert_eq!(Role::from_registry(""), (Role::User, false));
    }

    #[test]
    fn test_permissions() {
        assert!(!Role::User.can_add_donors());
        assert!(!Role::User.can_delete_donors());
        assert!(Role::Admin.can_add_donors());
        assert!(!Role::Admin.can_delete_donors());
        assert!(Role::SuperAdmin.can_add_donors());
        assert!(Role::SuperAdmin.can_delete_donors());
    }

    #[test]
    fn test_badge_is_uppercased_tag() {
        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            assert_eq!(role.badge_label(), role.as_str().to_uppercase());
        }
    }

    #[test]
    fn test_default_is_lowest_privilege() {
        assert_eq!(Role::default(), Role::User);
    }
}
