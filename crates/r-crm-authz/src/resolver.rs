//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Pure permission and role predicates."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Permission resolution.
//!
//! Precedence, in order: super-administrator bypass, then the role's explicit
//! permission list when it is non-empty, then the default grants for the role
//! name. Explicit lists replace the defaults; they are never merged.
//!
//! Every function here is total: missing users, missing roles, unknown role
//! names, and malformed permission lists all resolve to "deny" or "empty".

use std::collections::BTreeSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use r_crm_logging::{crm_debug, LogContext};

use crate::catalog::{Permission, DEFAULT_ROLE_PERMISSIONS, SUPER_ADMIN_ROLE};
use crate::subject::{NormalizedRole, RoleObject, RoleRef, User};

/// Super-administrator name plus the fallback grants for every other role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    super_admin: String,
    defaults: IndexMap<String, BTreeSet<String>>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let defaults = DEFAULT_ROLE_PERMISSIONS
            .iter()
            .map(|(role, grants)| {
                (
                    role.to_owned(),
                    grants.iter().map(|p| p.as_str().to_owned()).collect(),
                )
            })
            .collect();
        Self {
            super_admin: SUPER_ADMIN_ROLE.to_owned(),
            defaults,
        }
    }
}

impl RolePolicy {
    /// Policy with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the super-administrator role name.
    pub fn with_super_admin(mut self, role: impl Into<String>) -> Self {
        self.super_admin = role.into();
        self
    }

    /// Insert or replace the default grants of `role`.
    pub fn with_role_defaults<I, S>(mut self, role: impl Into<String>, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults
            .insert(role.into(), grants.into_iter().map(Into::into).collect());
        self
    }

    /// Name of the role that bypasses every check.
    pub fn super_admin(&self) -> &str {
        &self.super_admin
    }

    /// Default grants for `role`, if it is known.
    pub fn defaults_for(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.defaults.get(role)
    }

    /// Role names with default grants, in insertion order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }
}

/// Evaluates permission and role predicates against a [`RolePolicy`].
#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    policy: RolePolicy,
}

impl PermissionResolver {
    /// Resolver bound to `policy`.
    pub fn new(policy: RolePolicy) -> Self {
        Self { policy }
    }

    /// Policy backing this resolver.
    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// Whether `user` holds `permission`.
    pub fn has_permission(&self, user: Option<&User>, permission: &str) -> bool {
        let Some(role) = NormalizedRole::of(user) else {
            return false;
        };
        if role.is(self.policy.super_admin()) {
            return true;
        }
        if !role.explicit.is_empty() {
            return role.explicit.contains(permission);
        }
        if has_empty_explicit_list(user) {
            crm_debug!(
                context = LogContext::new()
                    .with_role(role.name.unwrap_or(""))
                    .with_permission(permission),
                "explicit permission list is empty; using role defaults"
            );
        }
        role.name
            .and_then(|name| self.policy.defaults_for(name))
            .map(|grants| grants.contains(permission))
            .unwrap_or(false)
    }

    /// Whether `user` holds at least one of `permissions`. Empty input denies.
    pub fn has_any_permission<S: AsRef<str>>(&self, user: Option<&User>, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|permission| self.has_permission(user, permission.as_ref()))
    }

    /// Whether `user` holds every one of `permissions`.
    ///
    /// Empty input is vacuously satisfied for a user with a role; a missing user
    /// or role is always denied.
    pub fn has_all_permissions<S: AsRef<str>>(&self, user: Option<&User>, permissions: &[S]) -> bool {
        if NormalizedRole::of(user).is_none() {
            return false;
        }
        permissions
            .iter()
            .all(|permission| self.has_permission(user, permission.as_ref()))
    }

    /// Whether the resolved role name of `user` equals `role`.
    pub fn has_role(&self, user: Option<&User>, role: &str) -> bool {
        NormalizedRole::of(user).is_some_and(|normalized| normalized.is(role))
    }

    /// Whether `user` holds any of `roles`. Empty input denies.
    pub fn has_any_role<S: AsRef<str>>(&self, user: Option<&User>, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(user, role.as_ref()))
    }

    /// Resolved role name of `user`.
    pub fn get_user_role<'u>(&self, user: Option<&'u User>) -> Option<&'u str> {
        NormalizedRole::of(user).and_then(|role| role.name)
    }

    /// Effective permission keys of `user`.
    pub fn get_user_permissions(&self, user: Option<&User>) -> BTreeSet<String> {
        let Some(role) = NormalizedRole::of(user) else {
            return BTreeSet::new();
        };
        if role.is(self.policy.super_admin()) {
            return Permission::all().map(|p| p.as_str().to_owned()).collect();
        }
        if !role.explicit.is_empty() {
            return role.explicit.into_iter().map(str::to_owned).collect();
        }
        role.name
            .and_then(|name| self.policy.defaults_for(name))
            .cloned()
            .unwrap_or_default()
    }
}

fn has_empty_explicit_list(user: Option<&User>) -> bool {
    matches!(
        user.and_then(|u| u.role.as_ref()),
        Some(RoleRef::Object(RoleObject {
            permissions: Some(list),
            ..
        })) if list.is_empty()
    )
}

static DEFAULT_RESOLVER: Lazy<PermissionResolver> = Lazy::new(PermissionResolver::default);

/// Resolver backed by the built-in policy.
pub fn default_resolver() -> &'static PermissionResolver {
    &DEFAULT_RESOLVER
}

/// [`PermissionResolver::has_permission`] with the built-in policy.
pub fn has_permission(user: Option<&User>, permission: &str) -> bool {
    DEFAULT_RESOLVER.has_permission(user, permission)
}

/// [`PermissionResolver::has_any_permission`] with the built-in policy.
pub fn has_any_permission<S: AsRef<str>>(user: Option<&User>, permissions: &[S]) -> bool {
    DEFAULT_RESOLVER.has_any_permission(user, permissions)
}

/// [`PermissionResolver::has_all_permissions`] with the built-in policy.
pub fn has_all_permissions<S: AsRef<str>>(user: Option<&User>, permissions: &[S]) -> bool {
    DEFAULT_RESOLVER.has_all_permissions(user, permissions)
}

/// [`PermissionResolver::has_role`] with the built-in policy.
pub fn has_role(user: Option<&User>, role: &str) -> bool {
    DEFAULT_RESOLVER.has_role(user, role)
}

/// [`PermissionResolver::has_any_role`] with the built-in policy.
pub fn has_any_role<S: AsRef<str>>(user: Option<&User>, roles: &[S]) -> bool {
    DEFAULT_RESOLVER.has_any_role(user, roles)
}

/// [`PermissionResolver::get_user_role`] with the built-in policy.
pub fn get_user_role(user: Option<&User>) -> Option<&str> {
    DEFAULT_RESOLVER.get_user_role(user)
}

/// [`PermissionResolver::get_user_permissions`] with the built-in policy.
pub fn get_user_permissions(user: Option<&User>) -> BTreeSet<String> {
    DEFAULT_RESOLVER.get_user_permissions(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: serde_json::Value) -> User {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn super_admin_bypasses_explicit_lists() {
        let u = user(json!({ "role": { "name": "Super Admin", "permissions": ["leads.read"] } }));
        for permission in Permission::all() {
            assert!(has_permission(Some(&u), permission.as_str()), "{permission}");
        }
        assert_eq!(get_user_permissions(Some(&u)).len(), Permission::all().count());
    }

    #[test]
    fn admin_with_empty_list_falls_back_to_defaults() {
        let u = user(json!({ "role": { "name": "Admin", "permission": [] } }));
        assert!(has_permission(Some(&u), "settings.manage"));
        assert!(!has_permission(Some(&u), "roles.manage"));
    }

    #[test]
    fn explicit_list_is_authoritative() {
        let viewer = user(json!({ "role": { "name": "Viewer", "permission": [{ "key": "leads.read" }] } }));
        assert!(!has_permission(Some(&viewer), "leads.create"));

        let manager = user(json!({ "role": { "name": "Manager", "permissions": ["leads.read"] } }));
        assert!(has_permission(Some(&manager), "leads.read"));
        assert!(!has_permission(Some(&manager), "leads.create"));
        assert_eq!(
            get_user_permissions(Some(&manager)),
            BTreeSet::from(["leads.read".to_owned()])
        );
    }

    #[test]
    fn bare_role_name_uses_defaults() {
        let manager = User::with_role("Manager");
        assert!(has_permission(Some(&manager), "leads.create"));
        assert!(!has_permission(Some(&manager), "users.delete"));
        let stranger = User::with_role("Contractor");
        assert!(!has_permission(Some(&stranger), "leads.read"));
        assert!(get_user_permissions(Some(&stranger)).is_empty());
    }

    #[test]
    fn absent_subjects_are_denied_everything() {
        let roleless = User::without_role();
        for subject in [None, Some(&roleless)] {
            assert!(!has_permission(subject, "leads.read"));
            assert!(!has_any_permission(subject, &["leads.read"]));
            assert!(!has_all_permissions(subject, &["leads.read"]));
            assert!(!has_all_permissions::<&str>(subject, &[]));
            assert!(!has_role(subject, "Admin"));
            assert_eq!(get_user_role(subject), None);
            assert!(get_user_permissions(subject).is_empty());
        }
    }

    #[test]
    fn empty_queries_keep_vacuous_truth_asymmetry() {
        let u = User::with_role("Viewer");
        assert!(has_all_permissions::<&str>(Some(&u), &[]));
        assert!(!has_any_permission::<&str>(Some(&u), &[]));
        assert!(!has_any_role::<&str>(Some(&u), &[]));
    }

    #[test]
    fn any_and_all_combine_single_checks() {
        let u = User::with_role("Sales Agent");
        assert!(has_any_permission(Some(&u), &["users.delete", "leads.read"]));
        assert!(!has_all_permissions(Some(&u), &["users.delete", "leads.read"]));
        assert!(has_all_permissions(Some(&u), &[Permission::LeadsRead, Permission::TasksCreate]));
    }

    #[test]
    fn role_queries_use_resolved_name() {
        let object = user(json!({ "role": { "name": "Manager", "permissions": [] } }));
        assert!(has_role(Some(&object), "Manager"));
        assert!(!has_role(Some(&object), "manager"));
        assert!(has_any_role(Some(&object), &["Viewer", "Manager"]));
        assert_eq!(get_user_role(Some(&object)), Some("Manager"));
    }

    #[test]
    fn custom_policy_overrides_defaults_and_super_admin() {
        let resolver = PermissionResolver::new(
            RolePolicy::new()
                .with_super_admin("Owner")
                .with_role_defaults("Auditor", ["reports.view"]),
        );
        let owner = User::with_role("Owner");
        let auditor = User::with_role("Auditor");
        let legacy_super = User::with_role("Super Admin");
        assert!(resolver.has_permission(Some(&owner), "roles.manage"));
        assert!(resolver.has_permission(Some(&auditor), "reports.view"));
        assert!(!resolver.has_permission(Some(&auditor), "leads.read"));
        assert!(!resolver.has_permission(Some(&legacy_super), "leads.read"));
    }
}
