//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Navigation filtering and post-login landing selection."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Navigation accessibility filtering.
//!
//! Item lists are ordered by priority. Filtering never reorders, so the first
//! surviving item of the primary list is the landing page after login.

use once_cell::sync::Lazy;
use r_crm_logging::{crm_debug, crm_info, LogContext};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Permission;
use crate::guard::{NavigateOptions, Navigator};
use crate::resolver::{default_resolver, PermissionResolver};
use crate::subject::User;

/// Landing path when nothing is reachable.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
/// Landing path for unauthenticated visitors.
pub const LOGIN_PATH: &str = "/login";

/// A route or menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    /// Route path.
    pub path: String,
    /// Menu label.
    #[serde(default)]
    pub label: String,
    /// Permission required to reach the path; `None` means any signed-in user.
    #[serde(default)]
    pub permission: Option<String>,
}

impl NavigationItem {
    /// Item gated on `permission`.
    pub fn new(path: impl Into<String>, label: impl Into<String>, permission: Option<Permission>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            permission: permission.map(|p| p.as_str().to_owned()),
        }
    }
}

/// Invalid navigation definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Paths must be absolute.
    #[error("navigation path must start with '/': {0}")]
    RelativePath(String),
    /// Permission is not in the catalog.
    #[error("navigation item {path} requires unknown permission {permission}")]
    UnknownPermission {
        /// Offending item path.
        path: String,
        /// Offending permission key.
        permission: String,
    },
}

/// Built-in primary navigation, highest priority first.
pub static PRIMARY_NAVIGATION: Lazy<Vec<NavigationItem>> = Lazy::new(|| {
    vec![
        NavigationItem::new("/", "Dashboard", Some(Permission::DashboardView)),
        NavigationItem::new("/leads", "Leads", Some(Permission::LeadsRead)),
        NavigationItem::new("/campaigns", "Campaigns", Some(Permission::CampaignsRead)),
        NavigationItem::new("/tasks", "Tasks", Some(Permission::TasksRead)),
        NavigationItem::new("/products", "Products", Some(Permission::ProductsRead)),
        NavigationItem::new("/reports", "Reports", Some(Permission::ReportsView)),
        NavigationItem::new("/users", "Users", Some(Permission::UsersRead)),
        NavigationItem::new("/settings", "Settings", Some(Permission::SettingsView)),
    ]
});

/// Built-in settings tabs.
pub static SETTINGS_TABS: Lazy<Vec<NavigationItem>> = Lazy::new(|| {
    vec![
        NavigationItem::new("/settings/profile", "Profile", None),
        NavigationItem::new("/settings/general", "General", Some(Permission::SettingsManage)),
        NavigationItem::new("/settings/roles", "Roles & Permissions", Some(Permission::RolesRead)),
        NavigationItem::new("/settings/lead-sources", "Lead Sources", Some(Permission::SourcesManage)),
        NavigationItem::new("/settings/lead-statuses", "Lead Statuses", Some(Permission::StatusesManage)),
    ]
});

/// Items of `items` reachable by `user`, in input order.
pub fn filter_navigation<'i, F>(
    items: &'i [NavigationItem],
    user: Option<&User>,
    has_permission: F,
) -> Vec<&'i NavigationItem>
where
    F: Fn(Option<&User>, &str) -> bool,
{
    if user.is_none() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| match item.permission.as_deref() {
            None | Some("") => true,
            Some(permission) => has_permission(user, permission),
        })
        .collect()
}

/// First reachable primary route, or [`UNAUTHORIZED_PATH`].
pub fn get_first_accessible_route<F>(user: Option<&User>, has_permission: F) -> String
where
    F: Fn(Option<&User>, &str) -> bool,
{
    first_path(&PRIMARY_NAVIGATION, user, has_permission, UNAUTHORIZED_PATH)
}

/// Settings tabs reachable by `user`.
pub fn get_accessible_settings_tabs<F>(user: Option<&User>, has_permission: F) -> Vec<&'static NavigationItem>
where
    F: Fn(Option<&User>, &str) -> bool,
{
    filter_navigation(&SETTINGS_TABS, user, has_permission)
}

fn first_path<F>(items: &[NavigationItem], user: Option<&User>, has_permission: F, otherwise: &str) -> String
where
    F: Fn(Option<&User>, &str) -> bool,
{
    filter_navigation(items, user, has_permission)
        .first()
        .map(|item| item.path.clone())
        .unwrap_or_else(|| otherwise.to_owned())
}

/// Navigation lists and special paths, overridable from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationMap {
    primary: Vec<NavigationItem>,
    settings: Vec<NavigationItem>,
    login_path: String,
    unauthorized_path: String,
}

impl Default for NavigationMap {
    fn default() -> Self {
        Self {
            primary: PRIMARY_NAVIGATION.clone(),
            settings: SETTINGS_TABS.clone(),
            login_path: LOGIN_PATH.to_owned(),
            unauthorized_path: UNAUTHORIZED_PATH.to_owned(),
        }
    }
}

impl NavigationMap {
    /// Map with custom lists and the default special paths.
    pub fn new(primary: Vec<NavigationItem>, settings: Vec<NavigationItem>) -> Self {
        Self {
            primary,
            settings,
            ..Self::default()
        }
    }

    /// Override the login and unauthorized landing paths.
    pub fn with_paths(mut self, login: impl Into<String>, unauthorized: impl Into<String>) -> Self {
        self.login_path = login.into();
        self.unauthorized_path = unauthorized.into();
        self
    }

    /// Primary list.
    pub fn primary(&self) -> &[NavigationItem] {
        &self.primary
    }

    /// Settings tabs.
    pub fn settings(&self) -> &[NavigationItem] {
        &self.settings
    }

    /// Login path.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Path shown when nothing is reachable.
    pub fn unauthorized_path(&self) -> &str {
        &self.unauthorized_path
    }

    /// Check paths and permission keys of every item.
    pub fn validate(&self) -> Result<(), NavigationError> {
        let specials = [self.login_path.as_str(), self.unauthorized_path.as_str()];
        for path in specials {
            if !path.starts_with('/') {
                return Err(NavigationError::RelativePath(path.to_owned()));
            }
        }
        for item in self.primary.iter().chain(self.settings.iter()) {
            if !item.path.starts_with('/') {
                return Err(NavigationError::RelativePath(item.path.clone()));
            }
            if let Some(permission) = item.permission.as_deref().filter(|p| !p.is_empty()) {
                if !Permission::is_known(permission) {
                    return Err(NavigationError::UnknownPermission {
                        path: item.path.clone(),
                        permission: permission.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reachable primary items.
    pub fn accessible_primary(&self, resolver: &PermissionResolver, user: Option<&User>) -> Vec<&NavigationItem> {
        filter_navigation(&self.primary, user, |u, p| resolver.has_permission(u, p))
    }

    /// Reachable settings tabs.
    pub fn accessible_settings(&self, resolver: &PermissionResolver, user: Option<&User>) -> Vec<&NavigationItem> {
        filter_navigation(&self.settings, user, |u, p| resolver.has_permission(u, p))
    }

    /// First reachable primary route, or the unauthorized path.
    pub fn first_accessible_route(&self, resolver: &PermissionResolver, user: Option<&User>) -> String {
        first_path(
            &self.primary,
            user,
            |u, p| resolver.has_permission(u, p),
            &self.unauthorized_path,
        )
    }
}

/// Where the post-login redirect sends a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum RedirectTarget {
    /// No user; go sign in.
    Login(String),
    /// First reachable route.
    Route(String),
    /// Signed in but nothing is reachable.
    Unauthorized(String),
}

impl RedirectTarget {
    /// Target path.
    pub fn path(&self) -> &str {
        match self {
            RedirectTarget::Login(path)
            | RedirectTarget::Route(path)
            | RedirectTarget::Unauthorized(path) => path,
        }
    }
}

/// Picks a landing page once per mount.
#[derive(Debug, Clone)]
pub struct SmartRedirect<'m> {
    map: &'m NavigationMap,
    resolver: &'m PermissionResolver,
}

impl<'m> SmartRedirect<'m> {
    /// Redirect over `map` using the built-in policy.
    pub fn new(map: &'m NavigationMap) -> Self {
        Self {
            map,
            resolver: default_resolver(),
        }
    }

    /// Redirect over `map` using `resolver`.
    pub fn with_resolver(map: &'m NavigationMap, resolver: &'m PermissionResolver) -> Self {
        Self { map, resolver }
    }

    /// Compute the landing target for `user`.
    pub fn target(&self, user: Option<&User>) -> RedirectTarget {
        if user.is_none() {
            return RedirectTarget::Login(self.map.login_path().to_owned());
        }
        match self.map.accessible_primary(self.resolver, user).first() {
            Some(item) => RedirectTarget::Route(item.path.clone()),
            None => RedirectTarget::Unauthorized(self.map.unauthorized_path().to_owned()),
        }
    }

    /// Compute the target and navigate there, replacing history.
    pub fn run(&self, user: Option<&User>, navigator: &dyn Navigator) -> RedirectTarget {
        let target = self.target(user);
        let role = self.resolver.get_user_role(user).unwrap_or("");
        match &target {
            RedirectTarget::Route(path) => crm_debug!(
                context = LogContext::new().with_role(role).with_route(path),
                "landing on first accessible route"
            ),
            other => crm_info!(
                context = LogContext::new().with_role(role).with_route(other.path()),
                "no accessible landing route"
            ),
        }
        navigator.navigate(target.path(), NavigateOptions::REPLACE);
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::RecordingNavigator;
    use crate::resolver::has_permission;
    use crate::subject::RoleRef;

    fn paths(items: &[&NavigationItem]) -> Vec<String> {
        items.iter().map(|item| item.path.clone()).collect()
    }

    #[test]
    fn no_user_sees_nothing_even_public_items() {
        let items = vec![NavigationItem::new("/", "Home", None)];
        assert!(filter_navigation(&items, None, has_permission).is_empty());
        assert_eq!(get_first_accessible_route(None, has_permission), UNAUTHORIZED_PATH);
    }

    #[test]
    fn filtering_preserves_order_and_drops_denied_items() {
        let u = User::with_role(RoleRef::with_permissions("Custom", ["tasks.read", "leads.read"]));
        let items = vec![
            NavigationItem::new("/z-tasks", "Tasks", Some(Permission::TasksRead)),
            NavigationItem::new("/users", "Users", Some(Permission::UsersRead)),
            NavigationItem::new("/a-public", "Help", None),
            NavigationItem::new("/leads", "Leads", Some(Permission::LeadsRead)),
        ];
        let visible = filter_navigation(&items, Some(&u), has_permission);
        assert_eq!(paths(&visible), ["/z-tasks", "/a-public", "/leads"]);
    }

    #[test]
    fn first_route_follows_priority_not_alphabet() {
        let u = User::with_role(RoleRef::with_permissions("Custom", ["users.read", "campaigns.read"]));
        assert_eq!(get_first_accessible_route(Some(&u), has_permission), "/campaigns");
        let viewer = User::with_role("Viewer");
        assert_eq!(get_first_accessible_route(Some(&viewer), has_permission), "/");
        let nobody = User::with_role(RoleRef::with_permissions("Custom", ["sources.manage"]));
        assert_eq!(get_first_accessible_route(Some(&nobody), has_permission), UNAUTHORIZED_PATH);
    }

    #[test]
    fn settings_tabs_use_the_same_filter() {
        let manager = User::with_role("Manager");
        let tabs = get_accessible_settings_tabs(Some(&manager), has_permission);
        assert_eq!(paths(&tabs), ["/settings/profile"]);
        let admin = User::with_role("Admin");
        assert_eq!(get_accessible_settings_tabs(Some(&admin), has_permission).len(), SETTINGS_TABS.len());
    }

    #[test]
    fn custom_predicates_are_honoured() {
        let u = User::with_role("Viewer");
        let deny_all = |_: Option<&User>, _: &str| false;
        let visible = filter_navigation(&SETTINGS_TABS, Some(&u), deny_all);
        assert_eq!(paths(&visible), ["/settings/profile"]);
    }

    #[test]
    fn smart_redirect_walks_its_three_outcomes() {
        let map = NavigationMap::default();
        let redirect = SmartRedirect::new(&map);
        let nav = RecordingNavigator::new();

        assert_eq!(redirect.run(None, &nav), RedirectTarget::Login(LOGIN_PATH.into()));
        let agent = User::with_role("Sales Agent");
        assert_eq!(redirect.run(Some(&agent), &nav), RedirectTarget::Route("/".into()));
        let locked = User::with_role(RoleRef::with_permissions("Custom", ["statuses.manage"]));
        assert_eq!(
            redirect.run(Some(&locked), &nav),
            RedirectTarget::Unauthorized(UNAUTHORIZED_PATH.into())
        );
        let visited: Vec<String> = nav.visits().into_iter().map(|(p, o)| {
            assert!(o.replace);
            p
        }).collect();
        assert_eq!(visited, ["/login", "/", "/unauthorized"]);
    }

    #[test]
    fn reachable_item_sharing_the_unauthorized_path_is_a_route() {
        let map = NavigationMap::new(
            vec![NavigationItem::new(UNAUTHORIZED_PATH, "Notice", None)],
            vec![],
        );
        let viewer = User::with_role("Viewer");
        assert_eq!(
            SmartRedirect::new(&map).target(Some(&viewer)),
            RedirectTarget::Route(UNAUTHORIZED_PATH.into())
        );
        let empty = NavigationMap::new(vec![], vec![]);
        assert_eq!(
            SmartRedirect::new(&empty).target(Some(&viewer)),
            RedirectTarget::Unauthorized(UNAUTHORIZED_PATH.into())
        );
    }

    #[test]
    fn map_validation_rejects_bad_items() {
        assert!(NavigationMap::default().validate().is_ok());
        let relative = NavigationMap::new(vec![NavigationItem::new("leads", "Leads", None)], vec![]);
        assert_eq!(relative.validate(), Err(NavigationError::RelativePath("leads".into())));
        let unknown = NavigationMap::new(
            vec![NavigationItem {
                path: "/x".into(),
                label: "X".into(),
                permission: Some("x.fly".into()),
            }],
            vec![],
        );
        assert!(matches!(unknown.validate(), Err(NavigationError::UnknownPermission { .. })));
    }

    #[test]
    fn custom_map_paths_drive_first_route() {
        let map = NavigationMap::new(
            vec![NavigationItem::new("/pipeline", "Pipeline", Some(Permission::LeadsRead))],
            vec![],
        )
        .with_paths("/signin", "/forbidden");
        let resolver = PermissionResolver::default();
        let admin = User::with_role("Admin");
        let stranger = User::with_role("Stranger");
        assert_eq!(map.first_accessible_route(&resolver, Some(&admin)), "/pipeline");
        assert_eq!(map.first_accessible_route(&resolver, Some(&stranger)), "/forbidden");
        assert_eq!(SmartRedirect::new(&map).target(None).path(), "/signin");
    }
}
