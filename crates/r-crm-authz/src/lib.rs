//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Permission resolution, access guards, and navigation filtering."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Authorization core for the R-CRM console: decides whether a user may use a
//! capability, gates views and routes on that decision, and prunes navigation
//! to what the user can reach. Evaluation is pure and in-process.

pub mod catalog;
pub mod guard;
pub mod metrics;
pub mod navigation;
pub mod resolver;
pub mod subject;

pub use catalog::{
    CatalogError, DefaultRolePermissionMap, Permission, RoleName, DEFAULT_ROLE_PERMISSIONS,
    SUPER_ADMIN_ROLE,
};
pub use guard::{
    AuthSnapshot, CanAccess, Capabilities, GuardDecision, NavigateOptions, Navigator,
    RecordingNavigator, Rendered, RequireMode, Requirement, RoleGuard, RouteGuard, RouteState,
    Views,
};
pub use metrics::AccessMetrics;
pub use navigation::{
    filter_navigation, get_accessible_settings_tabs, get_first_accessible_route, NavigationError,
    NavigationItem, NavigationMap, RedirectTarget, SmartRedirect, LOGIN_PATH, PRIMARY_NAVIGATION,
    SETTINGS_TABS, UNAUTHORIZED_PATH,
};
pub use resolver::{
    default_resolver, get_user_permissions, get_user_role, has_all_permissions,
    has_any_permission, has_any_role, has_permission, has_role, PermissionResolver, RolePolicy,
};
pub use subject::{NormalizedRole, PermissionRef, RoleObject, RoleRef, User};
