//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Permission catalog, role names, and default role grants."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Closed catalog of permission keys and built-in roles.
//!
//! Every key has the shape `<resource>.<action>`. The catalog is fixed at
//! compile time; user data may still mention keys outside of it, which the
//! resolver treats as plain strings that simply never match a default grant.

use std::collections::BTreeSet;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// Name of the role that bypasses every permission check.
pub const SUPER_ADMIN_ROLE: &str = "Super Admin";

/// Errors raised when parsing catalog identifiers from external text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Key is not part of the permission catalog.
    #[error("unknown permission key: {0}")]
    UnknownPermission(String),
    /// Name is not one of the built-in roles.
    #[error("unknown role name: {0}")]
    UnknownRole(String),
}

/// Every capability the console can gate on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    IntoStaticStr,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub enum Permission {
    /// View the dashboard landing page.
    #[strum(serialize = "dashboard.view")]
    DashboardView,
    /// List and open leads.
    #[strum(serialize = "leads.read")]
    LeadsRead,
    /// Create leads.
    #[strum(serialize = "leads.create")]
    LeadsCreate,
    /// Edit leads.
    #[strum(serialize = "leads.update")]
    LeadsUpdate,
    /// Delete leads.
    #[strum(serialize = "leads.delete")]
    LeadsDelete,
    /// Reassign lead ownership.
    #[strum(serialize = "leads.assign")]
    LeadsAssign,
    /// Export leads.
    #[strum(serialize = "leads.export")]
    LeadsExport,
    /// Bulk import leads.
    #[strum(serialize = "leads.import")]
    LeadsImport,
    /// List campaigns.
    #[strum(serialize = "campaigns.read")]
    CampaignsRead,
    /// Create campaigns.
    #[strum(serialize = "campaigns.create")]
    CampaignsCreate,
    /// Edit campaigns.
    #[strum(serialize = "campaigns.update")]
    CampaignsUpdate,
    /// Delete campaigns.
    #[strum(serialize = "campaigns.delete")]
    CampaignsDelete,
    /// List tasks.
    #[strum(serialize = "tasks.read")]
    TasksRead,
    /// Create tasks.
    #[strum(serialize = "tasks.create")]
    TasksCreate,
    /// Edit tasks.
    #[strum(serialize = "tasks.update")]
    TasksUpdate,
    /// Delete tasks.
    #[strum(serialize = "tasks.delete")]
    TasksDelete,
    /// List products.
    #[strum(serialize = "products.read")]
    ProductsRead,
    /// Create products.
    #[strum(serialize = "products.create")]
    ProductsCreate,
    /// Edit products.
    #[strum(serialize = "products.update")]
    ProductsUpdate,
    /// Delete products.
    #[strum(serialize = "products.delete")]
    ProductsDelete,
    /// View reports.
    #[strum(serialize = "reports.view")]
    ReportsView,
    /// Export reports.
    #[strum(serialize = "reports.export")]
    ReportsExport,
    /// List users.
    #[strum(serialize = "users.read")]
    UsersRead,
    /// Create users.
    #[strum(serialize = "users.create")]
    UsersCreate,
    /// Edit users.
    #[strum(serialize = "users.update")]
    UsersUpdate,
    /// Delete users.
    #[strum(serialize = "users.delete")]
    UsersDelete,
    /// List roles and their grants.
    #[strum(serialize = "roles.read")]
    RolesRead,
    /// Create, edit, and delete roles.
    #[strum(serialize = "roles.manage")]
    RolesManage,
    /// Open the settings area.
    #[strum(serialize = "settings.view")]
    SettingsView,
    /// Change console settings.
    #[strum(serialize = "settings.manage")]
    SettingsManage,
    /// Manage lead sources.
    #[strum(serialize = "sources.manage")]
    SourcesManage,
    /// Manage lead statuses.
    #[strum(serialize = "statuses.manage")]
    StatusesManage,
}

impl Permission {
    /// Canonical `resource.action` key.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Resource half of the key.
    pub fn resource(&self) -> &'static str {
        let key = self.as_str();
        key.split_once('.').map_or(key, |(resource, _)| resource)
    }

    /// Action half of the key.
    pub fn action(&self) -> &'static str {
        let key = self.as_str();
        key.split_once('.').map_or("", |(_, action)| action)
    }

    /// Full catalog in declaration order.
    pub fn all() -> impl Iterator<Item = Permission> {
        Permission::iter()
    }

    /// Whether `key` names a catalog permission.
    pub fn is_known(key: &str) -> bool {
        key.parse::<Permission>().is_ok()
    }
}

impl FromStr for Permission {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Permission::iter()
            .find(|permission| permission.as_str() == key)
            .ok_or_else(|| CatalogError::UnknownPermission(s.to_owned()))
    }
}

/// Built-in role names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    IntoStaticStr,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub enum RoleName {
    /// Unrestricted access; never consults the default map.
    #[strum(serialize = "Super Admin")]
    SuperAdmin,
    /// Full console administration.
    #[strum(serialize = "Admin")]
    Admin,
    /// Team lead with pipeline and campaign control.
    #[strum(serialize = "Manager")]
    Manager,
    /// Works assigned leads and tasks.
    #[strum(serialize = "Sales Agent")]
    SalesAgent,
    /// Read-only access.
    #[strum(serialize = "Viewer")]
    Viewer,
}

impl RoleName {
    /// Display name as it appears in user records.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether this is the super-administrator role.
    pub fn is_super_admin(&self) -> bool {
        matches!(self, RoleName::SuperAdmin)
    }
}

impl FromStr for RoleName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        RoleName::iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| CatalogError::UnknownRole(s.to_owned()))
    }
}

/// Fallback grants used when a role arrives without an explicit permission list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRolePermissionMap {
    roles: IndexMap<String, BTreeSet<Permission>>,
}

impl DefaultRolePermissionMap {
    fn builtin() -> Self {
        use Permission::*;

        let admin: BTreeSet<Permission> = Permission::all()
            .filter(|permission| *permission != RolesManage)
            .collect();
        let manager = BTreeSet::from([
            DashboardView,
            LeadsRead,
            LeadsCreate,
            LeadsUpdate,
            LeadsAssign,
            LeadsExport,
            CampaignsRead,
            CampaignsCreate,
            CampaignsUpdate,
            TasksRead,
            TasksCreate,
            TasksUpdate,
            TasksDelete,
            ProductsRead,
            ReportsView,
            ReportsExport,
            UsersRead,
            SettingsView,
        ]);
        let sales_agent = BTreeSet::from([
            DashboardView,
            LeadsRead,
            LeadsCreate,
            LeadsUpdate,
            CampaignsRead,
            TasksRead,
            TasksCreate,
            TasksUpdate,
            ProductsRead,
        ]);
        let viewer = BTreeSet::from([
            DashboardView,
            LeadsRead,
            CampaignsRead,
            TasksRead,
            ProductsRead,
            ReportsView,
        ]);

        let mut roles = IndexMap::new();
        roles.insert(RoleName::Admin.as_str().to_owned(), admin);
        roles.insert(RoleName::Manager.as_str().to_owned(), manager);
        roles.insert(RoleName::SalesAgent.as_str().to_owned(), sales_agent);
        roles.insert(RoleName::Viewer.as_str().to_owned(), viewer);
        Self { roles }
    }

    /// Default grants for `role`; unknown roles have none.
    pub fn permissions_for(&self, role: &str) -> Option<&BTreeSet<Permission>> {
        self.roles.get(role)
    }

    /// Whether the defaults for `role` include `permission`.
    pub fn grants(&self, role: &str, permission: &str) -> bool {
        self.permissions_for(role)
            .map(|set| set.iter().any(|granted| granted.as_str() == permission))
            .unwrap_or(false)
    }

    /// Iterate role names and their grants in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<Permission>)> {
        self.roles.iter().map(|(name, set)| (name.as_str(), set))
    }
}

/// Process-wide default role grants.
pub static DEFAULT_ROLE_PERMISSIONS: Lazy<DefaultRolePermissionMap> =
    Lazy::new(DefaultRolePermissionMap::builtin);
