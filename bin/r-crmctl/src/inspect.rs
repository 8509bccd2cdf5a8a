//! ---
//! crm_section: "05-external-interfaces"
//! crm_subsection: "binary"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Control CLI for inspecting permission decisions."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Args;
use r_crm_authz::{NavigationItem, Permission, RecordingNavigator, SmartRedirect};
use r_crm_common::AppConfig;
use serde_json::json;

use crate::subject::{emit, SubjectArgs};

#[derive(Debug, Args)]
pub struct CatalogCommand {
    /// Only list permission keys.
    #[arg(long = "keys-only", action = clap::ArgAction::SetTrue)]
    keys_only: bool,
}

impl CatalogCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let permissions: Vec<&str> = Permission::all().map(|p| p.as_str()).collect();
        if self.keys_only {
            return emit(&permissions);
        }
        let policy = config.role_policy();
        let roles: serde_json::Map<String, serde_json::Value> = policy
            .roles()
            .map(|role| (role.to_owned(), json!(policy.defaults_for(role))))
            .collect();
        emit(&json!({
            "super_admin_role": policy.super_admin(),
            "permissions": permissions,
            "roles": roles,
        }))
    }
}

#[derive(Debug, Args)]
pub struct NavCommand {
    #[command(flatten)]
    subject: SubjectArgs,

    /// Filter the settings tabs instead of the primary navigation.
    #[arg(long = "settings", action = clap::ArgAction::SetTrue)]
    settings: bool,
}

impl NavCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let map = config.navigation_map();
        let items: Vec<&NavigationItem> = if self.settings {
            map.accessible_settings(&resolver, user.as_ref())
        } else {
            map.accessible_primary(&resolver, user.as_ref())
        };
        emit(&items)
    }
}

#[derive(Debug, Args)]
pub struct LandingCommand {
    #[command(flatten)]
    subject: SubjectArgs,
}

impl LandingCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let map = config.navigation_map();
        let navigator = RecordingNavigator::new();
        let target = SmartRedirect::with_resolver(&map, &resolver).run(user.as_ref(), &navigator);
        emit(&target)
    }
}
