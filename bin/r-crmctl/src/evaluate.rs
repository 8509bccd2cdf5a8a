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
use r_crm_authz::{
    AuthSnapshot, Capabilities, RecordingNavigator, Rendered, Requirement, RoleGuard, RouteGuard,
    Views,
};
use r_crm_common::AppConfig;
use serde_json::json;

use crate::subject::{emit, SubjectArgs};

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    subject: SubjectArgs,

    /// Permission keys to check.
    #[arg(long = "permission", value_name = "KEY", required = true, num_args = 1..)]
    permissions: Vec<String>,

    /// Require every permission instead of any one.
    #[arg(long = "all", action = clap::ArgAction::SetTrue)]
    all: bool,
}

impl CheckCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let caps = Capabilities::with_resolver(user.as_ref(), &resolver);
        let granted = if self.all {
            caps.has_all_permissions(&self.permissions)
        } else {
            caps.has_any_permission(&self.permissions)
        };
        let checks: Vec<_> = self
            .permissions
            .iter()
            .map(|permission| json!({ "permission": permission, "granted": caps.has_permission(permission) }))
            .collect();
        emit(&json!({
            "role": caps.role(),
            "mode": if self.all { "all" } else { "any" },
            "granted": granted,
            "checks": checks,
        }))
    }
}

#[derive(Debug, Args)]
pub struct PermissionsCommand {
    #[command(flatten)]
    subject: SubjectArgs,
}

impl PermissionsCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let caps = Capabilities::with_resolver(user.as_ref(), &resolver);
        emit(&json!({
            "authenticated": caps.user().is_some(),
            "role": caps.role(),
            "permissions": caps.permissions(),
        }))
    }
}

#[derive(Debug, Args)]
pub struct RouteCommand {
    #[command(flatten)]
    subject: SubjectArgs,

    /// Single permission guarding the route.
    #[arg(long = "permission", value_name = "KEY", conflicts_with = "permissions")]
    permission: Option<String>,

    /// Permission list guarding the route.
    #[arg(long = "permissions", value_name = "KEY", num_args = 1..)]
    permissions: Vec<String>,

    /// Require every listed permission instead of any one.
    #[arg(long = "all", action = clap::ArgAction::SetTrue)]
    all: bool,

    /// Simulate an authentication bootstrap that has not finished.
    #[arg(long = "uninitialized", action = clap::ArgAction::SetTrue)]
    uninitialized: bool,

    /// Simulate an authentication request in flight.
    #[arg(long = "loading", action = clap::ArgAction::SetTrue)]
    loading: bool,

    /// Redirect target on deny; without it the fallback is rendered.
    #[arg(long = "redirect", value_name = "PATH")]
    redirect: Option<String>,
}

impl RouteCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let requirement =
            Requirement::from_parts(self.permission.as_deref(), &self.permissions, self.all);
        let mut guard = RouteGuard::new(requirement).with_resolver(&resolver);
        if let Some(path) = self.redirect {
            guard = guard.redirect_to(path);
        }
        let auth = AuthSnapshot {
            user: user.as_ref(),
            initialized: !self.uninitialized,
            loading: self.loading,
        };
        let state = guard.evaluate(&auth);
        let navigator = RecordingNavigator::new();
        let rendered = guard.render(
            &auth,
            &navigator,
            Views {
                children: || "children",
                fallback: || "fallback",
                loading: || "loading",
            },
        );
        let view = match &rendered {
            Rendered::Redirected(_) => "redirect",
            Rendered::Children(view) | Rendered::Fallback(view) | Rendered::Loading(view) => *view,
        };
        let navigations: Vec<_> = navigator
            .visits()
            .into_iter()
            .map(|(path, options)| json!({ "path": path, "replace": options.replace }))
            .collect();
        emit(&json!({
            "state": format!("{:?}", state),
            "rendered": view,
            "redirect": rendered.redirect(),
            "navigations": navigations,
        }))
    }
}

#[derive(Debug, Args)]
pub struct RoleCommand {
    #[command(flatten)]
    subject: SubjectArgs,

    /// Accepted role names (any one matches).
    #[arg(long = "role", value_name = "NAME", required = true, num_args = 1..)]
    roles: Vec<String>,

    /// Redirect target on deny; without it the fallback is rendered.
    #[arg(long = "redirect", value_name = "PATH")]
    redirect: Option<String>,
}

impl RoleCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let user = self.subject.load()?;
        let resolver = config.resolver();
        let mut guard = RoleGuard::any_of(self.roles).with_resolver(&resolver);
        if let Some(path) = self.redirect {
            guard = guard.redirect_to(path);
        }
        let navigator = RecordingNavigator::new();
        let rendered = guard.render(user.as_ref(), &navigator, || "children", || "fallback");
        emit(&json!({
            "role": resolver.get_user_role(user.as_ref()),
            "rendered": rendered.clone().into_view().unwrap_or("redirect"),
            "redirect": rendered.redirect(),
        }))
    }
}
