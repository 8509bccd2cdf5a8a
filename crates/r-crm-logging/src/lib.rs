//! ---
//! crm_section: "03-logging"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Structured logging context and access-event helpers."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Role name of the subject under evaluation.
    pub role: Option<&'a str>,
    /// Route or navigation path being evaluated.
    pub route: Option<&'a str>,
    /// Permission key being checked.
    pub permission: Option<&'a str>,
    /// Guard variant emitting the event.
    pub guard: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a role name.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a route path.
    pub fn with_route(mut self, route: &'a str) -> Self {
        self.route = Some(route);
        self
    }

    /// Attach a permission key.
    pub fn with_permission(mut self, permission: &'a str) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Attach the guard variant.
    pub fn with_guard(mut self, guard: &'a str) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// Outcome attached to access-control log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// Access was granted.
    Granted,
    /// Access was denied and the fallback was shown.
    Denied,
    /// Access was denied and a redirect was issued.
    Redirected,
}

impl AccessOutcome {
    /// Stable lowercase label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Granted => "granted",
            AccessOutcome::Denied => "denied",
            AccessOutcome::Redirected => "redirected",
        }
    }
}

/// Emit a standardized access event with a granted/denied outcome.
pub fn log_access_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: AccessOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let role = ctx.role.unwrap_or("");
    let route = ctx.route.unwrap_or("");
    let permission = ctx.permission.unwrap_or("");
    let guard = ctx.guard.unwrap_or("");
    // Grants are routine; only denials surface at info.
    match outcome {
        AccessOutcome::Granted => tracing::event!(
            Level::DEBUG,
            event,
            outcome = outcome.as_str(),
            role,
            route,
            permission,
            guard,
            message = %message
        ),
        _ => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            role,
            route,
            permission,
            guard,
            message = %message
        ),
    }
}
