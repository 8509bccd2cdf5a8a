//! ---
//! crm_section: "01-core-functionality"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Shared configuration and tracing utilities."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Shared primitives for R-CRM tools.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the CLI and by embedding applications.

pub mod config;
pub mod logging;

pub use config::{AppConfig, AuthConfig, LoadedAppConfig, LoggingConfig, NavigationConfig, RoleConfig};
pub use logging::{init_tracing, LogFormat};
