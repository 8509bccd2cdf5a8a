//! ---
//! crm_section: "01-core-functionality"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Shared configuration and tracing utilities."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use r_crm_authz::{
    NavigationItem, NavigationMap, Permission, PermissionResolver, RolePolicy, LOGIN_PATH,
    SUPER_ADMIN_ROLE, UNAUTHORIZED_PATH,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_super_admin_role() -> String {
    SUPER_ADMIN_ROLE.to_owned()
}

fn default_login_path() -> String {
    LOGIN_PATH.to_owned()
}

fn default_unauthorized_path() -> String {
    UNAUTHORIZED_PATH.to_owned()
}

/// Primary configuration object for R-CRM tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tracing output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Super-administrator name and landing paths.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Default grants per role name; entries replace or extend the built-in map.
    #[serde(default)]
    pub roles: IndexMap<String, RoleConfig>,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// File the configuration was read from.
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "R_CRM_CONFIG";

    /// Load configuration from disk, respecting the `R_CRM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Load the first existing candidate, or fall back to built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let env_set = std::env::var(Self::ENV_CONFIG_PATH)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        if env_set || candidates.iter().any(|c| c.as_ref().exists()) {
            return Self::load(candidates);
        }
        debug!("no configuration file found; using built-in defaults");
        Ok(Self::default())
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.auth.super_admin_role.trim().is_empty() {
            return Err(anyhow!("auth.super_admin_role cannot be empty"));
        }
        for (role, grants) in &self.roles {
            if role.trim().is_empty() {
                return Err(anyhow!("role names cannot be empty"));
            }
            if role == &self.auth.super_admin_role {
                return Err(anyhow!(
                    "role '{}' is the super-administrator and cannot carry default grants",
                    role
                ));
            }
            grants.validate(role)?;
        }
        self.navigation_map().validate()?;
        Ok(())
    }

    /// Role policy combining the built-in defaults with `[roles]` overrides.
    pub fn role_policy(&self) -> RolePolicy {
        self.roles.iter().fold(
            RolePolicy::new().with_super_admin(self.auth.super_admin_role.clone()),
            |policy, (role, grants)| policy.with_role_defaults(role.clone(), grants.permissions.clone()),
        )
    }

    /// Resolver bound to [`AppConfig::role_policy`].
    pub fn resolver(&self) -> PermissionResolver {
        PermissionResolver::new(self.role_policy())
    }

    /// Navigation lists and landing paths.
    pub fn navigation_map(&self) -> NavigationMap {
        let defaults = NavigationMap::default();
        let primary = self
            .navigation
            .primary
            .clone()
            .unwrap_or_else(|| defaults.primary().to_vec());
        let settings = self
            .navigation
            .settings
            .clone()
            .unwrap_or_else(|| defaults.settings().to_vec());
        NavigationMap::new(primary, settings)
            .with_paths(self.auth.login_path.clone(), self.auth.unauthorized_path.clone())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Tracing output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files; console-only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Console encoding.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// File name prefix for rolling logs; the service name when unset.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

/// Access-control identity and landing paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Role name that bypasses every permission check.
    #[serde(default = "default_super_admin_role")]
    pub super_admin_role: String,
    /// Where visitors without a user are sent.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where signed-in users with no reachable route are sent.
    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            super_admin_role: default_super_admin_role(),
            login_path: default_login_path(),
            unauthorized_path: default_unauthorized_path(),
        }
    }
}

/// Default grants for one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Permission keys; replaces the built-in set for the role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleConfig {
    fn validate(&self, role: &str) -> Result<()> {
        for permission in &self.permissions {
            permission
                .parse::<Permission>()
                .with_context(|| format!("role '{}' lists an invalid permission", role))?;
        }
        Ok(())
    }
}

/// Navigation overrides; an absent list keeps the built-in one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Primary navigation, in priority order.
    #[serde(default)]
    pub primary: Option<Vec<NavigationItem>>,
    #[serde(default)]
    pub settings: Option<Vec<NavigationItem>>,
}
