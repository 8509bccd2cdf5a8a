//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "User and role shapes supplied by the application state."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Subjects of authorization decisions.
//!
//! Upstream data encodes a user's role in several ways: a bare role name, or a
//! populated role object whose permission list holds either `{ "key": .. }`
//! objects or plain strings. Deserialization accepts all of them and anything
//! unrecognised degrades to "no explicit permissions" rather than an error.

use std::collections::BTreeSet;

use r_crm_logging::crm_warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a role's explicit permission list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionRef {
    /// Plain permission key.
    Key(String),
    /// Populated permission record exposing a `key` field.
    Keyed {
        /// Permission key.
        key: String,
    },
    /// Any other encoding; contributes nothing.
    Unrecognized(Value),
}

impl PermissionRef {
    /// Permission key carried by this entry, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            PermissionRef::Key(key) | PermissionRef::Keyed { key } => Some(key.as_str()),
            PermissionRef::Unrecognized(_) => None,
        }
    }
}

impl From<&str> for PermissionRef {
    fn from(key: &str) -> Self {
        PermissionRef::Key(key.to_owned())
    }
}

/// Populated role record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleObject {
    /// Role name; may be missing in partially populated records.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Explicit permission list, accepted under `permissions` or `permission`.
    #[serde(
        default,
        alias = "permission",
        deserialize_with = "lenient::permission_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub permissions: Option<Vec<PermissionRef>>,
}

/// Role as it arrives from upstream data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleRef {
    /// Bare role name with no attached permission list.
    Name(String),
    /// Role object with name and explicit permissions.
    Object(RoleObject),
    /// Unusable encoding; treated like a missing role.
    Unrecognized(Value),
}

impl RoleRef {
    /// Role object built from a name and explicit permission keys.
    pub fn with_permissions<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RoleRef::Object(RoleObject {
            name: Some(name.into()),
            permissions: Some(
                keys.into_iter()
                    .map(|key| PermissionRef::from(key.as_ref()))
                    .collect(),
            ),
        })
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_owned())
    }
}

/// Authenticated user as seen by the access-control core.
///
/// Only `role` drives decisions; other fields are preserved so callers can
/// round-trip the record they received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Assigned role in any supported shape.
    #[serde(default)]
    pub role: Option<RoleRef>,
    /// Remaining fields of the upstream record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// User holding `role`.
    pub fn with_role(role: impl Into<RoleRef>) -> Self {
        Self {
            role: Some(role.into()),
            extra: Map::new(),
        }
    }

    /// User with no role attached.
    pub fn without_role() -> Self {
        Self::default()
    }
}

/// Flat view of a role shared by every resolver operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRole<'a> {
    /// Resolved role name.
    pub name: Option<&'a str>,
    /// Explicit permission keys; empty means "none attached".
    pub explicit: BTreeSet<&'a str>,
}

impl<'a> NormalizedRole<'a> {
    /// Normalize the role of `user`. `None` means the user is absent or has no role.
    pub fn of(user: Option<&'a User>) -> Option<Self> {
        let role = user?.role.as_ref()?;
        let normalized = match role {
            RoleRef::Name(name) => NormalizedRole {
                name: non_empty(name),
                explicit: BTreeSet::new(),
            },
            RoleRef::Object(object) => NormalizedRole {
                name: object.name.as_deref().and_then(non_empty),
                explicit: object
                    .permissions
                    .iter()
                    .flatten()
                    .filter_map(PermissionRef::key)
                    .collect(),
            },
            RoleRef::Unrecognized(value) => {
                crm_warn!("ignoring unrecognised role encoding: {}", value);
                return None;
            }
        };
        // An empty bare name is the same as having no role at all.
        if matches!(role, RoleRef::Name(_)) && normalized.name.is_none() {
            return None;
        }
        Some(normalized)
    }

    /// Whether `role` names this role.
    pub fn is(&self, role: &str) -> bool {
        self.name == Some(role)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::PermissionRef;

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(name) => Some(name),
            _ => None,
        })
    }

    pub fn permission_list<'de, D>(deserializer: D) -> Result<Option<Vec<PermissionRef>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(key) => PermissionRef::Key(key),
                        Value::Object(mut fields) => match fields.remove("key") {
                            Some(Value::String(key)) => PermissionRef::Keyed { key },
                            Some(other) => {
                                fields.insert("key".into(), other);
                                PermissionRef::Unrecognized(Value::Object(fields))
                            }
                            None => PermissionRef::Unrecognized(Value::Object(fields)),
                        },
                        other => PermissionRef::Unrecognized(other),
                    })
                    .collect(),
            ),
            _ => None,
        })
    }
}
