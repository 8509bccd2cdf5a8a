//! ---
//! crm_section: "05-external-interfaces"
//! crm_subsection: "binary"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Control CLI for inspecting permission decisions."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use r_crm_authz::User;
use serde::Serialize;

/// Where the user document comes from.
#[derive(Debug, Clone, Args)]
pub struct SubjectArgs {
    /// JSON user document; `-` reads stdin. Omit for an unauthenticated visitor.
    #[arg(long = "user", value_name = "FILE")]
    user: Option<PathBuf>,
}

impl SubjectArgs {
    /// Parsed user, or `None` when absent or the document is `null`.
    pub fn load(&self) -> Result<Option<User>> {
        let Some(path) = &self.user else {
            return Ok(None);
        };
        let contents = if path.as_os_str() == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("unable to read user document from stdin")?;
            buffer
        } else {
            fs::read_to_string(path)
                .with_context(|| format!("unable to read user document {}", path.display()))?
        };
        serde_json::from_str::<Option<User>>(&contents)
            .with_context(|| format!("user document {} is not valid JSON", path.display()))
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
