//! ---
//! crm_section: "05-external-interfaces"
//! crm_subsection: "binary"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Control CLI for inspecting permission decisions."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use r_crm_common::{init_tracing, AppConfig};

mod evaluate;
mod inspect;
mod subject;

const CONFIG_CANDIDATES: &[&str] = &["r-crm.toml", "config/r-crm.toml", "/etc/r-crm/r-crm.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-CRM access-control inspection utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to R_CRM_CONFIG or the standard locations).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List the permission catalog and default role grants")]
    Catalog(inspect::CatalogCommand),
    #[command(about = "Check one or more permissions for a user")]
    Check(evaluate::CheckCommand),
    #[command(about = "Show the resolved role and effective permissions of a user")]
    Permissions(evaluate::PermissionsCommand),
    #[command(about = "Evaluate the route guard for a user")]
    Route(evaluate::RouteCommand),
    #[command(about = "Evaluate the role guard for a user")]
    Role(evaluate::RoleCommand),
    #[command(about = "List navigation entries reachable by a user")]
    Nav(inspect::NavCommand),
    #[command(about = "Compute the post-login landing page for a user")]
    Landing(inspect::LandingCommand),
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::load(&[path]),
        None => AppConfig::load_or_default(CONFIG_CANDIDATES),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing("r-crmctl", &config.logging)?;
    match cli.command {
        Commands::Catalog(cmd) => cmd.execute(&config)?,
        Commands::Check(cmd) => cmd.execute(&config)?,
        Commands::Permissions(cmd) => cmd.execute(&config)?,
        Commands::Route(cmd) => cmd.execute(&config)?,
        Commands::Role(cmd) => cmd.execute(&config)?,
        Commands::Nav(cmd) => cmd.execute(&config)?,
        Commands::Landing(cmd) => cmd.execute(&config)?,
    }
    Ok(())
}
