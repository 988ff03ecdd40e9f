//! Command dispatch: bridges CLI args -> engine queries -> output formatting.

pub mod config_cmd;
pub mod controllers;
pub mod devices;
pub mod groups;
pub mod redundancy;
pub mod util;
pub mod validate;

use std::path::PathBuf;

use tracing::debug;

use ctrlmap_config::{Config, config_path};
use ctrlmap_core::{Declarations, Inventory, LoadReport};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output::Render;

/// An inventory loaded from one declaration file.
pub struct Session {
    pub inventory: Inventory,
    pub report: LoadReport,
    pub path: PathBuf,
}

impl Session {
    /// Resolve the declaration file, build the policy and load the batch.
    pub fn open(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        let path = global
            .inventory
            .clone()
            .or_else(|| cfg.inventory.clone())
            .ok_or_else(|| CliError::NoInventory {
                config_path: config_path().display().to_string(),
            })?;

        let mut policy = cfg.policy()?;
        if let Some(scope) = global.group_names {
            policy.group_name_scope = scope.into();
        }

        let declarations = Declarations::from_path(&path)?;
        debug!(path = %path.display(), declarations = declarations.len(), "loading inventory");

        let inventory = Inventory::new(policy)?;
        let report = inventory
            .load(&declarations)
            .map_err(|e| CliError::from_load(&path, e))?;

        Ok(Self {
            inventory,
            report,
            path,
        })
    }
}

/// Dispatch an inventory-bound command to the appropriate handler.
pub fn dispatch(cmd: Command, session: &Session, render: &Render) -> Result<(), CliError> {
    match cmd {
        Command::Validate => validate::handle(session, render),
        Command::Controllers(args) => controllers::handle(&session.inventory, args, render),
        Command::Groups(args) => groups::handle(&session.inventory, args, render),
        Command::Devices(args) => devices::handle(&session.inventory, args, render),
        Command::RedundancyGroups(args) => redundancy::handle(&session.inventory, args, render),
        // Config and Completions are handled before an inventory is loaded
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not operate on an inventory".into(),
        }),
    }
}
