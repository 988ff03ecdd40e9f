//! CLI error types with miette diagnostics.
//!
//! Maps `InventoryError` and `ConfigError` into user-facing errors with
//! actionable help text and one exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use ctrlmap_config::ConfigError;
use ctrlmap_core::{DeclarationError, InventoryError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const INTEGRITY: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const HIERARCHY: i32 = 7;
    pub const AMBIGUOUS: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Inventory file ───────────────────────────────────────────────
    #[error("No inventory file given")]
    #[diagnostic(
        code(ctrlmap::no_inventory),
        help(
            "Pass --inventory <FILE>, set CTRLMAP_INVENTORY,\n\
             or set `inventory = \"...\"` in {config_path}"
        )
    )]
    NoInventory { config_path: String },

    #[error("Could not read declarations")]
    #[diagnostic(
        code(ctrlmap::declarations),
        help("Each entry needs a `kind`: device_redundancy_group, device, controller or controller_device_group")
    )]
    Declarations(#[from] DeclarationError),

    #[error("{path}: declaration #{position} ({declaration}) was rejected")]
    #[diagnostic(
        code(ctrlmap::load_rejected),
        help("Nothing from this file was loaded. Fix the declaration and run: ctrlmap validate")
    )]
    LoadRejected {
        path: String,
        position: usize,
        declaration: String,
        #[source]
        source: Box<InventoryError>,
    },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ctrlmap::not_found),
        help("Run: ctrlmap {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Device '{device}' is claimed by more than one controller")]
    #[diagnostic(
        code(ctrlmap::ambiguous_owner),
        help(
            "hierarchy: {via_hierarchy}\n\
             deployment: {via_deployment}\n\
             Pick one relation with --via hierarchy or --via deployment"
        )
    )]
    AmbiguousOwner {
        device: String,
        via_hierarchy: String,
        via_deployment: String,
    },

    // ── Engine ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(ctrlmap::inventory))]
    Inventory(#[from] InventoryError),

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(ctrlmap::config),
        help("Check the [policy] table, or inspect it with: ctrlmap config show")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(ctrlmap::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ctrlmap::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render {format} output: {reason}")]
    #[diagnostic(code(ctrlmap::render))]
    Render { format: &'static str, reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoInventory { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::AmbiguousOwner { .. } => exit_code::AMBIGUOUS,
            Self::LoadRejected { source, .. } => inventory_exit_code(source),
            Self::Inventory(err) => inventory_exit_code(err),
            Self::Declarations(_) | Self::Io(_) | Self::Render { .. } => exit_code::GENERAL,
        }
    }

    /// Attach the file path to a failed bulk load.
    pub fn from_load(path: &std::path::Path, err: InventoryError) -> Self {
        match err {
            InventoryError::BulkLoad {
                position,
                declaration,
                source,
            } => Self::LoadRejected {
                path: path.display().to_string(),
                position,
                declaration,
                source,
            },
            other => Self::Inventory(other),
        }
    }
}

fn inventory_exit_code(err: &InventoryError) -> i32 {
    match err.root_cause() {
        InventoryError::NotFound { .. } | InventoryError::UnresolvedReference { .. } => {
            exit_code::NOT_FOUND
        }
        InventoryError::DuplicateName { .. }
        | InventoryError::MultiMembership { .. }
        | InventoryError::StaleProposal { .. } => exit_code::CONFLICT,
        InventoryError::ReferentialIntegrity { .. }
        | InventoryError::DeleteRestricted { .. }
        | InventoryError::InvalidAttribute { .. } => exit_code::INTEGRITY,
        InventoryError::Cycle { .. }
        | InventoryError::CrossController { .. }
        | InventoryError::DeclarationCycle { .. } => exit_code::HIERARCHY,
        InventoryError::AmbiguousName { .. } | InventoryError::AmbiguousOwnership { .. } => {
            exit_code::AMBIGUOUS
        }
        InventoryError::InvalidPolicy { .. } => exit_code::CONFIG,
        InventoryError::BulkLoad { .. } => exit_code::GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlmap_core::EntityKind;

    #[test]
    fn bulk_load_failures_exit_with_the_root_cause_code() {
        let err = CliError::from_load(
            std::path::Path::new("inventory.yaml"),
            InventoryError::BulkLoad {
                position: 3,
                declaration: "controller_device_group campus".into(),
                source: Box::new(InventoryError::UnresolvedReference {
                    kind: EntityKind::Controller,
                    name: "Panorama1".into(),
                }),
            },
        );
        assert_eq!(
            err.to_string(),
            "inventory.yaml: declaration #3 (controller_device_group campus) was rejected"
        );
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn declaration_cycles_are_hierarchy_errors() {
        let err = CliError::Inventory(InventoryError::DeclarationCycle {
            names: vec!["a".into(), "b".into(), "a".into()],
        });
        assert_eq!(err.exit_code(), exit_code::HIERARCHY);
    }

    #[test]
    fn unsupported_policy_is_a_config_error() {
        let err = CliError::Inventory(InventoryError::InvalidPolicy {
            field: "group_devices",
            reason: "cannot cascade".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFIG);
    }
}
