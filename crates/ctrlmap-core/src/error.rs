// ── Core error types ──
//
// Every rejection the engine can produce. Errors are detected before a
// mutation commits and always name the offending entities; the engine
// never corrects a request on the caller's behalf.

use thiserror::Error;

use crate::model::{ControllerId, EntityKind, EntityRef};

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    // ── Uniqueness ───────────────────────────────────────────────────
    #[error("{kind} named '{name}' already exists ({existing})")]
    DuplicateName {
        kind: EntityKind,
        name: String,
        existing: EntityRef,
    },

    // ── Referential integrity ────────────────────────────────────────
    #[error("{entity} not found")]
    NotFound { entity: EntityRef },

    #[error("{entity} references missing {target}")]
    ReferentialIntegrity { entity: EntityRef, target: EntityRef },

    #[error("cannot delete {entity}: still referenced by {} record(s)", .referenced_by.len())]
    DeleteRestricted {
        entity: EntityRef,
        referenced_by: Vec<EntityRef>,
    },

    #[error("no {kind} named '{name}'")]
    UnresolvedReference { kind: EntityKind, name: String },

    #[error("{kind} name '{name}' matches more than one record; qualify it with a controller")]
    AmbiguousName { kind: EntityKind, name: String },

    // ── Hierarchy ────────────────────────────────────────────────────
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: EntityRef, child: EntityRef },

    #[error(
        "{child} belongs to controller {child_controller} but {parent} belongs to controller {parent_controller}"
    )]
    CrossController {
        parent: EntityRef,
        parent_controller: ControllerId,
        child: EntityRef,
        child_controller: ControllerId,
    },

    #[error("controller device groups {} form a parent cycle", .names.join(" -> "))]
    DeclarationCycle { names: Vec<String> },

    // ── Membership ───────────────────────────────────────────────────
    #[error("{device} is already a member of {current}; cannot also join {requested}")]
    MultiMembership {
        device: EntityRef,
        current: EntityRef,
        requested: EntityRef,
    },

    #[error(
        "{device} has ambiguous ownership: hierarchy path {}, deployment path {}",
        fmt_controller(.via_hierarchy),
        fmt_controllers(.via_deployment)
    )]
    AmbiguousOwnership {
        device: EntityRef,
        via_hierarchy: Option<ControllerId>,
        via_deployment: Vec<ControllerId>,
    },

    // ── Field rules ──────────────────────────────────────────────────
    #[error("invalid {field} on {entity}: {reason}")]
    InvalidAttribute {
        entity: EntityRef,
        field: &'static str,
        reason: String,
    },

    #[error("mutation of {entity} was validated at version {expected} but the state is at {found}")]
    StaleProposal {
        entity: EntityRef,
        expected: u64,
        found: u64,
    },

    #[error("invalid policy: {field} {reason}")]
    InvalidPolicy { field: &'static str, reason: String },

    // ── Bulk load ────────────────────────────────────────────────────
    #[error("declaration #{position} ({declaration}) rejected: {source}")]
    BulkLoad {
        position: usize,
        declaration: String,
        #[source]
        source: Box<InventoryError>,
    },
}

impl InventoryError {
    /// The innermost error, unwrapping bulk-load context.
    pub fn root_cause(&self) -> &InventoryError {
        match self {
            Self::BulkLoad { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[allow(clippy::ref_option)]
fn fmt_controller(id: &Option<ControllerId>) -> String {
    id.map_or_else(|| "none".to_owned(), |id| id.to_string())
}

fn fmt_controllers(ids: &[ControllerId]) -> String {
    if ids.is_empty() {
        return "none".to_owned();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceId, GroupId};

    #[test]
    fn restricted_delete_counts_references() {
        let err = InventoryError::DeleteRestricted {
            entity: EntityRef::Controller(ControllerId::generate()),
            referenced_by: vec![
                EntityRef::ControllerDeviceGroup(GroupId::generate()),
                EntityRef::ControllerDeviceGroup(GroupId::generate()),
            ],
        };
        assert!(err.to_string().ends_with("still referenced by 2 record(s)"));
    }

    #[test]
    fn ambiguous_ownership_lists_both_paths() {
        let a = ControllerId::generate();
        let b = ControllerId::generate();
        let err = InventoryError::AmbiguousOwnership {
            device: EntityRef::Device(DeviceId::generate()),
            via_hierarchy: Some(a),
            via_deployment: vec![b],
        };
        let text = err.to_string();
        assert!(text.contains(&format!("hierarchy path {a}")));
        assert!(text.contains(&format!("deployment path {b}")));
    }

    #[test]
    fn stale_proposal_names_both_versions() {
        let id = ControllerId::generate();
        let err = InventoryError::StaleProposal {
            entity: EntityRef::Controller(id),
            expected: 4,
            found: 5,
        };
        assert_eq!(
            err.to_string(),
            format!("mutation of {} was validated at version 4 but the state is at 5", EntityRef::Controller(id))
        );
    }

    #[test]
    fn root_cause_unwraps_bulk_context() {
        let inner = InventoryError::UnresolvedReference {
            kind: EntityKind::Controller,
            name: "Panorama1".into(),
        };
        let err = InventoryError::BulkLoad {
            position: 3,
            declaration: "controller_device_group campus".into(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(err.root_cause(), &inner);
        insta::assert_snapshot!(
            err.to_string(),
            @"declaration #3 (controller_device_group campus) rejected: no controller named 'Panorama1'"
        );
    }
}
