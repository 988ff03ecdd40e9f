// ── Runtime engine policy ──
//
// These types describe the configurable points of the consistency
// model. They never touch disk: `ctrlmap-config` (or a test) builds a
// `Policy` and hands it to `Inventory::new`.

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Scope within which controller device group names must be unique.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GroupNameScope {
    /// One name across every controller's forest.
    #[default]
    Global,
    /// Names only need to be unique within one controller's forest.
    PerController,
}

/// What happens to referencing records when their target is deleted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeletePolicy {
    /// Delete the referencing records too.
    Cascade,
    /// Clear the reference and keep the referencing record.
    SetNull,
    /// Refuse the delete while references exist.
    Restrict,
}

/// When a group may be moved to a different controller.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GroupReassignment {
    /// The owning controller is fixed at creation.
    Never,
    /// Allowed while the group has no child groups and no member devices.
    #[default]
    WhenEmpty,
}

/// Delete behaviour for every relationship in the model.
///
/// | deleted                 | referencing relation               | default   |
/// |-------------------------|------------------------------------|-----------|
/// | Controller              | ControllerDeviceGroup.controller   | Restrict  |
/// | ControllerDeviceGroup   | child ControllerDeviceGroup.parent | Cascade   |
/// | ControllerDeviceGroup   | Device.controller_group            | SetNull   |
/// | Device                  | Controller.deployed_to             | SetNull   |
/// | DeviceRedundancyGroup   | Device.redundancy_group            | SetNull   |
/// | DeviceRedundancyGroup   | Controller.deployed_to             | SetNull   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePolicies {
    pub controller_groups: DeletePolicy,
    pub group_children: DeletePolicy,
    pub group_devices: DeletePolicy,
    pub device_deployments: DeletePolicy,
    pub redundancy_members: DeletePolicy,
    pub redundancy_deployments: DeletePolicy,
}

impl Default for ReferencePolicies {
    fn default() -> Self {
        Self {
            controller_groups: DeletePolicy::Restrict,
            group_children: DeletePolicy::Cascade,
            group_devices: DeletePolicy::SetNull,
            device_deployments: DeletePolicy::SetNull,
            redundancy_members: DeletePolicy::SetNull,
            redundancy_deployments: DeletePolicy::SetNull,
        }
    }
}

/// Every configurable consistency rule, in one place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub group_name_scope: GroupNameScope,
    pub group_reassignment: GroupReassignment,
    pub references: ReferencePolicies,
}

impl Policy {
    /// Check the table for combinations the engine cannot honour.
    ///
    /// Devices are never deleted as a side effect of a group or
    /// redundancy-group delete, and a redundancy group never cascades
    /// into the controllers deployed on it.
    pub fn validate(&self) -> Result<(), InventoryError> {
        let r = &self.references;
        if r.group_children == DeletePolicy::SetNull {
            return Err(InventoryError::InvalidPolicy {
                field: "group_children",
                reason: "cannot be set-null; orphaned groups would change forests".into(),
            });
        }
        for (field, policy) in [
            ("group_devices", r.group_devices),
            ("device_deployments", r.device_deployments),
            ("redundancy_members", r.redundancy_members),
            ("redundancy_deployments", r.redundancy_deployments),
        ] {
            if policy == DeletePolicy::Cascade {
                return Err(InventoryError::InvalidPolicy {
                    field,
                    reason: "cannot cascade".into(),
                });
            }
        }
        if r.controller_groups == DeletePolicy::SetNull {
            return Err(InventoryError::InvalidPolicy {
                field: "controller_groups",
                reason: "cannot be set-null; every group needs a controller".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_reference_table() {
        let policy = Policy::default();
        assert_eq!(policy.group_name_scope, GroupNameScope::Global);
        assert_eq!(policy.references.controller_groups, DeletePolicy::Restrict);
        assert_eq!(policy.references.group_children, DeletePolicy::Cascade);
        assert_eq!(policy.references.group_devices, DeletePolicy::SetNull);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn cascading_device_deletes_are_refused() {
        let mut policy = Policy::default();
        policy.references.group_devices = DeletePolicy::Cascade;
        let err = policy.validate().unwrap_err();
        assert_eq!(
            err,
            InventoryError::InvalidPolicy {
                field: "group_devices",
                reason: "cannot cascade".into(),
            }
        );
        assert_eq!(err.to_string(), "invalid policy: group_devices cannot cascade");
    }

    #[test]
    fn orphaning_group_children_is_refused() {
        let mut policy = Policy::default();
        policy.references.group_children = DeletePolicy::SetNull;
        assert!(matches!(
            policy.validate(),
            Err(InventoryError::InvalidPolicy { field: "group_children", .. })
        ));
    }

    #[test]
    fn scope_parses_from_config_strings() {
        assert_eq!(
            "per-controller".parse::<GroupNameScope>().unwrap(),
            GroupNameScope::PerController
        );
        assert_eq!("set-null".parse::<DeletePolicy>().unwrap(), DeletePolicy::SetNull);
    }
}
