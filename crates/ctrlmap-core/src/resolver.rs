// ── Membership resolver ──
//
// Maps devices and groups to the controllers responsible for them.
// A device reaches controllers along two independent relations:
//
//   hierarchy   device -> its device group -> that group's controller
//   deployment  controllers deployed on the device itself, or on the
//               redundancy group the device belongs to
//
// The two are never merged into one answer behind the caller's back.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::InventoryError;
use crate::model::{ControllerId, DeviceId, GroupId};
use crate::store::InventoryState;

/// Which relation a single-answer ownership question is about.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OwnershipPath {
    Hierarchy,
    Deployment,
}

/// Both answers to "which controller owns this device?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOwnership {
    pub device: DeviceId,
    /// Owner of the device's controller device group, if it has one.
    pub via_hierarchy: Option<ControllerId>,
    /// Controllers deployed on the device or on its redundancy group.
    pub via_deployment: Vec<ControllerId>,
}

impl DeviceOwnership {
    /// Every controller named by either path.
    pub fn controllers(&self) -> BTreeSet<ControllerId> {
        self.via_hierarchy
            .iter()
            .chain(&self.via_deployment)
            .copied()
            .collect()
    }

    /// More than one distinct controller claims the device.
    pub fn is_ambiguous(&self) -> bool {
        self.controllers().len() > 1
    }

    pub fn is_unowned(&self) -> bool {
        self.via_hierarchy.is_none() && self.via_deployment.is_empty()
    }

    /// The single controller along one relation.
    ///
    /// The deployment path can itself name several controllers (two
    /// controllers deployed on the same redundancy group); that is an
    /// `AmbiguousOwnership` error too.
    pub fn via(&self, path: OwnershipPath) -> Result<Option<ControllerId>, InventoryError> {
        match path {
            OwnershipPath::Hierarchy => Ok(self.via_hierarchy),
            OwnershipPath::Deployment => match self.via_deployment.as_slice() {
                [] => Ok(None),
                [only] => Ok(Some(*only)),
                _ => Err(self.ambiguity()),
            },
        }
    }

    /// The one controller responsible for the device across both paths.
    pub fn unique(&self) -> Result<Option<ControllerId>, InventoryError> {
        let all = self.controllers();
        if all.len() > 1 {
            return Err(self.ambiguity());
        }
        Ok(all.into_iter().next())
    }

    fn ambiguity(&self) -> InventoryError {
        InventoryError::AmbiguousOwnership {
            device: self.device.into(),
            via_hierarchy: self.via_hierarchy,
            via_deployment: self.via_deployment.clone(),
        }
    }
}

impl InventoryState {
    /// The controller owning `group`'s forest.
    pub fn controller_of_group(&self, group: &GroupId) -> Result<ControllerId, InventoryError> {
        self.group(group)
            .map(|g| g.controller)
            .ok_or(InventoryError::NotFound {
                entity: (*group).into(),
            })
    }

    /// The single controller device group holding `device`, if any.
    pub fn group_of(&self, device: &DeviceId) -> Result<Option<GroupId>, InventoryError> {
        self.device(device)
            .map(|d| d.controller_group)
            .ok_or(InventoryError::NotFound {
                entity: (*device).into(),
            })
    }

    /// Resolve both ownership paths for `device`.
    pub fn controller_of_device(&self, device: &DeviceId) -> Result<DeviceOwnership, InventoryError> {
        let record = self.device(device).ok_or(InventoryError::NotFound {
            entity: (*device).into(),
        })?;

        let via_hierarchy = record
            .controller_group
            .and_then(|g| self.group(&g))
            .map(|g| g.controller);

        let mut deployed = BTreeSet::new();
        if let Some(direct) = self.links.device_deployments.get(device) {
            deployed.extend(direct.iter().copied());
        }
        if let Some(cluster) = record
            .redundancy_group
            .and_then(|g| self.links.redundancy_deployments.get(&g))
        {
            deployed.extend(cluster.iter().copied());
        }

        Ok(DeviceOwnership {
            device: *device,
            via_hierarchy,
            via_deployment: deployed.into_iter().collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ownership(hierarchy: Option<ControllerId>, deployment: Vec<ControllerId>) -> DeviceOwnership {
        DeviceOwnership {
            device: DeviceId::generate(),
            via_hierarchy: hierarchy,
            via_deployment: deployment,
        }
    }

    #[test]
    fn one_controller_on_both_paths_is_not_ambiguous() {
        let c = ControllerId::generate();
        let own = ownership(Some(c), vec![c]);
        assert!(!own.is_ambiguous());
        assert_eq!(own.unique().unwrap(), Some(c));
    }

    #[test]
    fn different_controllers_keep_both_answers() {
        let a = ControllerId::generate();
        let b = ControllerId::generate();
        let own = ownership(Some(a), vec![b]);

        assert!(own.is_ambiguous());
        assert_eq!(own.via(OwnershipPath::Hierarchy).unwrap(), Some(a));
        assert_eq!(own.via(OwnershipPath::Deployment).unwrap(), Some(b));
        assert!(matches!(
            own.unique(),
            Err(InventoryError::AmbiguousOwnership { .. })
        ));
    }

    #[test]
    fn two_deployed_controllers_make_the_deployment_path_ambiguous() {
        let own = ownership(None, vec![ControllerId::generate(), ControllerId::generate()]);
        assert!(own.via(OwnershipPath::Deployment).is_err());
        assert_eq!(own.via(OwnershipPath::Hierarchy).unwrap(), None);
    }

    #[test]
    fn unowned_device_has_no_answer() {
        let own = ownership(None, Vec::new());
        assert!(own.is_unowned());
        assert_eq!(own.unique().unwrap(), None);
    }

    #[test]
    fn path_names_parse() {
        assert_eq!("deployment".parse::<OwnershipPath>().unwrap(), OwnershipPath::Deployment);
        assert_eq!(OwnershipPath::Hierarchy.to_string(), "hierarchy");
    }
}
