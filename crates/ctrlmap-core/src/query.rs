// ── Query engine ──
//
// The read side: the four inventory questions answered against one
// snapshot. Forest expansions are memoized per (controller, hierarchy
// version); any hierarchy change bumps the version, so stale entries
// are simply never asked for again and get pruned on the next insert.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use serde::Serialize;
use tracing::trace;

use crate::error::InventoryError;
use crate::model::{
    Controller, ControllerDeviceGroup, ControllerId, DeploymentTarget, Device, DeviceId, GroupId,
};
use crate::resolver::DeviceOwnership;
use crate::store::{InventoryState, Snapshot};

// ── Expansion cache ─────────────────────────────────────────────────

/// Memoized depth-first group order per controller forest.
#[derive(Debug, Default)]
pub struct ExpansionCache {
    entries: DashMap<(ControllerId, u64), Arc<[GroupId]>>,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized expansions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn expand(&self, state: &InventoryState, controller: ControllerId) -> Arc<[GroupId]> {
        let version = state.hierarchy_version();
        if let Some(hit) = self.entries.get(&(controller, version)) {
            trace!(%controller, version, "expansion cache hit");
            return Arc::clone(hit.value());
        }
        trace!(%controller, version, "expansion cache miss");

        let ids: Arc<[GroupId]> = state.forest().forest_of(&controller).map(|g| g.id).collect();
        self.entries.retain(|(_, v), _| *v >= version);
        self.entries.insert((controller, version), Arc::clone(&ids));
        ids
    }
}

// ── Query ───────────────────────────────────────────────────────────

/// Read-only questions over one snapshot.
#[derive(Debug, Clone)]
pub struct Query {
    snapshot: Snapshot,
    cache: Arc<ExpansionCache>,
}

impl Query {
    pub fn new(snapshot: Snapshot, cache: Arc<ExpansionCache>) -> Self {
        Self { snapshot, cache }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The unique controller owning `group`.
    pub fn controller_managing_group(&self, group: &GroupId) -> Result<ControllerId, InventoryError> {
        self.snapshot.controller_of_group(group)
    }

    /// Both ownership paths for `device`.
    pub fn controllers_managing_device(&self, device: &DeviceId) -> Result<DeviceOwnership, InventoryError> {
        self.snapshot.controller_of_device(device)
    }

    /// Every group in `controller`'s forest, depth-first in sibling order.
    pub fn groups_under_controller(&self, controller: &ControllerId) -> Result<GroupsUnder<'_>, InventoryError> {
        self.controller_exists(controller)?;
        Ok(GroupsUnder {
            state: self.snapshot.state(),
            ids: self.cache.expand(&self.snapshot, *controller),
            pos: 0,
        })
    }

    /// Devices managed through `controller`'s forest, plus, reported
    /// separately, the hardware the controller is deployed on.
    pub fn devices_under_controller(&self, controller: &ControllerId) -> Result<DevicesUnder, InventoryError> {
        let record = self.controller_exists(controller)?;

        let mut managed = IndexSet::new();
        for group in self.groups_under_controller(controller)? {
            managed.extend(self.snapshot.group_members(&group.id).into_iter().map(|d| d.id));
        }

        let deployment: Vec<Arc<Device>> = match record.deployed_to {
            DeploymentTarget::Unassigned => Vec::new(),
            DeploymentTarget::Device(id) => self.snapshot.device(&id).into_iter().cloned().collect(),
            DeploymentTarget::RedundancyGroup(id) => self
                .snapshot
                .redundancy_members(&id)
                .into_iter()
                .cloned()
                .collect(),
        };

        Ok(DevicesUnder {
            controller: *controller,
            managed: managed
                .iter()
                .filter_map(|id| self.snapshot.device(id))
                .cloned()
                .collect(),
            deployment_target: record.deployed_to,
            deployment,
        })
    }

    fn controller_exists(&self, controller: &ControllerId) -> Result<Arc<Controller>, InventoryError> {
        self.snapshot
            .controller(controller)
            .cloned()
            .ok_or(InventoryError::NotFound {
                entity: (*controller).into(),
            })
    }
}

/// Lazy walk over a memoized forest expansion.
///
/// Clones walk independently and yield the same sequence.
#[derive(Debug, Clone)]
pub struct GroupsUnder<'a> {
    state: &'a InventoryState,
    ids: Arc<[GroupId]>,
    pos: usize,
}

impl<'a> Iterator for GroupsUnder<'a> {
    type Item = &'a Arc<ControllerDeviceGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.ids.get(self.pos) {
            self.pos += 1;
            if let Some(group) = self.state.group(id) {
                return Some(group);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len().saturating_sub(self.pos)))
    }
}

/// Answer to "which devices sit under this controller?".
#[derive(Debug, Clone, Serialize)]
pub struct DevicesUnder {
    pub controller: ControllerId,
    /// Members of the controller's groups, de-duplicated, in forest order.
    pub managed: Vec<Arc<Device>>,
    pub deployment_target: DeploymentTarget,
    /// The device, or redundancy group members, the controller runs on.
    pub deployment: Vec<Arc<Device>>,
}

impl DevicesUnder {
    pub fn managed_labels(&self) -> Vec<&str> {
        self.managed.iter().map(|d| d.label()).collect()
    }

    pub fn deployment_labels(&self) -> Vec<&str> {
        self.deployment.iter().map(|d| d.label()).collect()
    }
}
