// ── Inventory state and the entity store ──
//
// `InventoryState` is one immutable version of the whole inventory.
// Writers clone it into a draft, edit the draft, and publish it as the
// next version; readers hold a `Snapshot` and never see a half-applied
// mutation.

mod apply;
pub(crate) mod collection;
mod inventory;

use std::collections::{BTreeSet, HashMap};
use std::ops::Deref;
use std::sync::Arc;

use collection::Collection;

use crate::error::InventoryError;
use crate::hierarchy::Forest;
use crate::model::{
    Controller, ControllerDeviceGroup, ControllerId, Device, DeviceId, DeviceRedundancyGroup,
    EntityKind, GroupId, RedundancyGroupId,
};
use crate::policy::GroupNameScope;

pub use inventory::Inventory;

/// Reverse indexes over the id references held in records.
#[derive(Debug, Clone, Default)]
pub(crate) struct Links {
    pub(crate) group_devices: HashMap<GroupId, BTreeSet<DeviceId>>,
    pub(crate) redundancy_devices: HashMap<RedundancyGroupId, BTreeSet<DeviceId>>,
    pub(crate) device_deployments: HashMap<DeviceId, BTreeSet<ControllerId>>,
    pub(crate) redundancy_deployments: HashMap<RedundancyGroupId, BTreeSet<ControllerId>>,
}

/// One consistent version of the inventory.
#[derive(Debug, Clone)]
pub struct InventoryState {
    pub(crate) group_scope: GroupNameScope,
    pub(crate) controllers: Collection<Controller>,
    pub(crate) forest: Forest,
    /// Keyed by asset tag.
    pub(crate) devices: Collection<Device>,
    /// Device names are unique only when present, so they live outside
    /// the collection's key index.
    pub(crate) device_names: HashMap<String, DeviceId>,
    pub(crate) redundancy_groups: Collection<DeviceRedundancyGroup>,
    pub(crate) links: Links,
    pub(crate) version: u64,
}

impl InventoryState {
    pub fn new(group_scope: GroupNameScope) -> Self {
        Self {
            group_scope,
            controllers: Collection::default(),
            forest: Forest::default(),
            devices: Collection::default(),
            device_names: HashMap::new(),
            redundancy_groups: Collection::default(),
            links: Links::default(),
            version: 0,
        }
    }

    // ── Versions ─────────────────────────────────────────────────────

    /// Number of mutations committed to reach this state.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version of the group forest alone.
    pub fn hierarchy_version(&self) -> u64 {
        self.forest.version()
    }

    pub fn group_name_scope(&self) -> GroupNameScope {
        self.group_scope
    }

    // ── Single-record lookups ────────────────────────────────────────

    pub fn controller(&self, id: &ControllerId) -> Option<&Arc<Controller>> {
        self.controllers.get(id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Arc<ControllerDeviceGroup>> {
        self.forest.get(id)
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    pub fn redundancy_group(&self, id: &RedundancyGroupId) -> Option<&Arc<DeviceRedundancyGroup>> {
        self.redundancy_groups.get(id)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    // ── Lookups by name ──────────────────────────────────────────────

    pub fn controller_by_name(&self, name: &str) -> Option<&Arc<Controller>> {
        self.controllers.get_by_key(name)
    }

    pub fn device_by_asset_tag(&self, asset_tag: &str) -> Option<&Arc<Device>> {
        self.devices.get_by_key(asset_tag)
    }

    pub fn device_by_name(&self, name: &str) -> Option<&Arc<Device>> {
        self.device_names.get(name).and_then(|id| self.devices.get(id))
    }

    /// Name first, then asset tag. A device name never equals another
    /// device's asset tag, so at most one record matches.
    pub fn device_by_label(&self, label: &str) -> Option<&Arc<Device>> {
        self.device_by_name(label)
            .or_else(|| self.device_by_asset_tag(label))
    }

    pub fn redundancy_group_by_name(&self, name: &str) -> Option<&Arc<DeviceRedundancyGroup>> {
        self.redundancy_groups.get_by_key(name)
    }

    /// Find a group by name, optionally within one controller's forest.
    ///
    /// Under per-controller naming the same name may exist in several
    /// forests; an unqualified lookup that matches more than one is an
    /// `AmbiguousName` error.
    pub fn group_by_name(
        &self,
        name: &str,
        controller: Option<ControllerId>,
    ) -> Result<Option<&Arc<ControllerDeviceGroup>>, InventoryError> {
        if let Some(controller) = controller {
            let found = self
                .forest
                .groups
                .get_by_key(&self.group_key(controller, name))
                .filter(|g| g.controller == controller);
            return Ok(found);
        }
        if self.group_scope == GroupNameScope::Global {
            return Ok(self.forest.groups.get_by_key(name));
        }

        let mut matches = self.forest.groups.values().filter(|g| g.name == name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(InventoryError::AmbiguousName {
                kind: EntityKind::ControllerDeviceGroup,
                name: name.to_owned(),
            });
        }
        Ok(first)
    }

    // ── Ordered listings ─────────────────────────────────────────────

    /// Every controller, by name.
    pub fn controllers(&self) -> Vec<&Arc<Controller>> {
        let mut out: Vec<_> = self.controllers.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Every device, by label.
    pub fn devices(&self) -> Vec<&Arc<Device>> {
        let mut out: Vec<_> = self.devices.values().collect();
        out.sort_by(|a, b| a.label().cmp(b.label()));
        out
    }

    /// Every redundancy group, by name.
    pub fn redundancy_groups(&self) -> Vec<&Arc<DeviceRedundancyGroup>> {
        let mut out: Vec<_> = self.redundancy_groups.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Devices placed directly in `group` (not its descendants), by label.
    pub fn group_members(&self, group: &GroupId) -> Vec<&Arc<Device>> {
        let mut out = self.resolve_devices(self.links.group_devices.get(group));
        out.sort_by(|a, b| a.label().cmp(b.label()));
        out
    }

    /// Members of a redundancy group by priority (unset last), then label.
    pub fn redundancy_members(&self, group: &RedundancyGroupId) -> Vec<&Arc<Device>> {
        let mut out = self.resolve_devices(self.links.redundancy_devices.get(group));
        out.sort_by(|a, b| {
            let pa = a.redundancy_group_priority.unwrap_or(u16::MAX);
            let pb = b.redundancy_group_priority.unwrap_or(u16::MAX);
            pa.cmp(&pb).then_with(|| a.label().cmp(b.label()))
        });
        out
    }

    // ── Counts ───────────────────────────────────────────────────────

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn group_count(&self) -> usize {
        self.forest.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn redundancy_group_count(&self) -> usize {
        self.redundancy_groups.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Unique-key string for a group under the configured scope.
    pub(crate) fn group_key(&self, controller: ControllerId, name: &str) -> String {
        match self.group_scope {
            GroupNameScope::Global => name.to_owned(),
            GroupNameScope::PerController => format!("{controller}/{name}"),
        }
    }

    fn resolve_devices(&self, ids: Option<&BTreeSet<DeviceId>>) -> Vec<&Arc<Device>> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.devices.get(id))
            .collect()
    }
}

impl Default for InventoryState {
    fn default() -> Self {
        Self::new(GroupNameScope::default())
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// A cheap, immutable handle on one published inventory version.
///
/// Holding a snapshot never blocks writers; they publish new versions
/// alongside it.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<InventoryState>);

impl Snapshot {
    pub(crate) fn new(state: Arc<InventoryState>) -> Self {
        Self(state)
    }

    pub(crate) fn state(&self) -> &Arc<InventoryState> {
        &self.0
    }
}

impl Deref for Snapshot {
    type Target = InventoryState;

    fn deref(&self) -> &InventoryState {
        &self.0
    }
}
