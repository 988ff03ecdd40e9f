// ── Record-level commit helpers ──
//
// The only code that writes to an `InventoryState`. Each helper stores
// or removes one record and keeps the reverse link indexes in step with
// the id references it holds. Callers have already validated the edit.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use chrono::Utc;

use super::InventoryState;
use crate::model::{
    Controller, ControllerDeviceGroup, ControllerId, DeploymentTarget, Device, DeviceId,
    DeviceRedundancyGroup, GroupId, RedundancyGroupId,
};

impl InventoryState {
    pub(crate) fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    // ── Controllers ──────────────────────────────────────────────────

    pub(crate) fn put_controller(&mut self, controller: Controller) {
        let old = self.controllers.get(&controller.id).map(|c| c.deployed_to);
        if let Some(old) = old {
            self.unlink_deployment(controller.id, old);
        }
        self.link_deployment(controller.id, controller.deployed_to);
        self.controllers
            .upsert(Some(controller.name.clone()), controller);
    }

    pub(crate) fn take_controller(&mut self, id: &ControllerId) -> Option<Arc<Controller>> {
        let removed = self.controllers.remove(id)?;
        self.unlink_deployment(*id, removed.deployed_to);
        Some(removed)
    }

    /// Point every controller deployed on `target` at nothing.
    pub(crate) fn clear_deployments(&mut self, target: DeploymentTarget) {
        let deployed: Vec<ControllerId> = match target {
            DeploymentTarget::Device(id) => set_of(&self.links.device_deployments, &id),
            DeploymentTarget::RedundancyGroup(id) => set_of(&self.links.redundancy_deployments, &id),
            DeploymentTarget::Unassigned => Vec::new(),
        };
        let now = Utc::now();
        for id in deployed {
            if let Some(current) = self.controllers.get(&id) {
                let mut next = Controller::clone(current);
                next.deployed_to = DeploymentTarget::Unassigned;
                next.last_updated = now;
                self.put_controller(next);
            }
        }
    }

    fn link_deployment(&mut self, controller: ControllerId, target: DeploymentTarget) {
        match target {
            DeploymentTarget::Device(id) => {
                self.links.device_deployments.entry(id).or_default().insert(controller);
            }
            DeploymentTarget::RedundancyGroup(id) => {
                self.links
                    .redundancy_deployments
                    .entry(id)
                    .or_default()
                    .insert(controller);
            }
            DeploymentTarget::Unassigned => {}
        }
    }

    fn unlink_deployment(&mut self, controller: ControllerId, target: DeploymentTarget) {
        match target {
            DeploymentTarget::Device(id) => {
                unlink(&mut self.links.device_deployments, &id, &controller);
            }
            DeploymentTarget::RedundancyGroup(id) => {
                unlink(&mut self.links.redundancy_deployments, &id, &controller);
            }
            DeploymentTarget::Unassigned => {}
        }
    }

    // ── Controller device groups ─────────────────────────────────────

    pub(crate) fn put_group(&mut self, group: ControllerDeviceGroup) {
        let key = self.group_key(group.controller, &group.name);
        self.forest.upsert(Some(key), group);
    }

    /// Remove `group` and its subtree, leaving member devices unmanaged.
    pub(crate) fn take_group(&mut self, group: &GroupId) -> Vec<Arc<ControllerDeviceGroup>> {
        let removed = self.forest.remove_subtree(group);
        self.release_members(&removed);
        removed
    }

    /// Remove a controller's whole forest, leaving member devices unmanaged.
    pub(crate) fn take_forest(&mut self, controller: &ControllerId) -> Vec<Arc<ControllerDeviceGroup>> {
        let removed = self.forest.remove_controller(controller);
        self.release_members(&removed);
        removed
    }

    fn release_members(&mut self, groups: &[Arc<ControllerDeviceGroup>]) {
        let now = Utc::now();
        for group in groups {
            for id in set_of(&self.links.group_devices, &group.id) {
                if let Some(current) = self.devices.get(&id) {
                    let mut next = Device::clone(current);
                    next.controller_group = None;
                    next.last_updated = now;
                    self.put_device(next);
                }
            }
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub(crate) fn put_device(&mut self, device: Device) {
        if let Some(old) = self.devices.get(&device.id).cloned() {
            self.unlink_device(&old);
        }
        if let Some(group) = device.controller_group {
            self.links.group_devices.entry(group).or_default().insert(device.id);
        }
        if let Some(group) = device.redundancy_group {
            self.links
                .redundancy_devices
                .entry(group)
                .or_default()
                .insert(device.id);
        }
        if let Some(name) = &device.name {
            self.device_names.insert(name.clone(), device.id);
        }
        self.devices.upsert(Some(device.asset_tag.clone()), device);
    }

    /// Remove a device. Controllers deployed on it must already be cleared.
    pub(crate) fn take_device(&mut self, id: &DeviceId) -> Option<Arc<Device>> {
        let removed = self.devices.remove(id)?;
        self.unlink_device(&removed);
        self.links.device_deployments.remove(id);
        Some(removed)
    }

    fn unlink_device(&mut self, device: &Device) {
        if let Some(group) = device.controller_group {
            unlink(&mut self.links.group_devices, &group, &device.id);
        }
        if let Some(group) = device.redundancy_group {
            unlink(&mut self.links.redundancy_devices, &group, &device.id);
        }
        if let Some(name) = &device.name {
            if self.device_names.get(name) == Some(&device.id) {
                self.device_names.remove(name);
            }
        }
    }

    // ── Redundancy groups ────────────────────────────────────────────

    pub(crate) fn put_redundancy_group(&mut self, group: DeviceRedundancyGroup) {
        self.redundancy_groups.upsert(Some(group.name.clone()), group);
    }

    /// Remove a redundancy group, dropping its members' membership and
    /// un-deploying controllers that ran on it.
    pub(crate) fn take_redundancy_group(
        &mut self,
        id: &RedundancyGroupId,
    ) -> Option<Arc<DeviceRedundancyGroup>> {
        let removed = self.redundancy_groups.remove(id)?;
        let now = Utc::now();
        for member in set_of(&self.links.redundancy_devices, id) {
            if let Some(current) = self.devices.get(&member) {
                let mut next = Device::clone(current);
                next.redundancy_group = None;
                next.redundancy_group_priority = None;
                next.last_updated = now;
                self.put_device(next);
            }
        }
        self.clear_deployments(DeploymentTarget::RedundancyGroup(*id));
        self.links.redundancy_deployments.remove(id);
        Some(removed)
    }
}

fn set_of<K: Eq + Hash, V: Copy>(map: &HashMap<K, BTreeSet<V>>, key: &K) -> Vec<V> {
    map.get(key).map(|s| s.iter().copied().collect()).unwrap_or_default()
}

fn unlink<K: Eq + Hash, V: Ord>(map: &mut HashMap<K, BTreeSet<V>>, key: &K, value: &V) {
    if let Some(set) = map.get_mut(key) {
        set.remove(value);
        if set.is_empty() {
            map.remove(key);
        }
    }
}
