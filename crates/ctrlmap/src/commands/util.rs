//! Shared helpers for command handlers: name lookups and labels.

use std::sync::Arc;

use ctrlmap_core::{
    Controller, ControllerDeviceGroup, ControllerId, DeploymentTarget, Device,
    DeviceRedundancyGroup, GroupId, InventoryState,
};

use crate::error::CliError;

fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> CliError {
    CliError::NotFound {
        resource_type: resource_type.into(),
        identifier: identifier.into(),
        list_command: list_command.into(),
    }
}

/// Resolve a controller by name.
pub fn controller<'a>(state: &'a InventoryState, name: &str) -> Result<&'a Arc<Controller>, CliError> {
    state
        .controller_by_name(name)
        .ok_or_else(|| not_found("controller", name, "controllers list"))
}

/// Resolve a group by name, optionally qualified by its controller's name.
pub fn group<'a>(
    state: &'a InventoryState,
    name: &str,
    controller_name: Option<&str>,
) -> Result<&'a Arc<ControllerDeviceGroup>, CliError> {
    let scope = match controller_name {
        Some(c) => Some(controller(state, c)?.id),
        None => None,
    };
    state
        .group_by_name(name, scope)?
        .ok_or_else(|| not_found("group", name, "groups list"))
}

/// Resolve a device by name, falling back to asset tag.
pub fn device<'a>(state: &'a InventoryState, label: &str) -> Result<&'a Arc<Device>, CliError> {
    state
        .device_by_label(label)
        .ok_or_else(|| not_found("device", label, "devices list"))
}

/// Resolve a redundancy group by name.
pub fn redundancy_group<'a>(
    state: &'a InventoryState,
    name: &str,
) -> Result<&'a Arc<DeviceRedundancyGroup>, CliError> {
    state
        .redundancy_group_by_name(name)
        .ok_or_else(|| not_found("redundancy group", name, "redundancy-groups list"))
}

// ── Labels ──────────────────────────────────────────────────────────

pub fn controller_name(state: &InventoryState, id: ControllerId) -> String {
    state
        .controller(&id)
        .map_or_else(|| id.to_string(), |c| c.name.clone())
}

pub fn group_name(state: &InventoryState, id: GroupId) -> String {
    state
        .group(&id)
        .map_or_else(|| id.to_string(), |g| g.name.clone())
}

/// Human label for where a controller runs.
pub fn target_label(state: &InventoryState, target: DeploymentTarget) -> String {
    match target {
        DeploymentTarget::Unassigned => "-".into(),
        DeploymentTarget::Device(id) => state
            .device(&id)
            .map_or_else(|| id.to_string(), |d| d.label().to_owned()),
        DeploymentTarget::RedundancyGroup(id) => state
            .redundancy_group(&id)
            .map_or_else(|| id.to_string(), |g| format!("{} (redundancy group)", g.name)),
    }
}
