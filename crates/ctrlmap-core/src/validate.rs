// ── Consistency validator ──
//
// Every mutation moves `Proposal -> ValidatedMutation -> Receipt`.
// Validation reads one state and resolves the mutation into a `Plan`
// of concrete record edits; committing applies that plan to a draft
// cloned from the same state, so commit itself cannot fail.
//
// Checks run in a fixed order: the addressed entity must exist, then
// uniqueness, referential existence, hierarchy shape (cycle and
// cross-controller), single membership, and finally field rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::command::{
    CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, CreateRedundancyGroupRequest,
    Mutation, MutationPhase, Receipt, UpdateControllerRequest, UpdateDeviceRequest,
    UpdateGroupRequest, UpdateRedundancyGroupRequest,
};
use crate::error::InventoryError;
use crate::model::{
    Controller, ControllerDeviceGroup, ControllerId, DeploymentTarget, Device, DeviceId,
    DeviceRedundancyGroup, EntityKind, EntityRef, GroupId, RedundancyGroupId,
};
use crate::policy::{DeletePolicy, GroupReassignment, Policy};
use crate::store::InventoryState;

/// A mutation that has not been checked yet.
#[derive(Debug, Clone)]
pub struct Proposal {
    mutation: Mutation,
}

impl Proposal {
    pub fn new(mutation: Mutation) -> Self {
        Self { mutation }
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn phase(&self) -> MutationPhase {
        MutationPhase::Proposed
    }

    /// Run every check against `state`. Nothing is written.
    pub fn validate(
        self,
        state: &InventoryState,
        policy: &Policy,
    ) -> Result<ValidatedMutation, InventoryError> {
        policy.validate()?;
        let plan = Checker { state, policy }.plan(&self.mutation)?;
        Ok(ValidatedMutation {
            mutation: self.mutation,
            plan,
            base_version: state.version(),
        })
    }
}

/// A mutation that passed validation against one specific state version.
#[derive(Debug, Clone)]
pub struct ValidatedMutation {
    mutation: Mutation,
    plan: Plan,
    base_version: u64,
}

impl ValidatedMutation {
    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn phase(&self) -> MutationPhase {
        MutationPhase::Validated
    }

    /// The record this mutation creates or addresses.
    pub fn entity(&self) -> EntityRef {
        self.plan.entity()
    }

    /// State version this mutation was validated against.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Apply to a draft of the state this was validated against.
    ///
    /// Applying to any other version is a logic error and leaves the
    /// draft untouched.
    pub fn commit(self, draft: &mut InventoryState) -> Option<Receipt> {
        if draft.version() != self.base_version {
            return None;
        }
        let entity = self.plan.entity();
        self.plan.apply(draft);
        let version = draft.bump();
        debug!(kind = self.mutation.kind(), %entity, version, "mutation committed");
        Some(Receipt {
            entity,
            version,
            phase: MutationPhase::Committed,
        })
    }
}

// ── Plans ───────────────────────────────────────────────────────────

/// Resolved record edits for one mutation.
#[derive(Debug, Clone)]
enum Plan {
    PutController(Controller),
    DeleteController { id: ControllerId },
    PutGroup(ControllerDeviceGroup),
    DeleteGroup { id: GroupId },
    Attach { parent: GroupId, child: GroupId },
    Detach { node: GroupId },
    Reorder { node: GroupId, weight: i32 },
    PutDevice(Device),
    DeleteDevice { id: DeviceId },
    PutRedundancyGroup(DeviceRedundancyGroup),
    DeleteRedundancyGroup { id: RedundancyGroupId },
}

impl Plan {
    fn entity(&self) -> EntityRef {
        match self {
            Self::PutController(c) => c.id.into(),
            Self::DeleteController { id } => (*id).into(),
            Self::PutGroup(g) => g.id.into(),
            Self::DeleteGroup { id }
            | Self::Attach { child: id, .. }
            | Self::Detach { node: id }
            | Self::Reorder { node: id, .. } => (*id).into(),
            Self::PutDevice(d) => d.id.into(),
            Self::DeleteDevice { id } => (*id).into(),
            Self::PutRedundancyGroup(g) => g.id.into(),
            Self::DeleteRedundancyGroup { id } => (*id).into(),
        }
    }

    fn apply(self, draft: &mut InventoryState) {
        match self {
            Self::PutController(c) => draft.put_controller(c),
            Self::DeleteController { id } => {
                draft.take_forest(&id);
                draft.take_controller(&id);
            }
            Self::PutGroup(g) => draft.put_group(g),
            Self::DeleteGroup { id } => {
                draft.take_group(&id);
            }
            Self::Attach { parent, child } => draft.forest.attach(parent, &child),
            Self::Detach { node } => draft.forest.detach(&node),
            Self::Reorder { node, weight } => draft.forest.reorder(&node, weight),
            Self::PutDevice(d) => draft.put_device(d),
            Self::DeleteDevice { id } => {
                draft.clear_deployments(DeploymentTarget::Device(id));
                draft.take_device(&id);
            }
            Self::PutRedundancyGroup(g) => draft.put_redundancy_group(g),
            Self::DeleteRedundancyGroup { id } => {
                draft.take_redundancy_group(&id);
            }
        }
    }
}

// ── Checks ──────────────────────────────────────────────────────────

struct Checker<'a> {
    state: &'a InventoryState,
    policy: &'a Policy,
}

impl Checker<'_> {
    fn plan(&self, mutation: &Mutation) -> Result<Plan, InventoryError> {
        match mutation {
            Mutation::CreateController(req) => self.create_controller(req),
            Mutation::UpdateController { id, update } => self.update_controller(id, update),
            Mutation::DeleteController { id } => self.delete_controller(id),
            Mutation::SetDeploymentTarget { controller, target } => {
                self.set_deployment_target(controller, *target)
            }

            Mutation::CreateGroup(req) => self.create_group(req),
            Mutation::UpdateGroup { id, update } => self.update_group(id, update),
            Mutation::DeleteGroup { id } => self.delete_group(id),
            Mutation::AttachChild { parent, child } => {
                self.state.forest.check_attach(parent, child)?;
                Ok(Plan::Attach {
                    parent: *parent,
                    child: *child,
                })
            }
            Mutation::DetachChild { node } => {
                self.group(node)?;
                Ok(Plan::Detach { node: *node })
            }
            Mutation::Reorder { node, weight } => {
                self.group(node)?;
                Ok(Plan::Reorder {
                    node: *node,
                    weight: *weight,
                })
            }

            Mutation::CreateDevice(req) => self.create_device(req),
            Mutation::UpdateDevice { id, update } => self.update_device(id, update),
            Mutation::DeleteDevice { id } => self.delete_device(id),
            Mutation::AssignDeviceGroup { device, group } => self.place_device(device, group, true),
            Mutation::MoveDevice { device, group } => self.place_device(device, group, false),
            Mutation::UnassignDeviceGroup { device } => {
                let mut next = Device::clone(self.device(device)?);
                next.controller_group = None;
                Ok(Plan::PutDevice(touched(next)))
            }
            Mutation::JoinRedundancyGroup {
                device,
                group,
                priority,
            } => self.join_redundancy_group(device, group, *priority),
            Mutation::LeaveRedundancyGroup { device } => {
                let mut next = Device::clone(self.device(device)?);
                next.redundancy_group = None;
                next.redundancy_group_priority = None;
                Ok(Plan::PutDevice(touched(next)))
            }

            Mutation::CreateRedundancyGroup(req) => self.create_redundancy_group(req),
            Mutation::UpdateRedundancyGroup { id, update } => {
                self.update_redundancy_group(id, update)
            }
            Mutation::DeleteRedundancyGroup { id } => self.delete_redundancy_group(id),
        }
    }

    // ── Controllers ──────────────────────────────────────────────────

    fn create_controller(&self, req: &CreateControllerRequest) -> Result<Plan, InventoryError> {
        let id = ControllerId::generate();
        self.unique_controller_name(&req.name, id)?;
        self.deployment_target_exists(id, req.deployed_to)?;
        non_empty(id.into(), "name", &req.name)?;

        let now = Utc::now();
        Ok(Plan::PutController(Controller {
            id,
            name: req.name.clone(),
            status: req.status,
            role: req.role.clone(),
            tenant: req.tenant.clone(),
            description: req.description.clone(),
            platform: req.platform.clone(),
            external_integration: req.external_integration.clone(),
            location: req.location.clone(),
            deployed_to: req.deployed_to,
            created: now,
            last_updated: now,
        }))
    }

    fn update_controller(
        &self,
        id: &ControllerId,
        update: &UpdateControllerRequest,
    ) -> Result<Plan, InventoryError> {
        let mut next = Controller::clone(self.controller(id)?);
        if let Some(name) = &update.name {
            self.unique_controller_name(name, *id)?;
            non_empty((*id).into(), "name", name)?;
            next.name.clone_from(name);
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(description) = &update.description {
            next.description.clone_from(description);
        }
        set_opt(&mut next.role, update.role.as_ref());
        set_opt(&mut next.tenant, update.tenant.as_ref());
        set_opt(&mut next.platform, update.platform.as_ref());
        set_opt(&mut next.external_integration, update.external_integration.as_ref());
        set_opt(&mut next.location, update.location.as_ref());
        Ok(Plan::PutController(touched(next)))
    }

    fn set_deployment_target(
        &self,
        id: &ControllerId,
        target: DeploymentTarget,
    ) -> Result<Plan, InventoryError> {
        let mut next = Controller::clone(self.controller(id)?);
        self.deployment_target_exists(*id, target)?;
        next.deployed_to = target;
        Ok(Plan::PutController(touched(next)))
    }

    fn delete_controller(&self, id: &ControllerId) -> Result<Plan, InventoryError> {
        self.controller(id)?;
        if self.policy.references.controller_groups == DeletePolicy::Restrict {
            let referenced_by = self
                .state
                .forest
                .forest_of(id)
                .map(|g| EntityRef::from(g.id))
                .collect();
            restrict((*id).into(), referenced_by)?;
        }
        Ok(Plan::DeleteController { id: *id })
    }

    // ── Controller device groups ─────────────────────────────────────

    fn create_group(&self, req: &CreateGroupRequest) -> Result<Plan, InventoryError> {
        let id = GroupId::generate();
        self.unique_group_name(req.controller, &req.name, id)?;
        if !self.state.controllers.contains(&req.controller) {
            return Err(InventoryError::ReferentialIntegrity {
                entity: id.into(),
                target: req.controller.into(),
            });
        }
        if let Some(parent) = req.parent {
            let parent_group = self.state.forest.get(&parent).ok_or(
                InventoryError::ReferentialIntegrity {
                    entity: id.into(),
                    target: parent.into(),
                },
            )?;
            if parent_group.controller != req.controller {
                return Err(InventoryError::CrossController {
                    parent: parent.into(),
                    parent_controller: parent_group.controller,
                    child: id.into(),
                    child_controller: req.controller,
                });
            }
        }
        non_empty(id.into(), "name", &req.name)?;

        let now = Utc::now();
        Ok(Plan::PutGroup(ControllerDeviceGroup {
            id,
            name: req.name.clone(),
            controller: req.controller,
            parent: req.parent,
            weight: req.weight,
            description: req.description.clone(),
            created: now,
            last_updated: now,
        }))
    }

    fn update_group(&self, id: &GroupId, update: &UpdateGroupRequest) -> Result<Plan, InventoryError> {
        let current = self.group(id)?;
        let mut next = ControllerDeviceGroup::clone(current);
        if let Some(name) = &update.name {
            next.name.clone_from(name);
        }
        if let Some(controller) = update.controller {
            next.controller = controller;
        }
        if next.name != current.name || next.controller != current.controller {
            self.unique_group_name(next.controller, &next.name, *id)?;
        }

        if next.controller != current.controller {
            if !self.state.controllers.contains(&next.controller) {
                return Err(InventoryError::ReferentialIntegrity {
                    entity: (*id).into(),
                    target: next.controller.into(),
                });
            }
            if let Some(parent) = current.parent {
                return Err(InventoryError::CrossController {
                    parent: parent.into(),
                    parent_controller: current.controller,
                    child: (*id).into(),
                    child_controller: next.controller,
                });
            }
            self.reassignment_allowed(id)?;
        }
        if let Some(description) = &update.description {
            next.description.clone_from(description);
        }
        non_empty((*id).into(), "name", &next.name)?;
        Ok(Plan::PutGroup(touched(next)))
    }

    fn reassignment_allowed(&self, id: &GroupId) -> Result<(), InventoryError> {
        let refuse = |reason: &str| InventoryError::InvalidAttribute {
            entity: (*id).into(),
            field: "controller",
            reason: reason.to_owned(),
        };
        match self.policy.group_reassignment {
            GroupReassignment::Never => Err(refuse("controller reassignment is disabled")),
            GroupReassignment::WhenEmpty => {
                if self.state.forest.has_children(id)
                    || self.state.links.group_devices.contains_key(id)
                {
                    Err(refuse("only empty groups can move to another controller"))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn delete_group(&self, id: &GroupId) -> Result<Plan, InventoryError> {
        self.group(id)?;
        let refs = &self.policy.references;
        if refs.group_children == DeletePolicy::Restrict {
            let children = self
                .state
                .forest
                .children(*id)
                .map(|g| EntityRef::from(g.id))
                .collect();
            restrict((*id).into(), children)?;
        }
        if refs.group_devices == DeletePolicy::Restrict {
            let members = self
                .state
                .forest
                .subtree(id)
                .filter_map(|g| self.state.links.group_devices.get(&g.id))
                .flatten()
                .map(|d| EntityRef::from(*d))
                .collect();
            restrict((*id).into(), members)?;
        }
        Ok(Plan::DeleteGroup { id: *id })
    }

    // ── Devices ──────────────────────────────────────────────────────

    fn create_device(&self, req: &CreateDeviceRequest) -> Result<Plan, InventoryError> {
        let id = DeviceId::generate();
        self.unique_device_keys(&req.asset_tag, req.name.as_deref(), id)?;
        if let Some(group) = req.controller_group {
            self.reference_exists(id.into(), group.into(), self.state.forest.contains(&group))?;
        }
        if let Some(group) = req.redundancy_group {
            self.reference_exists(
                id.into(),
                group.into(),
                self.state.redundancy_groups.contains(&group),
            )?;
        }

        let now = Utc::now();
        let device = Device {
            id,
            asset_tag: req.asset_tag.clone(),
            name: req.name.clone(),
            status: req.status,
            device_type: req.device_type.clone(),
            role: req.role.clone(),
            tenant: req.tenant.clone(),
            platform: req.platform.clone(),
            software_version: req.software_version.clone(),
            serial: req.serial.clone(),
            location: req.location.clone(),
            primary_ip4: req.primary_ip4,
            primary_ip6: req.primary_ip6,
            controller_group: req.controller_group,
            redundancy_group: req.redundancy_group,
            redundancy_group_priority: req.redundancy_group_priority,
            created: now,
            last_updated: now,
        };
        device_fields(&device)?;
        Ok(Plan::PutDevice(device))
    }

    fn update_device(&self, id: &DeviceId, update: &UpdateDeviceRequest) -> Result<Plan, InventoryError> {
        let mut next = Device::clone(self.device(id)?);
        if let Some(tag) = &update.asset_tag {
            next.asset_tag.clone_from(tag);
        }
        set_opt(&mut next.name, update.name.as_ref());
        self.unique_device_keys(&next.asset_tag, next.name.as_deref(), *id)?;

        if let Some(status) = update.status {
            next.status = status;
        }
        set_opt(&mut next.device_type, update.device_type.as_ref());
        set_opt(&mut next.role, update.role.as_ref());
        set_opt(&mut next.tenant, update.tenant.as_ref());
        set_opt(&mut next.platform, update.platform.as_ref());
        set_opt(&mut next.software_version, update.software_version.as_ref());
        set_opt(&mut next.serial, update.serial.as_ref());
        set_opt(&mut next.location, update.location.as_ref());
        set_opt(&mut next.primary_ip4, update.primary_ip4.as_ref());
        set_opt(&mut next.primary_ip6, update.primary_ip6.as_ref());
        set_opt(&mut next.redundancy_group_priority, update.redundancy_group_priority.as_ref());
        device_fields(&next)?;
        Ok(Plan::PutDevice(touched(next)))
    }

    fn delete_device(&self, id: &DeviceId) -> Result<Plan, InventoryError> {
        self.device(id)?;
        if self.policy.references.device_deployments == DeletePolicy::Restrict {
            let deployed = controllers_in(self.state.links.device_deployments.get(id));
            restrict((*id).into(), deployed)?;
        }
        Ok(Plan::DeleteDevice { id: *id })
    }

    /// `exclusive` refuses to pull a device out of a different group.
    fn place_device(&self, id: &DeviceId, group: &GroupId, exclusive: bool) -> Result<Plan, InventoryError> {
        let current = self.device(id)?;
        self.reference_exists((*id).into(), (*group).into(), self.state.forest.contains(group))?;
        if exclusive {
            if let Some(existing) = current.controller_group.filter(|g| g != group) {
                return Err(InventoryError::MultiMembership {
                    device: (*id).into(),
                    current: existing.into(),
                    requested: (*group).into(),
                });
            }
        }
        let mut next = Device::clone(current);
        next.controller_group = Some(*group);
        Ok(Plan::PutDevice(touched(next)))
    }

    fn join_redundancy_group(
        &self,
        id: &DeviceId,
        group: &RedundancyGroupId,
        priority: Option<u16>,
    ) -> Result<Plan, InventoryError> {
        let current = self.device(id)?;
        self.reference_exists(
            (*id).into(),
            (*group).into(),
            self.state.redundancy_groups.contains(group),
        )?;
        if let Some(existing) = current.redundancy_group.filter(|g| g != group) {
            return Err(InventoryError::MultiMembership {
                device: (*id).into(),
                current: existing.into(),
                requested: (*group).into(),
            });
        }
        let mut next = Device::clone(current);
        next.redundancy_group = Some(*group);
        next.redundancy_group_priority = priority;
        device_fields(&next)?;
        Ok(Plan::PutDevice(touched(next)))
    }

    // ── Redundancy groups ────────────────────────────────────────────

    fn create_redundancy_group(&self, req: &CreateRedundancyGroupRequest) -> Result<Plan, InventoryError> {
        let id = RedundancyGroupId::generate();
        self.unique_redundancy_group_name(&req.name, id)?;
        non_empty(id.into(), "name", &req.name)?;

        let now = Utc::now();
        Ok(Plan::PutRedundancyGroup(DeviceRedundancyGroup {
            id,
            name: req.name.clone(),
            status: req.status,
            description: req.description.clone(),
            failover_strategy: req.failover_strategy,
            created: now,
            last_updated: now,
        }))
    }

    fn update_redundancy_group(
        &self,
        id: &RedundancyGroupId,
        update: &UpdateRedundancyGroupRequest,
    ) -> Result<Plan, InventoryError> {
        let mut next = DeviceRedundancyGroup::clone(self.redundancy_group(id)?);
        if let Some(name) = &update.name {
            self.unique_redundancy_group_name(name, *id)?;
            non_empty((*id).into(), "name", name)?;
            next.name.clone_from(name);
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(description) = &update.description {
            next.description.clone_from(description);
        }
        if let Some(strategy) = update.failover_strategy {
            next.failover_strategy = strategy;
        }
        Ok(Plan::PutRedundancyGroup(touched(next)))
    }

    fn delete_redundancy_group(&self, id: &RedundancyGroupId) -> Result<Plan, InventoryError> {
        self.redundancy_group(id)?;
        let refs = &self.policy.references;
        if refs.redundancy_members == DeletePolicy::Restrict {
            let members = self
                .state
                .links
                .redundancy_devices
                .get(id)
                .into_iter()
                .flatten()
                .map(|d| EntityRef::from(*d))
                .collect();
            restrict((*id).into(), members)?;
        }
        if refs.redundancy_deployments == DeletePolicy::Restrict {
            let deployed = controllers_in(self.state.links.redundancy_deployments.get(id));
            restrict((*id).into(), deployed)?;
        }
        Ok(Plan::DeleteRedundancyGroup { id: *id })
    }

    // ── Existence ────────────────────────────────────────────────────

    fn controller(&self, id: &ControllerId) -> Result<&Controller, InventoryError> {
        self.state
            .controller(id)
            .map(Arc::as_ref)
            .ok_or(InventoryError::NotFound { entity: (*id).into() })
    }

    fn group(&self, id: &GroupId) -> Result<&ControllerDeviceGroup, InventoryError> {
        self.state
            .group(id)
            .map(Arc::as_ref)
            .ok_or(InventoryError::NotFound { entity: (*id).into() })
    }

    fn device(&self, id: &DeviceId) -> Result<&Device, InventoryError> {
        self.state
            .device(id)
            .map(Arc::as_ref)
            .ok_or(InventoryError::NotFound { entity: (*id).into() })
    }

    fn redundancy_group(&self, id: &RedundancyGroupId) -> Result<&DeviceRedundancyGroup, InventoryError> {
        self.state
            .redundancy_group(id)
            .map(Arc::as_ref)
            .ok_or(InventoryError::NotFound { entity: (*id).into() })
    }

    #[allow(clippy::unused_self)]
    fn reference_exists(&self, entity: EntityRef, target: EntityRef, exists: bool) -> Result<(), InventoryError> {
        if exists {
            Ok(())
        } else {
            Err(InventoryError::ReferentialIntegrity { entity, target })
        }
    }

    fn deployment_target_exists(&self, id: ControllerId, target: DeploymentTarget) -> Result<(), InventoryError> {
        let exists = match target {
            DeploymentTarget::Unassigned => true,
            DeploymentTarget::Device(d) => self.state.devices.contains(&d),
            DeploymentTarget::RedundancyGroup(g) => self.state.redundancy_groups.contains(&g),
        };
        match target.as_entity() {
            Some(target) => self.reference_exists(id.into(), target, exists),
            None => Ok(()),
        }
    }

    // ── Uniqueness ───────────────────────────────────────────────────

    fn unique_controller_name(&self, name: &str, id: ControllerId) -> Result<(), InventoryError> {
        match self.state.controllers.id_for_key(name) {
            Some(existing) if existing != id => Err(InventoryError::DuplicateName {
                kind: EntityKind::Controller,
                name: name.to_owned(),
                existing: existing.into(),
            }),
            _ => Ok(()),
        }
    }

    fn unique_group_name(&self, controller: ControllerId, name: &str, id: GroupId) -> Result<(), InventoryError> {
        let key = self.state.group_key(controller, name);
        match self.state.forest.groups.id_for_key(&key) {
            Some(existing) if existing != id => Err(InventoryError::DuplicateName {
                kind: EntityKind::ControllerDeviceGroup,
                name: name.to_owned(),
                existing: existing.into(),
            }),
            _ => Ok(()),
        }
    }

    fn unique_device_keys(&self, asset_tag: &str, name: Option<&str>, id: DeviceId) -> Result<(), InventoryError> {
        let duplicate = |name: &str, existing: DeviceId| InventoryError::DuplicateName {
            kind: EntityKind::Device,
            name: name.to_owned(),
            existing: existing.into(),
        };
        if let Some(existing) = self.state.devices.id_for_key(asset_tag).filter(|e| *e != id) {
            return Err(duplicate(asset_tag, existing));
        }
        if let Some(existing) = self.state.device_names.get(asset_tag).filter(|e| **e != id) {
            return Err(duplicate(asset_tag, *existing));
        }
        if let Some(name) = name {
            if let Some(existing) = self.state.device_names.get(name).filter(|e| **e != id) {
                return Err(duplicate(name, *existing));
            }
            // Labels resolve by name first, then asset tag; keep them disjoint.
            if let Some(existing) = self.state.devices.id_for_key(name).filter(|e| *e != id) {
                return Err(duplicate(name, existing));
            }
        }
        non_empty(id.into(), "asset_tag", asset_tag)
    }

    fn unique_redundancy_group_name(&self, name: &str, id: RedundancyGroupId) -> Result<(), InventoryError> {
        match self.state.redundancy_groups.id_for_key(name) {
            Some(existing) if existing != id => Err(InventoryError::DuplicateName {
                kind: EntityKind::DeviceRedundancyGroup,
                name: name.to_owned(),
                existing: existing.into(),
            }),
            _ => Ok(()),
        }
    }
}

// ── Field rules ─────────────────────────────────────────────────────

fn non_empty(entity: EntityRef, field: &'static str, value: &str) -> Result<(), InventoryError> {
    if value.trim().is_empty() {
        return Err(InventoryError::InvalidAttribute {
            entity,
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

fn device_fields(device: &Device) -> Result<(), InventoryError> {
    let invalid = |reason: &str| InventoryError::InvalidAttribute {
        entity: device.id.into(),
        field: "redundancy_group_priority",
        reason: reason.to_owned(),
    };
    match (device.redundancy_group_priority, device.redundancy_group) {
        (Some(0), _) => Err(invalid("must be at least 1")),
        (Some(_), None) => Err(invalid("requires a redundancy group")),
        _ => Ok(()),
    }
}

fn restrict(entity: EntityRef, referenced_by: Vec<EntityRef>) -> Result<(), InventoryError> {
    if referenced_by.is_empty() {
        Ok(())
    } else {
        Err(InventoryError::DeleteRestricted {
            entity,
            referenced_by,
        })
    }
}

fn controllers_in(ids: Option<&BTreeSet<ControllerId>>) -> Vec<EntityRef> {
    ids.into_iter().flatten().map(|c| EntityRef::from(*c)).collect()
}

fn set_opt<T: Clone>(field: &mut Option<T>, update: Option<&Option<T>>) {
    if let Some(value) = update {
        field.clone_from(value);
    }
}

/// Stamp `last_updated` on an edited record.
fn touched<T: Touch>(mut record: T) -> T {
    record.touch();
    record
}

trait Touch {
    fn touch(&mut self);
}

macro_rules! impl_touch {
    ($($t:ty),*) => {
        $(impl Touch for $t {
            fn touch(&mut self) {
                self.last_updated = Utc::now();
            }
        })*
    };
}

impl_touch!(Controller, ControllerDeviceGroup, Device, DeviceRedundancyGroup);
