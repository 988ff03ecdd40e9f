// ── Mutation API ──
//
// All writes flow through a single `Mutation` enum. The inventory runs
// each one through the validator and commits it as a unit; reads never
// touch this path.

pub mod requests;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{ControllerId, DeploymentTarget, DeviceId, EntityRef, GroupId, RedundancyGroupId};
use crate::store::InventoryState;

pub use requests::{
    CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, CreateRedundancyGroupRequest,
    UpdateControllerRequest, UpdateDeviceRequest, UpdateGroupRequest, UpdateRedundancyGroupRequest,
};

/// Every write the engine accepts.
#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Mutation {
    // ── Controller CRUD ──────────────────────────────────────────────
    CreateController(CreateControllerRequest),
    UpdateController {
        id: ControllerId,
        update: UpdateControllerRequest,
    },
    DeleteController {
        id: ControllerId,
    },
    SetDeploymentTarget {
        controller: ControllerId,
        target: DeploymentTarget,
    },

    // ── ControllerDeviceGroup CRUD ───────────────────────────────────
    CreateGroup(CreateGroupRequest),
    UpdateGroup {
        id: GroupId,
        update: UpdateGroupRequest,
    },
    DeleteGroup {
        id: GroupId,
    },

    // ── Hierarchy ────────────────────────────────────────────────────
    /// Place `child` under `parent`. Re-parents if `child` already has one.
    AttachChild {
        parent: GroupId,
        child: GroupId,
    },
    /// Make `node` a top-level group of its controller.
    DetachChild {
        node: GroupId,
    },
    Reorder {
        node: GroupId,
        weight: i32,
    },

    // ── Device CRUD ──────────────────────────────────────────────────
    CreateDevice(CreateDeviceRequest),
    UpdateDevice {
        id: DeviceId,
        update: UpdateDeviceRequest,
    },
    DeleteDevice {
        id: DeviceId,
    },

    // ── Device membership ────────────────────────────────────────────
    /// Put an unmanaged device into a group. Fails if it already sits
    /// in a different group.
    AssignDeviceGroup {
        device: DeviceId,
        group: GroupId,
    },
    /// Move a device to `group`, leaving whatever group it was in.
    MoveDevice {
        device: DeviceId,
        group: GroupId,
    },
    UnassignDeviceGroup {
        device: DeviceId,
    },
    JoinRedundancyGroup {
        device: DeviceId,
        group: RedundancyGroupId,
        priority: Option<u16>,
    },
    LeaveRedundancyGroup {
        device: DeviceId,
    },

    // ── DeviceRedundancyGroup CRUD ───────────────────────────────────
    CreateRedundancyGroup(CreateRedundancyGroupRequest),
    UpdateRedundancyGroup {
        id: RedundancyGroupId,
        update: UpdateRedundancyGroupRequest,
    },
    DeleteRedundancyGroup {
        id: RedundancyGroupId,
    },
}

impl Mutation {
    /// Short snake_case name for logging.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether the mutation can claim or change a unique name.
    pub(crate) fn touches_names(&self) -> bool {
        match self {
            Self::CreateController(_)
            | Self::CreateGroup(_)
            | Self::CreateDevice(_)
            | Self::CreateRedundancyGroup(_) => true,
            Self::UpdateController { update, .. } => update.name.is_some(),
            Self::UpdateGroup { update, .. } => {
                update.name.is_some() || update.controller.is_some()
            }
            Self::UpdateDevice { update, .. } => {
                update.name.is_some() || update.asset_tag.is_some()
            }
            Self::UpdateRedundancyGroup { update, .. } => update.name.is_some(),
            _ => false,
        }
    }

    /// Controller forests this mutation edits, judged against `state`.
    ///
    /// Used only to pick write locks; commit re-checks against the
    /// exact snapshot it was validated on.
    pub(crate) fn forests(&self, state: &InventoryState) -> BTreeSet<ControllerId> {
        let owner = |g: &GroupId| state.forest.get(g).map(|g| g.controller);
        let device_owner = |d: &DeviceId| {
            state
                .devices
                .get(d)
                .and_then(|d| d.controller_group)
                .and_then(|g| owner(&g))
        };

        let mut out = BTreeSet::new();
        match self {
            Self::CreateGroup(req) => {
                out.insert(req.controller);
            }
            Self::UpdateGroup { id, update } => {
                out.extend(owner(id));
                out.extend(update.controller);
            }
            Self::DeleteGroup { id } | Self::DetachChild { node: id } | Self::Reorder { node: id, .. } => {
                out.extend(owner(id));
            }
            Self::AttachChild { parent, child } => {
                out.extend(owner(parent));
                out.extend(owner(child));
            }
            Self::DeleteController { id } => {
                out.insert(*id);
            }
            Self::CreateDevice(req) => {
                out.extend(req.controller_group.as_ref().and_then(owner));
            }
            Self::AssignDeviceGroup { device, group } | Self::MoveDevice { device, group } => {
                out.extend(device_owner(device));
                out.extend(owner(group));
            }
            Self::UnassignDeviceGroup { device } | Self::DeleteDevice { id: device } => {
                out.extend(device_owner(device));
            }
            _ => {}
        }
        out
    }
}

/// Where a mutation is in its life.
///
/// `Proposed → Validated → Committed`, or `Proposed → Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationPhase {
    Proposed,
    Validated,
    Committed,
    Rejected,
}

/// Proof of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// The record the mutation created or addressed.
    pub entity: EntityRef,
    /// Inventory version after the commit.
    pub version: u64,
    pub phase: MutationPhase,
}
