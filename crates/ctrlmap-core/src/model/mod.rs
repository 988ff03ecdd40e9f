//! Canonical domain types held by the inventory.

mod common;
mod controller;
mod device;
mod entity_id;
mod group;
mod redundancy;

use std::fmt;
use std::hash::Hash;

pub use common::{DeploymentTarget, FailoverStrategy, Status};
pub use controller::Controller;
pub use device::Device;
pub use entity_id::{ControllerId, DeviceId, EntityKind, EntityRef, GroupId, RedundancyGroupId};
pub use group::{ControllerDeviceGroup, DEFAULT_GROUP_WEIGHT};
pub use redundancy::DeviceRedundancyGroup;

/// Common surface of the four stored record kinds.
pub trait Record {
    type Id: Copy + Eq + Ord + Hash + fmt::Debug + Into<EntityRef>;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;
}

impl Record for Controller {
    type Id = ControllerId;
    const KIND: EntityKind = EntityKind::Controller;

    fn id(&self) -> ControllerId {
        self.id
    }
}

impl Record for ControllerDeviceGroup {
    type Id = GroupId;
    const KIND: EntityKind = EntityKind::ControllerDeviceGroup;

    fn id(&self) -> GroupId {
        self.id
    }
}

impl Record for Device {
    type Id = DeviceId;
    const KIND: EntityKind = EntityKind::Device;

    fn id(&self) -> DeviceId {
        self.id
    }
}

impl Record for DeviceRedundancyGroup {
    type Id = RedundancyGroupId;
    const KIND: EntityKind = EntityKind::DeviceRedundancyGroup;

    fn id(&self) -> RedundancyGroupId {
        self.id
    }
}
