// ── Typed request structs for Mutation payloads ──
//
// Create requests carry the full field set of a new record. Update
// requests are sparse: `None` leaves a field alone, and nullable fields
// use `Option<Option<_>>` so `Some(None)` clears them.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::model::{
    ControllerId, DEFAULT_GROUP_WEIGHT, DeploymentTarget, FailoverStrategy, GroupId,
    RedundancyGroupId, Status,
};

// ── Controller ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateControllerRequest {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_integration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub deployed_to: DeploymentTarget,
}

impl CreateControllerRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateControllerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_integration: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
}

// ── ControllerDeviceGroup ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub controller: ControllerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupId>,
    #[serde(default = "default_weight")]
    pub weight: i32,
    #[serde(default)]
    pub description: String,
}

fn default_weight() -> i32 {
    DEFAULT_GROUP_WEIGHT
}

impl CreateGroupRequest {
    pub fn new(name: impl Into<String>, controller: ControllerId) -> Self {
        Self {
            name: name.into(),
            controller,
            parent: None,
            weight: DEFAULT_GROUP_WEIGHT,
            description: String::new(),
        }
    }

    pub fn parent(mut self, parent: GroupId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Attribute edits for a group. Structure changes (parent, weight) go
/// through the hierarchy mutations instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Move the group to another controller (subject to reassignment policy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerId>,
}

// ── Device ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub asset_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip6: Option<Ipv6Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_group: Option<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundancy_group: Option<RedundancyGroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundancy_group_priority: Option<u16>,
}

impl CreateDeviceRequest {
    /// A device known by asset tag and name.
    pub fn tagged(asset_tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            asset_tag: asset_tag.into(),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Attribute edits for a device. Memberships change through
/// `AssignDeviceGroup` / `JoinRedundancyGroup` and friends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<Option<Ipv4Addr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip6: Option<Option<Ipv6Addr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundancy_group_priority: Option<Option<u16>>,
}

// ── DeviceRedundancyGroup ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRedundancyGroupRequest {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub failover_strategy: FailoverStrategy,
}

impl CreateRedundancyGroupRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRedundancyGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover_strategy: Option<FailoverStrategy>,
}
