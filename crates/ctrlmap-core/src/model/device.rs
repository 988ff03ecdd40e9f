// ── Device domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

use super::common::Status;
use super::entity_id::{DeviceId, GroupId, RedundancyGroupId};

/// A managed (or unmanaged) piece of network hardware.
///
/// Group membership and redundancy membership are orthogonal: a device
/// may sit in one controller device group and one redundancy group at
/// the same time, or in neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub asset_tag: String,
    pub name: Option<String>,
    pub status: Status,

    // Classification
    pub device_type: Option<String>,
    pub role: Option<String>,
    pub tenant: Option<String>,
    pub platform: Option<String>,
    pub software_version: Option<String>,
    pub serial: Option<String>,
    pub location: Option<String>,

    // Addressing
    pub primary_ip4: Option<Ipv4Addr>,
    pub primary_ip6: Option<Ipv6Addr>,

    // Memberships
    pub controller_group: Option<GroupId>,
    pub redundancy_group: Option<RedundancyGroupId>,
    pub redundancy_group_priority: Option<u16>,

    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Device {
    /// Human label: the name when set, otherwise the asset tag.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.asset_tag)
    }
}
