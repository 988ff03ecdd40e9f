// ── ControllerDeviceGroup domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::{ControllerId, GroupId};

/// Sibling weight assigned when none is given.
pub const DEFAULT_GROUP_WEIGHT: i32 = 1000;

/// A node in a controller's device-group forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerDeviceGroup {
    pub id: GroupId,
    pub name: String,
    pub controller: ControllerId,
    pub parent: Option<GroupId>,
    /// Sibling ordering; lower sorts first, ties broken by name.
    pub weight: i32,
    pub description: String,

    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ControllerDeviceGroup {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Key that orders siblings: weight, then name, then id for total order.
    pub(crate) fn sibling_key(&self) -> (i32, &str, GroupId) {
        (self.weight, self.name.as_str(), self.id)
    }
}
