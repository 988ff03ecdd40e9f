// ── DeviceRedundancyGroup domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{FailoverStrategy, Status};
use super::entity_id::RedundancyGroupId;

/// A high-availability cluster of devices.
///
/// Membership is recorded on each [`Device`](super::Device); the
/// inventory keeps the reverse index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRedundancyGroup {
    pub id: RedundancyGroupId,
    pub name: String,
    pub status: Status,
    pub description: String,
    pub failover_strategy: FailoverStrategy,

    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
