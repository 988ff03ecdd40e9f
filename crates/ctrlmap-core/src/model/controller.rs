// ── Controller domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{DeploymentTarget, Status};
use super::entity_id::ControllerId;

/// A network, SDN or cloud management system.
///
/// Platform, integration and location are opaque references owned by
/// other inventory domains; the engine stores them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub id: ControllerId,
    pub name: String,
    pub status: Status,
    pub role: Option<String>,
    pub tenant: Option<String>,
    pub description: String,
    pub platform: Option<String>,
    pub external_integration: Option<String>,
    pub location: Option<String>,
    pub deployed_to: DeploymentTarget,

    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
