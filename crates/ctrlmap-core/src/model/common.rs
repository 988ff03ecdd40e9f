// ── Shared enumerations ──

use serde::{Deserialize, Serialize};

use super::entity_id::{DeviceId, EntityRef, RedundancyGroupId};

/// Operational status shared by controllers, devices and redundancy groups.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    #[default]
    Active,
    Planned,
    Staged,
    Failed,
    Offline,
    Decommissioning,
    Inventory,
    Maintenance,
}

/// How members of a redundancy group share load.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailoverStrategy {
    #[default]
    Unspecified,
    ActiveActive,
    ActivePassive,
}

/// The hardware a controller itself runs on.
///
/// Exactly one of a device, a redundancy group, or nothing at all
/// (cloud-hosted or not yet placed). This is independent of which
/// devices the controller *manages* through its group forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DeploymentTarget {
    #[default]
    Unassigned,
    Device(DeviceId),
    RedundancyGroup(RedundancyGroupId),
}

impl DeploymentTarget {
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }

    pub fn as_entity(&self) -> Option<EntityRef> {
        match self {
            Self::Unassigned => None,
            Self::Device(id) => Some(EntityRef::Device(*id)),
            Self::RedundancyGroup(id) => Some(EntityRef::DeviceRedundancyGroup(*id)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_kebab_case() {
        assert_eq!("decommissioning".parse::<Status>().unwrap(), Status::Decommissioning);
        assert_eq!(Status::Active.to_string(), "active");
    }

    #[test]
    fn failover_strategy_serializes_kebab_case() {
        let json = serde_json::to_string(&FailoverStrategy::ActivePassive).unwrap();
        assert_eq!(json, "\"active-passive\"");
    }

    #[test]
    fn unassigned_target_has_no_entity() {
        assert!(DeploymentTarget::Unassigned.as_entity().is_none());
        assert!(!DeploymentTarget::default().is_assigned());
        let id = DeviceId::generate();
        assert_eq!(
            DeploymentTarget::Device(id).as_entity(),
            Some(EntityRef::Device(id))
        );
    }
}
