// ── Core identity types ──
//
// Every record in the inventory is keyed by a typed UUID. The typed
// wrappers keep a `GroupId` from ever being passed where a `DeviceId`
// is expected; `EntityRef` erases the type when an error or receipt
// needs to name "some entity".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Controller`](super::Controller).
    ControllerId
);
entity_id!(
    /// Identifier of a [`ControllerDeviceGroup`](super::ControllerDeviceGroup).
    GroupId
);
entity_id!(
    /// Identifier of a [`Device`](super::Device).
    DeviceId
);
entity_id!(
    /// Identifier of a [`DeviceRedundancyGroup`](super::DeviceRedundancyGroup).
    RedundancyGroupId
);

// ── EntityKind / EntityRef ──────────────────────────────────────────

/// The four record kinds held by the inventory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Controller,
    ControllerDeviceGroup,
    Device,
    DeviceRedundancyGroup,
}

/// A type-erased reference to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Controller(ControllerId),
    ControllerDeviceGroup(GroupId),
    Device(DeviceId),
    DeviceRedundancyGroup(RedundancyGroupId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Controller(_) => EntityKind::Controller,
            Self::ControllerDeviceGroup(_) => EntityKind::ControllerDeviceGroup,
            Self::Device(_) => EntityKind::Device,
            Self::DeviceRedundancyGroup(_) => EntityKind::DeviceRedundancyGroup,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        match self {
            Self::Controller(id) => id.as_uuid(),
            Self::ControllerDeviceGroup(id) => id.as_uuid(),
            Self::Device(id) => id.as_uuid(),
            Self::DeviceRedundancyGroup(id) => id.as_uuid(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.uuid())
    }
}

impl From<ControllerId> for EntityRef {
    fn from(id: ControllerId) -> Self {
        Self::Controller(id)
    }
}

impl From<GroupId> for EntityRef {
    fn from(id: GroupId) -> Self {
        Self::ControllerDeviceGroup(id)
    }
}

impl From<DeviceId> for EntityRef {
    fn from(id: DeviceId) -> Self {
        Self::Device(id)
    }
}

impl From<RedundancyGroupId> for EntityRef {
    fn from(id: RedundancyGroupId) -> Self {
        Self::DeviceRedundancyGroup(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(GroupId::generate(), GroupId::generate());
    }

    #[test]
    fn id_round_trips_through_display() {
        let id = DeviceId::generate();
        let parsed: DeviceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_rejects_non_uuid() {
        assert!("dal-fw01".parse::<ControllerId>().is_err());
    }

    #[test]
    fn entity_ref_display_names_kind() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let r = EntityRef::from(GroupId::from(uuid));
        assert_eq!(
            r.to_string(),
            "controller_device_group 550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(r.kind(), EntityKind::ControllerDeviceGroup);
    }

    #[test]
    fn entity_ref_serializes_tagged() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_value(EntityRef::Device(DeviceId::from(uuid))).unwrap();
        assert_eq!(json["kind"], "device");
        assert_eq!(json["id"], "550e8400-e29b-41d4-a716-446655440000");
    }
}
