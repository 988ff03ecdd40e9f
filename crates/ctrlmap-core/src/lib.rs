// ctrlmap-core: Controller inventory engine. Entity store, group
// hierarchy, ownership resolution, queries and the consistency rules
// that guard every write.

pub mod bulk;
pub mod command;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod policy;
pub mod query;
pub mod resolver;
pub mod store;
pub mod stream;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bulk::{Declaration, DeclarationError, Declarations, LoadReport};
pub use command::requests::*;
pub use command::{Mutation, MutationPhase, Receipt};
pub use error::InventoryError;
pub use hierarchy::{Ancestors, Forest, Subtree};
pub use policy::{DeletePolicy, GroupNameScope, GroupReassignment, Policy, ReferencePolicies};
pub use query::{DevicesUnder, ExpansionCache, GroupsUnder, Query};
pub use resolver::{DeviceOwnership, OwnershipPath};
pub use store::{Inventory, InventoryState, Snapshot};
pub use stream::{InventoryStream, SnapshotStream};
pub use validate::{Proposal, ValidatedMutation};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Records
    Controller, ControllerDeviceGroup, Device, DeviceRedundancyGroup,
    // Identity
    ControllerId, DeviceId, EntityKind, EntityRef, GroupId, RedundancyGroupId,
    // Supporting types
    DEFAULT_GROUP_WEIGHT, DeploymentTarget, FailoverStrategy, Record, Status,
};
