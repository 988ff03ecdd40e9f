// ── Inventory facade ──
//
// Owns the published state and the write path. Readers load the
// current `Arc<InventoryState>` without locking. Writers take the locks
// their mutation needs, validate against the current state, commit
// into a private clone, and publish it with compare-and-swap. A writer
// that loses the swap revalidates against the state that beat it.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::{InventoryState, Snapshot};
use crate::bulk::{self, Declarations, LoadReport};
use crate::command::{
    CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, CreateRedundancyGroupRequest,
    Mutation, MutationPhase, Receipt,
};
use crate::error::InventoryError;
use crate::model::{
    ControllerId, DeploymentTarget, DeviceId, EntityRef, GroupId, RedundancyGroupId,
};
use crate::policy::Policy;
use crate::query::{ExpansionCache, Query};
use crate::stream::InventoryStream;
use crate::validate::Proposal;

/// The inventory engine: one published state plus its write path.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Inventory {
    policy: Policy,
    state: ArcSwap<InventoryState>,
    locks: WriteLocks,
    cache: Arc<ExpansionCache>,
    changes: watch::Sender<Snapshot>,
}

enum Attempt<T> {
    Done(T),
    /// The state moved underneath the writer; start over.
    Retry,
}

impl Inventory {
    /// An empty inventory governed by `policy`.
    ///
    /// Fails with [`InventoryError::InvalidPolicy`] when `policy` asks for
    /// a delete behaviour the engine cannot honour.
    pub fn new(policy: Policy) -> Result<Self, InventoryError> {
        policy.validate()?;
        Ok(Self::with_policy(policy))
    }

    fn with_policy(policy: Policy) -> Self {
        let state = Arc::new(InventoryState::new(policy.group_name_scope));
        let (changes, _) = watch::channel(Snapshot::new(Arc::clone(&state)));
        Self {
            policy,
            state: ArcSwap::new(state),
            locks: WriteLocks::default(),
            cache: Arc::new(ExpansionCache::new()),
            changes,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current committed state. Never blocks.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.state.load_full())
    }

    /// The four inventory questions over the current snapshot.
    pub fn query(&self) -> Query {
        Query::new(self.snapshot(), Arc::clone(&self.cache))
    }

    /// Follow committed snapshots as they are published.
    pub fn subscribe(&self) -> InventoryStream {
        InventoryStream::new(self.changes.subscribe())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Validate and commit one mutation.
    pub fn apply(&self, mutation: Mutation) -> Result<Receipt, InventoryError> {
        let kind = mutation.kind();
        debug!(kind, "mutation proposed");
        loop {
            let scope = LockScope::of(&mutation, &self.state.load());
            let attempt = self
                .locks
                .with_scope(&scope, || self.try_commit(&mutation, &scope));
            match attempt {
                Ok(Attempt::Done(receipt)) => {
                    if let Mutation::DeleteController { id } = &mutation {
                        self.locks.forget(id);
                    }
                    return Ok(receipt);
                }
                Ok(Attempt::Retry) => trace!(kind, "state moved during commit, revalidating"),
                Err(err) => {
                    warn!(kind, error = %err, phase = %MutationPhase::Rejected, "mutation rejected");
                    return Err(err);
                }
            }
        }
    }

    /// Run validation only. Nothing is committed.
    pub fn dry_run(&self, mutation: Mutation) -> Result<MutationPhase, InventoryError> {
        let state = self.state.load();
        Proposal::new(mutation)
            .validate(&state, &self.policy)
            .map(|validated| validated.phase())
    }

    /// Apply a declaration batch as one all-or-nothing commit.
    pub fn load(&self, declarations: &Declarations) -> Result<LoadReport, InventoryError> {
        loop {
            let scope = LockScope::everything(&self.state.load());
            let attempt: Result<Attempt<LoadReport>, InventoryError> = self.locks.with_scope(&scope, || {
                let base = self.state.load_full();
                if LockScope::everything(&base) != scope {
                    return Ok(Attempt::Retry);
                }
                let mut draft = InventoryState::clone(&base);
                let report = bulk::apply(&mut draft, &self.policy, declarations)?;
                Ok(if self.publish(&base, draft) {
                    Attempt::Done(report)
                } else {
                    Attempt::Retry
                })
            });
            match attempt {
                Ok(Attempt::Done(report)) => return Ok(report),
                Ok(Attempt::Retry) => trace!("state moved during load, retrying"),
                Err(err) => {
                    warn!(error = %err, "declaration batch rejected");
                    return Err(err);
                }
            }
        }
    }

    fn try_commit(&self, mutation: &Mutation, scope: &LockScope) -> Result<Attempt<Receipt>, InventoryError> {
        let base = self.state.load_full();
        if LockScope::of(mutation, &base) != *scope {
            return Ok(Attempt::Retry);
        }
        let validated = Proposal::new(mutation.clone()).validate(&base, &self.policy)?;
        let mut draft = InventoryState::clone(&base);
        let Some(receipt) = validated.commit(&mut draft) else {
            return Ok(Attempt::Retry);
        };
        Ok(if self.publish(&base, draft) {
            Attempt::Done(receipt)
        } else {
            Attempt::Retry
        })
    }

    /// Swap `next` in if `base` is still current, then notify subscribers.
    fn publish(&self, base: &Arc<InventoryState>, next: InventoryState) -> bool {
        let next = Arc::new(next);
        let prev = self.state.compare_and_swap(base, Arc::clone(&next));
        if !Arc::ptr_eq(&prev, base) {
            return false;
        }
        self.changes.send_replace(Snapshot::new(next));
        true
    }

    // ── Typed shortcuts ──────────────────────────────────────────────

    pub fn create_controller(&self, req: CreateControllerRequest) -> Result<ControllerId, InventoryError> {
        match self.apply(Mutation::CreateController(req))?.entity {
            EntityRef::Controller(id) => Ok(id),
            other => Err(InventoryError::NotFound { entity: other }),
        }
    }

    pub fn create_group(&self, req: CreateGroupRequest) -> Result<GroupId, InventoryError> {
        match self.apply(Mutation::CreateGroup(req))?.entity {
            EntityRef::ControllerDeviceGroup(id) => Ok(id),
            other => Err(InventoryError::NotFound { entity: other }),
        }
    }

    pub fn create_device(&self, req: CreateDeviceRequest) -> Result<DeviceId, InventoryError> {
        match self.apply(Mutation::CreateDevice(req))?.entity {
            EntityRef::Device(id) => Ok(id),
            other => Err(InventoryError::NotFound { entity: other }),
        }
    }

    pub fn create_redundancy_group(
        &self,
        req: CreateRedundancyGroupRequest,
    ) -> Result<RedundancyGroupId, InventoryError> {
        match self.apply(Mutation::CreateRedundancyGroup(req))?.entity {
            EntityRef::DeviceRedundancyGroup(id) => Ok(id),
            other => Err(InventoryError::NotFound { entity: other }),
        }
    }

    pub fn set_deployment_target(
        &self,
        controller: ControllerId,
        target: DeploymentTarget,
    ) -> Result<Receipt, InventoryError> {
        self.apply(Mutation::SetDeploymentTarget { controller, target })
    }

    /// Place `child` under `parent`, re-parenting it if needed.
    pub fn attach_child(&self, parent: GroupId, child: GroupId) -> Result<Receipt, InventoryError> {
        self.apply(Mutation::AttachChild { parent, child })
    }

    pub fn detach_child(&self, node: GroupId) -> Result<Receipt, InventoryError> {
        self.apply(Mutation::DetachChild { node })
    }

    pub fn reorder(&self, node: GroupId, weight: i32) -> Result<Receipt, InventoryError> {
        self.apply(Mutation::Reorder { node, weight })
    }

    pub fn assign_device_group(&self, device: DeviceId, group: GroupId) -> Result<Receipt, InventoryError> {
        self.apply(Mutation::AssignDeviceGroup { device, group })
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_policy(Policy::default())
    }
}

// ── Write locks ─────────────────────────────────────────────────────

/// Locks one mutation must hold from validation through publish.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockScope {
    names: bool,
    forests: BTreeSet<ControllerId>,
}

impl LockScope {
    fn of(mutation: &Mutation, state: &InventoryState) -> Self {
        Self {
            names: mutation.touches_names(),
            forests: mutation.forests(state),
        }
    }

    /// Every lock that exists for `state`.
    fn everything(state: &InventoryState) -> Self {
        Self {
            names: true,
            forests: state.controllers.values().map(|c| c.id).collect(),
        }
    }
}

/// A global name lock and one lock per controller forest.
///
/// Always acquired names-first, then forests in ascending id order, so
/// two writers can never wait on each other in a cycle.
#[derive(Debug, Default)]
struct WriteLocks {
    names: Mutex<()>,
    forests: DashMap<ControllerId, Arc<Mutex<()>>>,
}

impl WriteLocks {
    fn with_scope<R>(&self, scope: &LockScope, f: impl FnOnce() -> R) -> R {
        let _names = scope
            .names
            .then(|| self.names.lock().unwrap_or_else(PoisonError::into_inner));
        let forests: Vec<Arc<Mutex<()>>> = scope
            .forests
            .iter()
            .map(|id| Arc::clone(self.forests.entry(*id).or_default().value()))
            .collect();
        let _forests: Vec<MutexGuard<'_, ()>> = forests
            .iter()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();
        f()
    }

    fn forget(&self, controller: &ControllerId) {
        self.forests.remove(controller);
    }
}
