// ── Bulk declaration loading ──
//
// A declaration file is an ordered list of entities that reference each
// other by name. Loading applies them in dependency order against one
// private draft:
//
//   redundancy groups -> devices -> controllers -> device groups
//   (parents before children) -> device group attachments
//
// Order within a rank follows the input. The first failure aborts the
// whole batch and reports the 1-based position of its declaration.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{
    CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, CreateRedundancyGroupRequest,
    Mutation,
};
use crate::error::InventoryError;
use crate::model::{
    ControllerId, DEFAULT_GROUP_WEIGHT, DeploymentTarget, DeviceId, EntityKind, EntityRef,
    FailoverStrategy, GroupId, Status,
};
use crate::policy::{GroupNameScope, Policy};
use crate::store::InventoryState;
use crate::validate::Proposal;

// ── Declaration types ───────────────────────────────────────────────

/// An ordered batch of declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Declarations(pub Vec<Declaration>);

/// One entity with its relationships expressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    DeviceRedundancyGroup(RedundancyGroupDeclaration),
    Device(DeviceDeclaration),
    Controller(ControllerDeclaration),
    ControllerDeviceGroup(GroupDeclaration),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyGroupDeclaration {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub failover_strategy: FailoverStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDeclaration {
    pub asset_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_ip6: Option<Ipv6Addr>,
    /// Group name; qualify with `controller` under per-controller naming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_device_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redundancy_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redundancy_group_priority: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerDeclaration {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_integration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_to: Option<TargetDeclaration>,
}

/// A deployment target named by device label or redundancy group name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum TargetDeclaration {
    Device(String),
    RedundancyGroup(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDeclaration {
    pub name: String,
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: i32,
    #[serde(default)]
    pub description: String,
    /// Member devices by label (name, then asset tag).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
}

fn default_weight() -> i32 {
    DEFAULT_GROUP_WEIGHT
}

impl Declaration {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::DeviceRedundancyGroup(_) => EntityKind::DeviceRedundancyGroup,
            Self::Device(_) => EntityKind::Device,
            Self::Controller(_) => EntityKind::Controller,
            Self::ControllerDeviceGroup(_) => EntityKind::ControllerDeviceGroup,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DeviceRedundancyGroup(d) => &d.name,
            Self::Device(d) => d.name.as_deref().unwrap_or(&d.asset_tag),
            Self::Controller(d) => &d.name,
            Self::ControllerDeviceGroup(d) => &d.name,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Failure to read or parse a declaration file.
#[derive(Debug, thiserror::Error)]
pub enum DeclarationError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML declarations: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON declarations: {0}")]
    Json(#[from] serde_json::Error),
}

impl Declarations {
    pub fn from_yaml(text: &str) -> Result<Self, DeclarationError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DeclarationError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a file, choosing JSON for a `.json` extension and YAML otherwise.
    pub fn from_path(path: &Path) -> Result<Self, DeclarationError> {
        let text = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    pub fn push(&mut self, declaration: Declaration) {
        self.0.push(declaration);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Declaration> for Declarations {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Load report ─────────────────────────────────────────────────────

/// Counts of what one successful load created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub controllers: usize,
    pub groups: usize,
    pub devices: usize,
    pub redundancy_groups: usize,
    /// Device-to-group attachments.
    pub memberships: usize,
    /// Inventory version after the load.
    pub version: u64,
}

// ── Application ─────────────────────────────────────────────────────

/// Apply `declarations` to `draft` in dependency order.
///
/// On error the draft is left partially written; callers discard it.
pub(crate) fn apply(
    draft: &mut InventoryState,
    policy: &Policy,
    declarations: &Declarations,
) -> Result<LoadReport, InventoryError> {
    let mut loader = Loader {
        draft,
        policy,
        report: LoadReport::default(),
        devices: HashMap::new(),
    };
    let numbered: Vec<(usize, &Declaration)> =
        declarations.iter().enumerate().map(|(i, d)| (i + 1, d)).collect();

    for (position, decl) in &numbered {
        if let Declaration::DeviceRedundancyGroup(d) = decl {
            loader.redundancy_group(*position, decl, d)?;
        }
    }
    for (position, decl) in &numbered {
        if let Declaration::Device(d) = decl {
            loader.device(*position, decl, d)?;
        }
    }
    for (position, decl) in &numbered {
        if let Declaration::Controller(d) = decl {
            loader.controller(*position, decl, d)?;
        }
    }
    let groups: Vec<(usize, &Declaration, &GroupDeclaration)> = numbered
        .iter()
        .filter_map(|(position, decl)| match decl {
            Declaration::ControllerDeviceGroup(d) => Some((*position, *decl, d)),
            _ => None,
        })
        .collect();
    loader.groups(groups)?;
    for (position, decl) in &numbered {
        loader.attachments(*position, decl)?;
    }

    loader.report.version = loader.draft.version();
    info!(
        controllers = loader.report.controllers,
        groups = loader.report.groups,
        devices = loader.report.devices,
        redundancy_groups = loader.report.redundancy_groups,
        memberships = loader.report.memberships,
        "declarations loaded"
    );
    Ok(loader.report)
}

struct Loader<'a> {
    draft: &'a mut InventoryState,
    policy: &'a Policy,
    report: LoadReport,
    /// Device created by each device declaration, by position.
    devices: HashMap<usize, DeviceId>,
}

impl Loader<'_> {
    fn run(&mut self, position: usize, decl: &Declaration, mutation: Mutation) -> Result<EntityRef, InventoryError> {
        let result = Proposal::new(mutation)
            .validate(self.draft, self.policy)
            .and_then(|validated| {
                let entity = validated.entity();
                let expected = validated.base_version();
                let found = self.draft.version();
                validated
                    .commit(self.draft)
                    .map(|_| entity)
                    .ok_or(InventoryError::StaleProposal {
                        entity,
                        expected,
                        found,
                    })
            });
        result.map_err(|source| wrap(position, decl, source))
    }

    fn redundancy_group(
        &mut self,
        position: usize,
        decl: &Declaration,
        d: &RedundancyGroupDeclaration,
    ) -> Result<(), InventoryError> {
        let req = CreateRedundancyGroupRequest {
            name: d.name.clone(),
            status: d.status,
            description: d.description.clone(),
            failover_strategy: d.failover_strategy,
        };
        self.run(position, decl, Mutation::CreateRedundancyGroup(req))?;
        self.report.redundancy_groups += 1;
        Ok(())
    }

    fn device(&mut self, position: usize, decl: &Declaration, d: &DeviceDeclaration) -> Result<(), InventoryError> {
        let redundancy_group = match &d.redundancy_group {
            Some(name) => Some(
                self.draft
                    .redundancy_group_by_name(name)
                    .map(|g| g.id)
                    .ok_or_else(|| unresolved(position, decl, EntityKind::DeviceRedundancyGroup, name))?,
            ),
            None => None,
        };
        let req = CreateDeviceRequest {
            asset_tag: d.asset_tag.clone(),
            name: d.name.clone(),
            status: d.status,
            device_type: d.device_type.clone(),
            role: d.role.clone(),
            tenant: d.tenant.clone(),
            platform: d.platform.clone(),
            software_version: d.software_version.clone(),
            serial: d.serial.clone(),
            location: d.location.clone(),
            primary_ip4: d.primary_ip4,
            primary_ip6: d.primary_ip6,
            controller_group: None,
            redundancy_group,
            redundancy_group_priority: d.redundancy_group_priority,
        };
        if let EntityRef::Device(id) = self.run(position, decl, Mutation::CreateDevice(req))? {
            self.devices.insert(position, id);
        }
        self.report.devices += 1;
        Ok(())
    }

    fn controller(
        &mut self,
        position: usize,
        decl: &Declaration,
        d: &ControllerDeclaration,
    ) -> Result<(), InventoryError> {
        let deployed_to = match &d.deployed_to {
            None => DeploymentTarget::Unassigned,
            Some(TargetDeclaration::Device(label)) => self
                .draft
                .device_by_label(label)
                .map(|dev| DeploymentTarget::Device(dev.id))
                .ok_or_else(|| unresolved(position, decl, EntityKind::Device, label))?,
            Some(TargetDeclaration::RedundancyGroup(name)) => self
                .draft
                .redundancy_group_by_name(name)
                .map(|g| DeploymentTarget::RedundancyGroup(g.id))
                .ok_or_else(|| unresolved(position, decl, EntityKind::DeviceRedundancyGroup, name))?,
        };
        let req = CreateControllerRequest {
            name: d.name.clone(),
            status: d.status,
            role: d.role.clone(),
            tenant: d.tenant.clone(),
            description: d.description.clone(),
            platform: d.platform.clone(),
            external_integration: d.external_integration.clone(),
            location: d.location.clone(),
            deployed_to,
        };
        self.run(position, decl, Mutation::CreateController(req))?;
        self.report.controllers += 1;
        Ok(())
    }

    /// Create groups in passes until every parent exists.
    fn groups(&mut self, mut pending: Vec<(usize, &Declaration, &GroupDeclaration)>) -> Result<(), InventoryError> {
        while !pending.is_empty() {
            let mut waiting = Vec::new();
            let before = pending.len();
            for (position, decl, d) in pending {
                let controller = self.controller_named(position, decl, &d.controller)?;
                let parent = match &d.parent {
                    None => None,
                    Some(name) => match self.parent_named(position, decl, name, controller)? {
                        Some(id) => Some(id),
                        None => {
                            waiting.push((position, decl, d));
                            continue;
                        }
                    },
                };
                let req = CreateGroupRequest {
                    name: d.name.clone(),
                    controller,
                    parent,
                    weight: d.weight,
                    description: d.description.clone(),
                };
                self.run(position, decl, Mutation::CreateGroup(req))?;
                self.report.groups += 1;
            }
            if waiting.len() == before {
                return Err(self.stuck(&waiting));
            }
            pending = waiting;
        }
        Ok(())
    }

    fn attachments(&mut self, position: usize, decl: &Declaration) -> Result<(), InventoryError> {
        match decl {
            Declaration::Device(d) => {
                let (Some(group_name), Some(device)) =
                    (&d.controller_device_group, self.devices.get(&position).copied())
                else {
                    return Ok(());
                };
                let controller = match &d.controller {
                    Some(name) => Some(self.controller_named(position, decl, name)?),
                    None => None,
                };
                let group = self
                    .draft
                    .group_by_name(group_name, controller)
                    .map_err(|e| wrap(position, decl, e))?
                    .map(|g| g.id)
                    .ok_or_else(|| unresolved(position, decl, EntityKind::ControllerDeviceGroup, group_name))?;
                self.attach(position, decl, device, group)
            }
            Declaration::ControllerDeviceGroup(d) => {
                if d.devices.is_empty() {
                    return Ok(());
                }
                let controller = self.controller_named(position, decl, &d.controller)?;
                let group = self
                    .draft
                    .group_by_name(&d.name, Some(controller))
                    .map_err(|e| wrap(position, decl, e))?
                    .map(|g| g.id)
                    .ok_or_else(|| unresolved(position, decl, EntityKind::ControllerDeviceGroup, &d.name))?;
                for label in &d.devices {
                    let device = self
                        .draft
                        .device_by_label(label)
                        .map(|dev| dev.id)
                        .ok_or_else(|| unresolved(position, decl, EntityKind::Device, label))?;
                    self.attach(position, decl, device, group)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn attach(&mut self, position: usize, decl: &Declaration, device: DeviceId, group: GroupId) -> Result<(), InventoryError> {
        self.run(position, decl, Mutation::AssignDeviceGroup { device, group })?;
        self.report.memberships += 1;
        Ok(())
    }

    // ── Name resolution ──────────────────────────────────────────────

    fn controller_named(&self, position: usize, decl: &Declaration, name: &str) -> Result<ControllerId, InventoryError> {
        self.draft
            .controller_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| unresolved(position, decl, EntityKind::Controller, name))
    }

    /// Under global naming a parent is found in any forest, so a parent
    /// owned by another controller surfaces as a cross-controller error.
    fn parent_named(
        &self,
        position: usize,
        decl: &Declaration,
        name: &str,
        controller: ControllerId,
    ) -> Result<Option<GroupId>, InventoryError> {
        let scope = match self.draft.group_name_scope() {
            GroupNameScope::Global => None,
            GroupNameScope::PerController => Some(controller),
        };
        self.draft
            .group_by_name(name, scope)
            .map(|g| g.map(|g| g.id))
            .map_err(|e| wrap(position, decl, e))
    }

    /// Explain why no waiting group could be created: either the
    /// declared parents loop, or a parent is never declared.
    fn stuck(&self, waiting: &[(usize, &Declaration, &GroupDeclaration)]) -> InventoryError {
        let key = |controller: &str, name: &str| match self.draft.group_name_scope() {
            GroupNameScope::Global => name.to_owned(),
            GroupNameScope::PerController => format!("{controller}/{name}"),
        };
        let by_key: HashMap<String, usize> = waiting
            .iter()
            .enumerate()
            .map(|(i, (_, _, d))| (key(&d.controller, &d.name), i))
            .collect();

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut at = 0;
        loop {
            let (position, decl, d) = waiting[at];
            if !seen.insert(at) {
                let start = chain.iter().position(|i| *i == at).unwrap_or(0);
                let mut names: Vec<String> =
                    chain[start..].iter().map(|i: &usize| waiting[*i].2.name.clone()).collect();
                names.push(d.name.clone());
                return wrap(position, decl, InventoryError::DeclarationCycle { names });
            }
            chain.push(at);
            let parent = d.parent.as_deref().unwrap_or_default();
            match by_key.get(&key(&d.controller, parent)) {
                Some(next) => at = *next,
                None => return unresolved(position, decl, EntityKind::ControllerDeviceGroup, parent),
            }
        }
    }
}

fn wrap(position: usize, decl: &Declaration, source: InventoryError) -> InventoryError {
    InventoryError::BulkLoad {
        position,
        declaration: decl.to_string(),
        source: Box::new(source),
    }
}

fn unresolved(position: usize, decl: &Declaration, kind: EntityKind, name: &str) -> InventoryError {
    wrap(
        position,
        decl,
        InventoryError::UnresolvedReference {
            kind,
            name: name.to_owned(),
        },
    )
}
