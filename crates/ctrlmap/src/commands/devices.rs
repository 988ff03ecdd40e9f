//! Device command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use ctrlmap_core::{
    ControllerId, Device, DeviceOwnership, Inventory, InventoryError, InventoryState, OwnershipPath,
};

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device")]
    label: String,
    #[tabled(rename = "Asset Tag")]
    asset_tag: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Redundancy Group")]
    redundancy_group: String,
    #[tabled(rename = "Priority")]
    priority: String,
}

impl DeviceRow {
    fn new(d: &Device, state: &InventoryState, color: bool) -> Self {
        Self {
            label: d.label().to_owned(),
            asset_tag: d.asset_tag.clone(),
            status: output::paint_status(d.status, color),
            group: d
                .controller_group
                .map_or_else(|| "-".into(), |g| util::group_name(state, g)),
            redundancy_group: d.redundancy_group.map_or_else(
                || "-".into(),
                |g| {
                    state
                        .redundancy_group(&g)
                        .map_or_else(|| g.to_string(), |r| r.name.clone())
                },
            ),
            priority: d
                .redundancy_group_priority
                .map_or_else(|| "-".into(), |p| p.to_string()),
        }
    }
}

// ── Answers ─────────────────────────────────────────────────────────

/// Both ownership paths, by controller name.
#[derive(Serialize)]
struct OwnerReport {
    device: String,
    via_hierarchy: Option<String>,
    via_deployment: Vec<String>,
    ambiguous: bool,
}

impl OwnerReport {
    fn new(d: &Device, own: &DeviceOwnership, state: &InventoryState) -> Self {
        Self {
            device: d.label().to_owned(),
            via_hierarchy: own.via_hierarchy.map(|c| util::controller_name(state, c)),
            via_deployment: own
                .via_deployment
                .iter()
                .map(|c| util::controller_name(state, *c))
                .collect(),
            ambiguous: own.is_ambiguous(),
        }
    }

    /// Distinct controller names across both paths.
    fn controllers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .via_hierarchy
            .iter()
            .chain(&self.via_deployment)
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// A single-relation or strict answer.
#[derive(Serialize)]
struct Owner {
    device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    via: Option<OwnershipPath>,
    controller: Option<String>,
}

#[derive(Serialize)]
struct Placement {
    device: String,
    group: Option<String>,
    controller: Option<String>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(inventory: &Inventory, args: DevicesArgs, render: &Render) -> Result<(), CliError> {
    let query = inventory.query();
    let snap = query.snapshot();

    let out = match args.command {
        DevicesCommand::List => {
            let all = snap.devices();
            output::render_list(
                render.format,
                &all,
                |d| DeviceRow::new(d, snap, render.color),
                |d| d.label().to_owned(),
            )?
        }

        DevicesCommand::Owner { device, via, strict } => {
            let d = util::device(snap, &device)?;
            let own = query.controllers_managing_device(&d.id)?;

            if strict || via.is_some() {
                let path = via.map(OwnershipPath::from);
                let answer = match path {
                    Some(path) => own.via(path),
                    None => own.unique(),
                }
                .map_err(|e| ambiguous(d, &e, snap))?;
                let owner = Owner {
                    device: d.label().to_owned(),
                    via: path,
                    controller: answer.map(|c| util::controller_name(snap, c)),
                };
                output::render_single(
                    render.format,
                    &owner,
                    |o| {
                        output::detail(&[
                            ("Device", o.device.clone()),
                            ("Controller", output::or_dash(o.controller.as_deref())),
                        ])
                    },
                    |o| o.controller.clone().unwrap_or_default(),
                )?
            } else {
                let report = OwnerReport::new(d, &own, snap);
                output::render_single(
                    render.format,
                    &report,
                    owner_detail,
                    |r| r.controllers().join("\n"),
                )?
            }
        }

        DevicesCommand::Group { device } => {
            let d = util::device(snap, &device)?;
            let group = snap.group_of(&d.id)?.and_then(|g| snap.group(&g));
            let placement = Placement {
                device: d.label().to_owned(),
                group: group.map(|g| g.name.clone()),
                controller: group.map(|g| util::controller_name(snap, g.controller)),
            };
            output::render_single(
                render.format,
                &placement,
                |p| {
                    output::detail(&[
                        ("Device", p.device.clone()),
                        ("Group", output::or_dash(p.group.as_deref())),
                        ("Controller", output::or_dash(p.controller.as_deref())),
                    ])
                },
                |p| p.group.clone().unwrap_or_default(),
            )?
        }
    };
    output::print_output(&out, render.quiet);
    Ok(())
}

fn owner_detail(r: &OwnerReport) -> String {
    let deployment = if r.via_deployment.is_empty() {
        "-".to_owned()
    } else {
        r.via_deployment.join(", ")
    };
    output::detail(&[
        ("Device", r.device.clone()),
        ("Hierarchy", output::or_dash(r.via_hierarchy.as_deref())),
        ("Deployment", deployment),
        ("Ambiguous", if r.ambiguous { "yes" } else { "no" }.to_owned()),
    ])
}

/// Turn an ownership conflict into a named, actionable CLI error.
fn ambiguous(d: &Arc<Device>, err: &InventoryError, state: &InventoryState) -> CliError {
    let InventoryError::AmbiguousOwnership {
        via_hierarchy,
        via_deployment,
        ..
    } = err
    else {
        return CliError::Inventory(err.clone());
    };
    let names = |ids: &[ControllerId]| -> String {
        if ids.is_empty() {
            return "-".into();
        }
        ids.iter()
            .map(|c| util::controller_name(state, *c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    CliError::AmbiguousOwner {
        device: d.label().to_owned(),
        via_hierarchy: names(via_hierarchy.as_slice()),
        via_deployment: names(via_deployment),
    }
}
