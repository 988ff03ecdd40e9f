//! Controller command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use ctrlmap_core::{Controller, DeploymentTarget, Inventory, InventoryState};

use crate::cli::{ControllersArgs, ControllersCommand};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ControllerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Deployed On")]
    deployed_on: String,
    #[tabled(rename = "Groups")]
    groups: usize,
}

impl ControllerRow {
    fn new(c: &Controller, state: &InventoryState, color: bool) -> Self {
        Self {
            name: c.name.clone(),
            status: output::paint_status(c.status, color),
            platform: output::or_dash(c.platform.as_deref()),
            deployed_on: util::target_label(state, c.deployed_to),
            groups: state.forest().forest_of(&c.id).count(),
        }
    }
}

/// One device reached from a controller, and how.
#[derive(Debug, Clone, Serialize, Tabled)]
struct ControlledDevice {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Relation")]
    relation: &'static str,
    #[tabled(rename = "Via")]
    via: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(inventory: &Inventory, args: ControllersArgs, render: &Render) -> Result<(), CliError> {
    let query = inventory.query();
    let snap = query.snapshot();

    let out = match args.command {
        ControllersCommand::List => {
            let all = snap.controllers();
            output::render_list(
                render.format,
                &all,
                |c| ControllerRow::new(c, snap, render.color),
                |c| c.name.clone(),
            )?
        }

        ControllersCommand::Get { name } => {
            let c = util::controller(snap, &name)?;
            output::render_single(
                render.format,
                c,
                |c| detail(c, snap, render.color),
                |c| c.name.clone(),
            )?
        }

        ControllersCommand::Devices { name } => {
            let c = util::controller(snap, &name)?;
            let under = query.devices_under_controller(&c.id)?;

            let mut rows: Vec<ControlledDevice> = under
                .managed
                .iter()
                .map(|d| ControlledDevice {
                    device: d.label().to_owned(),
                    relation: "hierarchy",
                    via: d
                        .controller_group
                        .map_or_else(|| "-".into(), |g| util::group_name(snap, g)),
                })
                .collect();
            let via = match under.deployment_target {
                DeploymentTarget::RedundancyGroup(_) => util::target_label(snap, under.deployment_target),
                DeploymentTarget::Device(_) | DeploymentTarget::Unassigned => "-".into(),
            };
            rows.extend(under.deployment.iter().map(|d| ControlledDevice {
                device: d.label().to_owned(),
                relation: "deployment",
                via: via.clone(),
            }));

            output::render_list(render.format, &rows, Clone::clone, |r| r.device.clone())?
        }
    };
    output::print_output(&out, render.quiet);
    Ok(())
}

fn detail(c: &Arc<Controller>, state: &InventoryState, color: bool) -> String {
    output::detail(&[
        ("Name", c.name.clone()),
        ("ID", c.id.to_string()),
        ("Status", output::paint_status(c.status, color)),
        ("Role", output::or_dash(c.role.as_deref())),
        ("Tenant", output::or_dash(c.tenant.as_deref())),
        ("Platform", output::or_dash(c.platform.as_deref())),
        ("Integration", output::or_dash(c.external_integration.as_deref())),
        ("Location", output::or_dash(c.location.as_deref())),
        ("Deployed On", util::target_label(state, c.deployed_to)),
        ("Groups", state.forest().forest_of(&c.id).count().to_string()),
        ("Description", c.description.clone()),
    ])
}
