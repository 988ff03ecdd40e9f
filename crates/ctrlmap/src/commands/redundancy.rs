//! Device redundancy group command handlers.

use tabled::Tabled;

use ctrlmap_core::{DeploymentTarget, DeviceRedundancyGroup, Inventory, InventoryState};

use crate::cli::{RedundancyGroupsArgs, RedundancyGroupsCommand};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RedundancyGroupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failover")]
    failover: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Hosts")]
    hosts: String,
}

impl RedundancyGroupRow {
    fn new(g: &DeviceRedundancyGroup, state: &InventoryState, color: bool) -> Self {
        let hosts: Vec<String> = state
            .controllers()
            .into_iter()
            .filter(|c| c.deployed_to == DeploymentTarget::RedundancyGroup(g.id))
            .map(|c| c.name.clone())
            .collect();
        Self {
            name: g.name.clone(),
            status: output::paint_status(g.status, color),
            failover: g.failover_strategy.to_string(),
            members: state.redundancy_members(&g.id).len(),
            hosts: if hosts.is_empty() {
                "-".into()
            } else {
                hosts.join(", ")
            },
        }
    }
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Asset Tag")]
    asset_tag: String,
    #[tabled(rename = "Status")]
    status: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    inventory: &Inventory,
    args: RedundancyGroupsArgs,
    render: &Render,
) -> Result<(), CliError> {
    let snap = inventory.snapshot();

    let out = match args.command {
        RedundancyGroupsCommand::List => {
            let all = snap.redundancy_groups();
            output::render_list(
                render.format,
                &all,
                |g| RedundancyGroupRow::new(g, &snap, render.color),
                |g| g.name.clone(),
            )?
        }

        RedundancyGroupsCommand::Members { name } => {
            let group = util::redundancy_group(&snap, &name)?;
            let members = snap.redundancy_members(&group.id);
            output::render_list(
                render.format,
                &members,
                |d| MemberRow {
                    priority: d
                        .redundancy_group_priority
                        .map_or_else(|| "-".into(), |p| p.to_string()),
                    device: d.label().to_owned(),
                    asset_tag: d.asset_tag.clone(),
                    status: output::paint_status(d.status, render.color),
                },
                |d| d.label().to_owned(),
            )?
        }
    };
    output::print_output(&out, render.quiet);
    Ok(())
}
