//! Controller device group command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use ctrlmap_core::{ControllerDeviceGroup, ControllerId, Inventory, InventoryState};

use crate::cli::{GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Weight")]
    weight: i32,
    #[tabled(rename = "Devices")]
    devices: usize,
}

impl GroupRow {
    /// Names are indented by depth so the table reads as a tree.
    fn new(g: &ControllerDeviceGroup, state: &InventoryState) -> Self {
        let depth = state.forest().depth(&g.id);
        Self {
            name: format!("{}{}", "  ".repeat(depth), g.name),
            controller: util::controller_name(state, g.controller),
            parent: g
                .parent
                .map_or_else(|| "-".into(), |p| util::group_name(state, p)),
            weight: g.weight,
            devices: state.group_members(&g.id).len(),
        }
    }
}

#[derive(Serialize)]
struct GroupOwner {
    group: String,
    controller: String,
    controller_id: ControllerId,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(inventory: &Inventory, args: GroupsArgs, render: &Render) -> Result<(), CliError> {
    let query = inventory.query();
    let snap = query.snapshot();

    let out = match args.command {
        GroupsCommand::List { controller } => {
            let controllers = match controller.as_deref() {
                Some(name) => vec![util::controller(snap, name)?],
                None => snap.controllers(),
            };
            let mut groups: Vec<&Arc<ControllerDeviceGroup>> = Vec::new();
            for c in controllers {
                groups.extend(query.groups_under_controller(&c.id)?);
            }
            output::render_list(
                render.format,
                &groups,
                |g| GroupRow::new(g, snap),
                |g| g.name.clone(),
            )?
        }

        GroupsCommand::Owner { group, controller } => {
            let g = util::group(snap, &group, controller.as_deref())?;
            let owner = query.controller_managing_group(&g.id)?;
            let answer = GroupOwner {
                group: g.name.clone(),
                controller: util::controller_name(snap, owner),
                controller_id: owner,
            };
            output::render_single(
                render.format,
                &answer,
                |a| output::detail(&[("Group", a.group.clone()), ("Controller", a.controller.clone())]),
                |a| a.controller.clone(),
            )?
        }

        GroupsCommand::Ancestors { group, controller } => {
            let g = util::group(snap, &group, controller.as_deref())?;
            let chain: Vec<_> = snap.forest().ancestors(&g.id).collect();
            output::render_list(
                render.format,
                &chain,
                |a| GroupRow::new(a, snap),
                |a| a.name.clone(),
            )?
        }
    };
    output::print_output(&out, render.quiet);
    Ok(())
}
