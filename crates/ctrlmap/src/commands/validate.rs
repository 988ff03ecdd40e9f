//! `validate`: load the declaration file and summarize it.

use serde::Serialize;

use ctrlmap_core::LoadReport;

use crate::error::CliError;
use crate::output::{self, Render};

use super::Session;

#[derive(Serialize)]
struct ValidateReport {
    file: String,
    #[serde(flatten)]
    loaded: LoadReport,
}

pub fn handle(session: &Session, render: &Render) -> Result<(), CliError> {
    let report = ValidateReport {
        file: session.path.display().to_string(),
        loaded: session.report,
    };
    let out = output::render_single(
        render.format,
        &report,
        |r| {
            output::detail(&[
                ("File", r.file.clone()),
                ("Controllers", r.loaded.controllers.to_string()),
                ("Device groups", r.loaded.groups.to_string()),
                ("Devices", r.loaded.devices.to_string()),
                ("Redundancy groups", r.loaded.redundancy_groups.to_string()),
                ("Memberships", r.loaded.memberships.to_string()),
            ])
        },
        |r| summary(&r.loaded),
    )?;
    output::print_output(&out, render.quiet);
    Ok(())
}

fn summary(r: &LoadReport) -> String {
    format!(
        "{} controllers, {} groups, {} devices, {} redundancy groups, {} memberships",
        r.controllers, r.groups, r.devices, r.redundancy_groups, r.memberships
    )
}
