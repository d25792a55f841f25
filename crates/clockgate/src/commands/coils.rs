//! Coil paper sweep.

use tabled::Tabled;

use clockgate_core::{CoilReport, CoilStatus, Gateway, ReadingStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CoilRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Coil Paper")]
    coil_paper: String,
    #[tabled(rename = "Last Error")]
    last_error: String,
}

fn row(c: &CoilStatus, color: bool) -> CoilRow {
    CoilRow {
        id: c.device.id.clone(),
        label: c.device.label.clone(),
        address: c.device.address.clone(),
        status: output::status(&c.status.to_string(), c.status == ReadingStatus::Success, color),
        coil_paper: c.coil_paper.map(|v| format!("{v:.1}")).unwrap_or_default(),
        last_error: c.last_error.clone().unwrap_or_default(),
    }
}

pub async fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let report = gateway.coil_sweep().await;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &report,
        |r: &CoilReport| {
            let rows: Vec<CoilRow> = r.data.iter().map(|c| row(c, color)).collect();
            output::render_table(&rows)
        },
        |r| {
            r.data
                .iter()
                .map(|c| {
                    let reading = c.coil_paper.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                    format!("{}\t{reading}", c.device.id)
                })
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
