//! Fleet health sweep.

use tabled::Tabled;

use clockgate_core::{DeviceHealth, Gateway, HealthReport, HealthStatus};

use crate::cli::{GlobalOpts, HealthArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Last Error")]
    last_error: String,
}

fn row(h: &DeviceHealth, color: bool) -> HealthRow {
    HealthRow {
        id: h.device.id.clone(),
        site: h.device.site.clone(),
        address: h.device.address.clone(),
        status: output::status(&h.status.to_string(), h.status == HealthStatus::Online, color),
        attempts: h.attempts,
        last_error: h.last_error.clone().unwrap_or_default(),
    }
}

pub async fn handle(
    gateway: &Gateway,
    args: &HealthArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = gateway.health_sweep(args.site.as_deref()).await?;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &report,
        |r: &HealthReport| {
            let rows: Vec<HealthRow> = r.data.iter().map(|h| row(h, color)).collect();
            output::render_table(&rows)
        },
        |r| {
            r.data
                .iter()
                .filter(|h| h.status == HealthStatus::Online)
                .map(|h| h.device.id.clone())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    output::note(
        &format!("{}/{} terminals online", report.online, report.total),
        global.quiet,
    );
    Ok(())
}
