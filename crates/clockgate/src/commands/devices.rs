//! Device catalog listing.

use tabled::Tabled;

use clockgate_core::{Device, DeviceRegistry};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Master")]
    master: String,
    #[tabled(rename = "Coil")]
    coil: String,
}

fn mark(flag: bool) -> String {
    if flag { "yes".into() } else { String::new() }
}

pub fn handle(
    registry: &DeviceRegistry,
    args: &DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let devices: Vec<Device> = match args.site {
        Some(ref site) => registry.site_devices(site)?,
        None => registry.devices().to_vec(),
    };
    let coil = registry.coil_monitored();

    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow {
            id: d.id.clone(),
            site: d.site.clone(),
            label: d.label.clone(),
            address: d.address.clone(),
            master: mark(
                registry
                    .site_master(&d.site)
                    .is_ok_and(|m| m.address == d.address),
            ),
            coil: mark(coil.iter().any(|c| c.address == d.address)),
        },
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
