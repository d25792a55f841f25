use clockgate_core::{Gateway, UserCountSummary};

use crate::cli::{GlobalOpts, SiteArgs};
use crate::error::CliError;
use crate::output;

fn detail(s: &UserCountSummary) -> String {
    [
        format!("Site:     {}", s.site),
        format!("Terminal: {} ({})", s.device_id, s.address),
        format!("Users:    {}", s.count),
        format!("At:       {}", s.generated_at.to_rfc3339()),
    ]
    .join("\n")
}

pub async fn handle(
    gateway: &Gateway,
    args: &SiteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let summary = gateway.user_count(&args.site).await?;
    let out = output::render_single(&global.output, &summary, detail, |s| s.count.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
