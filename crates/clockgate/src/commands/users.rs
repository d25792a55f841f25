//! User listing and site-wide user mutations.

use serde_json::Value;
use tabled::Tabled;

use clockgate_core::payload::parse_cpf_filter;
use clockgate_core::{
    ActionOutcome, ActionResult, ActionSummary, Gateway, ListQuery, NormalizedUser, UserAction,
    UserListing,
};

use crate::cli::{GlobalOpts, MutationArgs, UserListArgs, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CPF")]
    cpf: String,
    #[tabled(rename = "Registration")]
    registration: String,
    #[tabled(rename = "RFID")]
    rfid: String,
    #[tabled(rename = "Face")]
    face: String,
}

impl From<&NormalizedUser> for UserRow {
    fn from(u: &NormalizedUser) -> Self {
        Self {
            uid: u.uid.clone(),
            name: u.name.clone(),
            cpf: u.cpf.clone().unwrap_or_default(),
            registration: u.registration.clone().unwrap_or_default(),
            rfid: u.rfid.clone().unwrap_or_default(),
            face: if u.has_face { "yes".into() } else { "no".into() },
        }
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "HTTP")]
    status_code: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn result_row(r: &ActionResult, color: bool) -> ResultRow {
    ResultRow {
        id: r.device_id.clone(),
        label: r.label.clone(),
        address: r.address.clone(),
        result: output::status(if r.ok { "ok" } else { "failed" }, r.ok, color),
        attempts: r.attempts,
        status_code: r.status_code.map(|c| c.to_string()).unwrap_or_default(),
        message: r.message.clone().unwrap_or_default(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    gateway: &Gateway,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List(list) => list_users(gateway, &list, global).await,
        UsersCommand::Update(m) => mutate(gateway, UserAction::UpdateGeneral, &m, global).await,
        UsersCommand::Add(m) => mutate(gateway, UserAction::AddUser, &m, global).await,
        UsersCommand::UpdatePhoto(m) => mutate(gateway, UserAction::UpdatePhoto, &m, global).await,
        UsersCommand::RemovePhoto(m) => mutate(gateway, UserAction::RemovePhoto, &m, global).await,
        UsersCommand::Remove(m) => mutate(gateway, UserAction::RemoveUser, &m, global).await,
    }
}

async fn list_users(
    gateway: &Gateway,
    args: &UserListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut query = ListQuery::new(args.limit, args.offset);
    if let Some(ref cpf) = args.cpf {
        query = query.with_cpfs(parse_cpf_filter(&Value::String(cpf.clone())));
    }

    let listing = gateway.list_users(&args.site, &query).await?;
    let out = output::render_single(
        &global.output,
        &listing,
        |l: &UserListing| {
            let rows: Vec<UserRow> = l.users.iter().map(UserRow::from).collect();
            output::render_table(&rows)
        },
        |l| {
            l.users
                .iter()
                .map(|u| u.uid.clone())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    output::note(
        &format!(
            "{} users from {} ({}, filter: {})",
            listing.count, listing.device_id, listing.address, listing.meta.filter
        ),
        global.quiet,
    );
    Ok(())
}

async fn mutate(
    gateway: &Gateway,
    action: UserAction,
    args: &MutationArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let data = util::read_payload(&args.payload)?;
    let summary = gateway.run_action(&args.site, action, &data).await?;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &summary,
        |s: &ActionSummary| {
            let rows: Vec<ResultRow> = s.results.iter().map(|r| result_row(r, color)).collect();
            output::render_table(&rows)
        },
        |s| {
            s.results
                .iter()
                .map(|r| format!("{}\t{}", r.device_id, if r.ok { "ok" } else { "failed" }))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    output::note(
        &format!(
            "{}: {}/{} terminals applied ({})",
            summary.action,
            summary.success,
            summary.total,
            summary.outcome()
        ),
        global.quiet,
    );

    match summary.outcome() {
        ActionOutcome::Complete => Ok(()),
        ActionOutcome::Partial => Err(CliError::PartiallyApplied {
            action: summary.action,
            failure: summary.failure,
            total: summary.total,
        }),
        ActionOutcome::None => Err(CliError::NothingApplied {
            action: summary.action,
        }),
    }
}
