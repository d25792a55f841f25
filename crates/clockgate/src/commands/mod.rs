//! Command dispatch: bridges CLI args -> gateway operations -> output formatting.

pub mod coils;
pub mod config_cmd;
pub mod count;
pub mod devices;
pub mod health;
pub mod users;
pub mod util;

use clockgate_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Health(args) => health::handle(gateway, &args, global).await,
        Command::Count(args) => count::handle(gateway, &args, global).await,
        Command::Users(args) => users::handle(gateway, args, global).await,
        Command::Coils => coils::handle(gateway, global).await,
        // Handled before a gateway is built
        Command::Devices(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
