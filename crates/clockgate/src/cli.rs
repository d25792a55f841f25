//! Clap derive structures for the `clockgate` CLI.
//!
//! Also compiled by `build.rs` for man page generation, so this file must
//! only depend on clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// clockgate -- operate a fleet of biometric time-clock terminals
#[derive(Debug, Parser)]
#[command(
    name = "clockgate",
    version,
    about = "Manage biometric time-clock terminals from the command line",
    long_about = "Health checks, user management and coil paper monitoring for a fleet\n\
        of biometric time-clock terminals. Mutations are applied to every\n\
        terminal of a site, one device at a time, with per-device results.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "CLOCKGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CLOCKGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Per-call timeout in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the configured terminals
    #[command(alias = "dev")]
    Devices(DevicesArgs),

    /// Check which terminals answer with a valid session
    Health(HealthArgs),

    /// Count registered users on a site's master terminal
    Count(SiteArgs),

    /// List and modify users across a site
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Read remaining coil paper from monitored terminals
    Coils,

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SiteArgs {
    /// Site name (case-insensitive)
    #[arg(long, short = 's')]
    pub site: String,
}

/// JSON body for a mutation, inline or from a file.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Inline JSON body
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long = "from-file", short = 'F', value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MutationArgs {
    /// Site whose terminals receive the change
    #[arg(long, short = 's')]
    pub site: String,

    #[command(flatten)]
    pub payload: PayloadArgs,
}

// ── Devices / Health ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only show terminals of this site
    #[arg(long, short = 's')]
    pub site: Option<String>,
}

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Only probe terminals of this site (default: every terminal)
    #[arg(long, short = 's')]
    pub site: Option<String>,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users from the site master, by page or by CPF
    #[command(alias = "ls")]
    List(UserListArgs),

    /// Update name, badge, code, password or admin flag
    Update(MutationArgs),

    /// Create one user, or a batch via {"users": [...]}
    Add(MutationArgs),

    /// Replace a user's face photo
    UpdatePhoto(MutationArgs),

    /// Remove a user's face templates
    RemovePhoto(MutationArgs),

    /// Delete users by CPF
    #[command(alias = "rm")]
    Remove(MutationArgs),
}

#[derive(Debug, Args)]
pub struct UserListArgs {
    /// Site name (case-insensitive)
    #[arg(long, short = 's')]
    pub site: String,

    /// Page size
    #[arg(long, short = 'l', default_value = "100")]
    pub limit: u64,

    /// Page offset
    #[arg(long, default_value = "0")]
    pub offset: u64,

    /// Comma-separated CPFs; replaces pagination when given
    #[arg(long)]
    pub cpf: Option<String>,
}

// ── Config / Completions ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved configuration (passwords masked)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
