//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Approve shell commands proposed by coding agents")]
pub struct Cli {
    /// Config directory (default: $WARDEN_CONFIG_DIR or ~/.config/warden)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Active project (default: $WARDEN_PROJECT)
    #[arg(long, global = true, value_name = "NAME")]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decide whether a command chain may run (exit 0 approved, 1 denied, 2 error)
    Check(CheckArgs),

    /// Inspect or edit durable approvals
    #[command(subcommand)]
    Approvals(ApprovalsCommand),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Label shown while prompting
    #[arg(long, short)]
    pub description: Option<String>,

    /// JSON file carrying session approvals between calls
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Never prompt; anything not already approved is denied
    #[arg(long)]
    pub no_prompt: bool,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,

    /// The command chain, as one quoted string or as separate words
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum ApprovalsCommand {
    /// Show global and project approvals
    List {
        #[arg(long)]
        json: bool,
    },

    /// Add a durable approval
    Add(RuleArgs),

    /// Remove a durable approval
    Remove(RuleArgs),
}

#[derive(Debug, Args)]
pub struct RuleArgs {
    #[arg(long, value_enum, default_value_t = ScopeArg::Global)]
    pub scope: ScopeArg,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regex: bool,

    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Global,
    Project,
}
