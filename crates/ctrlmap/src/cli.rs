//! Clap derive structures for the `ctrlmap` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ctrlmap_core::{GroupNameScope, OwnershipPath};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ctrlmap -- which controller manages which device
#[derive(Debug, Parser)]
#[command(
    name = "ctrlmap",
    version,
    about = "Query controller, device group and redundancy inventories",
    long_about = "Loads a declaration file of controllers, controller device groups,\n\
        devices and redundancy groups, checks it against the inventory's\n\
        consistency rules, and answers ownership questions in both directions.",
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
    /// Declaration file (YAML, or JSON with a .json extension)
    #[arg(long, short = 'i', env = "CTRLMAP_INVENTORY", global = true)]
    pub inventory: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "CTRLMAP_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Scope in which device group names must be unique (overrides config)
    #[arg(long, value_enum, global = true)]
    pub group_names: Option<GroupNames>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupNames {
    /// One name across every controller
    Global,
    /// Unique within one controller's forest
    PerController,
}

impl From<GroupNames> for GroupNameScope {
    fn from(value: GroupNames) -> Self {
        match value {
            GroupNames::Global => Self::Global,
            GroupNames::PerController => Self::PerController,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Via {
    /// Device -> controller device group -> controller
    Hierarchy,
    /// Controllers deployed on the device or its redundancy group
    Deployment,
}

impl From<Via> for OwnershipPath {
    fn from(value: Via) -> Self {
        match value {
            Via::Hierarchy => Self::Hierarchy,
            Via::Deployment => Self::Deployment,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the declaration file and report what it contains
    Validate,

    /// Inspect controllers
    #[command(alias = "ctl", alias = "c")]
    Controllers(ControllersArgs),

    /// Inspect controller device groups
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// Inspect devices and their owners
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect device redundancy groups
    #[command(alias = "rg")]
    RedundancyGroups(RedundancyGroupsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Controllers ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ControllersArgs {
    #[command(subcommand)]
    pub command: ControllersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ControllersCommand {
    /// List controllers
    #[command(alias = "ls")]
    List,

    /// Show one controller
    Get {
        /// Controller name
        name: String,
    },

    /// Devices managed by a controller, and the hardware it runs on
    Devices {
        /// Controller name
        name: String,
    },
}

// ── Groups ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List groups depth-first, one controller forest after another
    #[command(alias = "ls")]
    List {
        /// Only this controller's forest
        #[arg(long, short = 'c')]
        controller: Option<String>,
    },

    /// The controller that owns a group
    Owner {
        /// Group name
        group: String,

        /// Qualify the group name with its controller
        #[arg(long, short = 'c')]
        controller: Option<String>,
    },

    /// A group's parent chain, nearest first
    Ancestors {
        /// Group name
        group: String,

        /// Qualify the group name with its controller
        #[arg(long, short = 'c')]
        controller: Option<String>,
    },
}

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List,

    /// Controllers responsible for a device
    Owner {
        /// Device name or asset tag
        device: String,

        /// Answer along one relation only
        #[arg(long, value_enum)]
        via: Option<Via>,

        /// Fail when more than one controller claims the device
        #[arg(long, conflicts_with = "via")]
        strict: bool,
    },

    /// The controller device group holding a device
    Group {
        /// Device name or asset tag
        device: String,
    },
}

// ── Redundancy groups ───────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RedundancyGroupsArgs {
    #[command(subcommand)]
    pub command: RedundancyGroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RedundancyGroupsCommand {
    /// List redundancy groups
    #[command(alias = "ls")]
    List,

    /// Members by priority
    Members {
        /// Redundancy group name
        name: String,
    },
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
