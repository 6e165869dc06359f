//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand, ValueEnum};

/// Power control for virtual OpenShift test nodes
#[derive(Parser, Debug)]
#[command(name = "znodes")]
#[command(version)]
#[command(about = "Stop, start and restart cluster nodes via virsh or kubelet")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (defaults to the standard search locations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Nodes handled at the same time
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// How to decide between virsh and kubelet control
    #[arg(long, global = true, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,
}

/// Environment mode selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Probe the host (lsmod) and honor bastion_ip
    Auto,
    /// Assume a KVM host
    Virtualized,
    /// Assume externally managed nodes
    Generic,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether nodes are local KVM domains
    Detect,

    /// Show the domain state of nodes
    State {
        /// Node names
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Power off nodes
    Stop(PowerArgs),

    /// Power on nodes
    Start(PowerArgs),

    /// Power cycle nodes
    Restart(PowerArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments shared by stop/start/restart
#[derive(Parser, Debug)]
pub struct PowerArgs {
    /// Node names
    #[arg(required = true)]
    pub nodes: Vec<String>,

    /// Timeout in seconds (defaults to the configured timeout)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Do not wait for nodes to settle
    #[arg(long)]
    pub no_wait: bool,

    /// Ungraceful power off
    #[arg(short, long)]
    pub force: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(default_value = "./znodes.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate
        file: Option<String>,
    },

    /// Show environment variable overrides
    Env,
}
