use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "inventory-agent")]
#[command(about = "Collects workstation hardware inventory and registers it with the inventory server")]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hardware inventory collection commands
    #[command(subcommand)]
    Hardware(HardwareCommands),

    /// Collect inventory and register this machine with the server
    Register(RegisterArgs),

    /// Ask the server whether this device or an employee ID is already registered
    Check {
        /// Employee ID to look up
        #[arg(short, long)]
        employee_id: String,

        /// Device name (defaults to this machine's host name)
        #[arg(short, long)]
        device: Option<String>,

        /// Inventory server base URL
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum HardwareCommands {
    /// Collect full hardware inventory
    Inventory {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Collect CPU information
    Cpu {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Collect memory information
    Memory {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Collect storage/disk information
    Storage {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Collect connected display information
    Displays {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

#[derive(clap::Args)]
pub struct RegisterArgs {
    /// Inventory server base URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Department the machine belongs to
    #[arg(long)]
    pub department: Option<String>,

    /// Sector within the department
    #[arg(long)]
    pub sector: Option<String>,

    /// Employee ID of the machine's user
    #[arg(long)]
    pub employee_id: Option<String>,

    /// Full name of the machine's user
    #[arg(long)]
    pub full_name: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}
