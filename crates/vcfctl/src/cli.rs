//! CLI structure and command definitions

use clap::{Parser, Subcommand};

/// Command-line client for the SDDC Manager API
#[derive(Parser, Debug)]
#[command(name = "vcfctl")]
#[command(
    version,
    about = "Command-line client for the SDDC Manager API of VMware Cloud Foundation"
)]
#[command(long_about = "
Command-line client for the SDDC Manager API of VMware Cloud Foundation

Long-running SDDC Manager operations return a task id. vcfctl follows those
tasks to completion and reads the resources they created.

EXAMPLES:
    # Set up a profile (the password is prompted for on first use)
    vcfctl profile set lab --host sddc-manager.lab.example.com \\
        --username administrator@vsphere.local

    # Follow a task until it finishes
    vcfctl task wait 2c9e1a04-9d7b-4a1c-8d5f-6b0f2c1e7a11

    # Read the cluster a finished task created
    vcfctl task resource 2c9e1a04-9d7b-4a1c-8d5f-6b0f2c1e7a11 Cluster

    # Use environment variables instead of a profile
    export VCF_SDDC_MANAGER_HOST=sddc-manager.lab.example.com
    export VCF_SDDC_MANAGER_USERNAME=administrator@vsphere.local
    export VCF_SDDC_MANAGER_PASSWORD=...
    vcfctl task get 2c9e1a04-9d7b-4a1c-8d5f-6b0f2c1e7a11 -o json

For more help on a specific command, run:
    vcfctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "VCFCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file (environment overrides are ignored)
    #[arg(long, global = true, env = "VCFCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Auto,
    /// JSON output
    Json,
    /// Tabular output, same as auto
    Table,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and follow SDDC Manager tasks
    #[command(subcommand, visible_alias = "t")]
    Task(TaskCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    #[command(after_help = "EXAMPLES:
    # List all profiles
    vcfctl profile list

    # Create a profile for a lab appliance with a self-signed certificate
    vcfctl profile set lab --host 10.0.0.4 --username admin@local --allow-unverified-tls

    # Make it the default
    vcfctl profile default lab
")]
    Profile(ProfileCommands),

    /// Show version information
    #[command(visible_alias = "ver", visible_alias = "v")]
    Version,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Fetch the current state of a task
    #[command(visible_alias = "show")]
    Get {
        /// Task id
        task_id: String,
    },

    /// Poll a task until it finishes (Ctrl-C stops waiting, not the task)
    #[command(after_help = "EXAMPLES:
    # Poll every 20 seconds (or the profile's interval) with no time limit
    vcfctl task wait 2c9e1a04-9d7b-4a1c-8d5f-6b0f2c1e7a11

    # Poll every 5 seconds and give up after an hour
    vcfctl task wait 2c9e1a04-9d7b-4a1c-8d5f-6b0f2c1e7a11 --interval 5 --timeout 3600
")]
    Wait {
        /// Task id
        task_id: String,

        /// Polling interval in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Maximum time to wait in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },

    /// Print the id of a resource a task created
    #[command(visible_alias = "res")]
    Resource {
        /// Task id
        task_id: String,

        /// Resource type as reported by the task, e.g. Cluster, Domain, Host
        resource_type: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls", visible_alias = "l")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "sh", visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add", visible_alias = "create")]
    Set {
        /// Profile name
        name: String,

        /// SDDC Manager hostname, or a full https:// URL
        #[arg(long)]
        host: String,

        /// Port, when not 443
        #[arg(long)]
        port: Option<u16>,

        /// SSO username
        #[arg(long)]
        username: String,

        /// Password (prompted for on first use when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Skip TLS certificate verification
        #[arg(long)]
        allow_unverified_tls: bool,

        /// Default polling interval in seconds for `task wait`
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        poll_interval: Option<u64>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,

        /// Store the password in the OS keyring instead of the config file
        #[cfg(feature = "secure-storage")]
        #[arg(long, requires = "password")]
        use_keyring: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm", visible_alias = "del", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    #[command(visible_alias = "def")]
    Default {
        /// Profile name to use by default
        name: String,
    },
}
