use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Multi-region EC2 inventory reporting and cleanup
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format for listing commands
    #[arg(long, value_enum, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List running instances across all regions with billing estimates
    Instances {
        /// Restrict the scan to a single region
        // No AWS_REGION fallback: the default must stay a full scan.
        #[arg(long)]
        region: Option<String>,

        /// Pricing table path (JSON: region -> instance type -> hourly USD)
        #[arg(long, env = "EC2_PRICING_FILE", default_value = "./ec2_pricing.json")]
        pricing_file: PathBuf,
    },

    /// List Elastic IP allocations across all regions
    Eips {
        /// Restrict the scan to a single region
        // No AWS_REGION fallback: the default must stay a full scan.
        #[arg(long)]
        region: Option<String>,
    },

    /// List volumes not attached to any instance across all regions
    Volumes {
        /// Restrict the scan to a single region
        // No AWS_REGION fallback: the default must stay a full scan.
        #[arg(long)]
        region: Option<String>,
    },

    /// Terminate instances by ID
    Terminate {
        /// Instance IDs to terminate
        #[arg(required = true)]
        instance_ids: Vec<String>,

        /// Region the instances live in (defaults to the SDK's region)
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,

        /// Log the request without calling the API
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete an unattached volume
    DeleteVolume {
        /// Volume ID to delete
        volume_id: String,

        /// Region the volume lives in
        #[arg(long)]
        region: String,

        /// Log the request without calling the API
        #[arg(long)]
        dry_run: bool,
    },

    /// Release an Elastic IP allocation
    ReleaseEip {
        /// Allocation ID to release
        allocation_id: String,

        /// Region the allocation lives in
        #[arg(long)]
        region: String,

        /// Log the request without calling the API
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
