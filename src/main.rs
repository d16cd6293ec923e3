use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use ec2_inventory::cli::{Args, Command};
use ec2_inventory::ec2::Ec2Scanner;
use ec2_inventory::logging;
use ec2_inventory::output::print_rows;
use ec2_inventory::pricing::{EC2_PRICING_API_URL, PricingTable};
use ec2_inventory::report;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_format, &args.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "EC2 inventory reporter starting"
    );

    match args.command {
        Command::Instances {
            region,
            pricing_file,
        } => {
            let pricing = PricingTable::load(&pricing_file).with_context(|| {
                format!("Pricing table is required for instance reports; seed it from {EC2_PRICING_API_URL}")
            })?;

            let scanner = Ec2Scanner::new(region.as_deref()).await?;
            let mut raw: Vec<Value> = Vec::new();
            for scan_region in scan_regions(&scanner, region).await? {
                let in_region = scanner.running_instances(&scan_region).await?;
                info!(
                    region = %scan_region,
                    count = in_region.len(),
                    "Instance scan complete for region"
                );
                raw.extend(in_region);
            }

            let rows = report::reformat_instances(&raw, &pricing, Utc::now());
            info!(total = rows.len(), "Running instance scan complete");
            print_rows(&rows, report::INSTANCE_COLUMNS, args.output)?;
        }

        Command::Eips { region } => {
            let scanner = Ec2Scanner::new(region.as_deref()).await?;
            let mut raw: Vec<Value> = Vec::new();
            for scan_region in scan_regions(&scanner, region).await? {
                let in_region = scanner.addresses(&scan_region).await?;
                info!(
                    region = %scan_region,
                    count = in_region.len(),
                    "Elastic IP scan complete for region"
                );
                raw.extend(in_region);
            }

            let rows = report::reformat_eips(&raw);
            info!(total = rows.len(), "Elastic IP scan complete");
            print_rows(&rows, report::EIP_COLUMNS, args.output)?;
        }

        Command::Volumes { region } => {
            let scanner = Ec2Scanner::new(region.as_deref()).await?;
            let mut raw: Vec<Value> = Vec::new();
            for scan_region in scan_regions(&scanner, region).await? {
                let in_region = scanner.unused_volumes(&scan_region).await?;
                info!(
                    region = %scan_region,
                    count = in_region.len(),
                    "Volume scan complete for region"
                );
                raw.extend(in_region);
            }

            let rows = report::volume_rows(&raw);
            info!(total = rows.len(), "Unused volume scan complete");
            print_rows(&rows, report::VOLUME_COLUMNS, args.output)?;
        }

        Command::Terminate {
            instance_ids,
            region,
            dry_run,
        } => {
            if dry_run {
                warn!(
                    instance_ids = ?instance_ids,
                    "DRY RUN: would terminate instances, skipping API call"
                );
                return Ok(());
            }

            let scanner = Ec2Scanner::new(region.as_deref()).await?;
            let response = scanner.terminate_instances(&instance_ids).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::DeleteVolume {
            volume_id,
            region,
            dry_run,
        } => {
            if dry_run {
                warn!(
                    volume_id = %volume_id,
                    region = %region,
                    "DRY RUN: would delete volume, skipping API call"
                );
                return Ok(());
            }

            let scanner = Ec2Scanner::new(None).await?;
            let response = scanner.delete_volume(&volume_id, &region).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::ReleaseEip {
            allocation_id,
            region,
            dry_run,
        } => {
            if dry_run {
                warn!(
                    allocation_id = %allocation_id,
                    region = %region,
                    "DRY RUN: would release Elastic IP, skipping API call"
                );
                return Ok(());
            }

            let scanner = Ec2Scanner::new(None).await?;
            let response = scanner.release_address(&allocation_id, &region).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Regions to scan: a single explicit region skips region discovery,
/// otherwise every region visible to the account is scanned in sequence.
async fn scan_regions(scanner: &Ec2Scanner, region: Option<String>) -> Result<Vec<String>> {
    match region {
        Some(r) => Ok(vec![r]),
        None => scanner.regions().await,
    }
}
