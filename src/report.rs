use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::flatten::{Row, reformat_data};
use crate::pricing::PricingTable;

/// Dotted paths selected from raw instance records.
pub const INSTANCE_KEYS: &[&str] = &[
    "InstanceId",
    "InstanceType",
    "Placement.AvailabilityZone",
    "LaunchTime",
    "IamInstanceProfile.Arn",
    "Tags.owner",
    "Tags.Name",
    "Tags.guid",
];

/// Dotted paths selected from raw Elastic IP records.
pub const EIP_KEYS: &[&str] = &[
    "Tags.Name",
    "PublicIp",
    "AllocationId",
    "NetworkBorderGroup",
    "InstanceId",
    "Tags.guid",
    "Tags.owner",
];

/// Column order for instance tables.
pub const INSTANCE_COLUMNS: &[&str] = &[
    "InstanceId",
    "InstanceType",
    "Region",
    "LaunchTime",
    "Arn",
    "Name",
    "owner",
    "guid",
    "CostPerDay",
    "TotalBill",
];

/// Column order for Elastic IP tables.
pub const EIP_COLUMNS: &[&str] = &[
    "Name",
    "PublicIp",
    "AllocationId",
    "Region",
    "InstanceId",
    "owner",
    "guid",
];

/// Column order for unused-volume tables.
pub const VOLUME_COLUMNS: &[&str] = &[
    "VolumeId",
    "Size",
    "State",
    "VolumeType",
    "AvailabilityZone",
    "Region",
    "CreateTime",
    "Encrypted",
    "SnapshotId",
];

static AZ_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+-\w+-\d)\w+").expect("valid availability zone pattern"));

/// Collapse an availability zone to its region code for pricing lookups:
/// `us-east-1a` becomes `us-east-1`. Strings without a zone suffix pass
/// through unchanged, so a bare region code is its own region code.
pub fn region_code(availability_zone: &str) -> String {
    AZ_SUFFIX.replace(availability_zone, "$1").into_owned()
}

/// Flatten raw instance records into reporting rows and attach billing
/// estimates. The `AvailabilityZone` key is renamed to `Region` (keeping the
/// zone string); the collapsed region code is only used for the pricing
/// lookup. Rows without a resolvable price keep their other fields and just
/// omit the cost keys.
pub fn reformat_instances(raw: &[Value], pricing: &PricingTable, now: DateTime<Utc>) -> Vec<Row> {
    let mut rows = reformat_data(raw, INSTANCE_KEYS);

    for row in &mut rows {
        let Some(zone) = row.remove("AvailabilityZone") else {
            continue;
        };
        let zone_text = zone.as_str().unwrap_or_default().to_string();
        let lookup_region = region_code(&zone_text);
        row.insert("Region".to_string(), zone);

        attach_costs(row, &lookup_region, pricing, now);
    }

    rows
}

fn attach_costs(row: &mut Row, region: &str, pricing: &PricingTable, now: DateTime<Utc>) {
    let instance_id = row
        .get("InstanceId")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let Some(instance_type) = row
        .get("InstanceType")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        warn!(instance_id = %instance_id, "Instance has no type, omitting cost fields");
        return;
    };

    let Some(launch_time) = row
        .get("LaunchTime")
        .and_then(Value::as_str)
        .and_then(parse_launch_time)
    else {
        warn!(instance_id = %instance_id, "Instance has no launch time, omitting cost fields");
        return;
    };

    match pricing.estimate(&instance_type, region, launch_time, now) {
        Ok(bill) => {
            row.insert(
                "CostPerDay".to_string(),
                Value::String(format!("${:.2}", bill.per_day)),
            );
            row.insert(
                "TotalBill".to_string(),
                Value::String(format!("${:.2}", bill.total)),
            );
        }
        Err(error) => {
            warn!(
                instance_id = %instance_id,
                instance_type = %instance_type,
                region = %region,
                error = %error,
                "No pricing entry, omitting cost fields"
            );
        }
    }
}

fn parse_launch_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Flatten raw Elastic IP records into reporting rows, renaming
/// `NetworkBorderGroup` to `Region` when present and omitting it otherwise.
pub fn reformat_eips(raw: &[Value]) -> Vec<Row> {
    let mut rows = reformat_data(raw, EIP_KEYS);

    for row in &mut rows {
        if let Some(group) = row.remove("NetworkBorderGroup") {
            row.insert("Region".to_string(), group);
        }
    }

    rows
}

/// Unused-volume records are already flat apart from `Tags`; expose their
/// top-level attributes directly as rows.
pub fn volume_rows(raw: &[Value]) -> Vec<Row> {
    raw.iter()
        .filter_map(Value::as_object)
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .collect()
}
