use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::io::Write;
use tempfile::NamedTempFile;

use ec2_inventory::error::PricingError;
use ec2_inventory::pricing::PricingTable;
use ec2_inventory::report;

fn write_pricing_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp pricing file");
    file.write_all(content.as_bytes())
        .expect("Failed to write pricing file");
    file
}

fn sample_instances() -> Vec<Value> {
    vec![
        json!({
            "InstanceId": "i-web",
            "InstanceType": "t3.micro",
            "State": { "Name": "running" },
            "Placement": { "AvailabilityZone": "us-east-1a" },
            "LaunchTime": "2024-01-01T00:00:00Z",
            "IamInstanceProfile": { "Arn": "arn:aws:iam::123:instance-profile/web" },
            "Tags": { "Name": "web-1", "owner": "alice", "guid": "g-1", "team": "undeclared" }
        }),
        json!({
            "InstanceId": "i-db",
            "InstanceType": "m5.large",
            "State": { "Name": "running" },
            "Placement": { "AvailabilityZone": "eu-west-1b" },
            "LaunchTime": "2024-01-06T00:00:00Z"
        }),
    ]
}

#[test]
fn instance_report_pipeline_attaches_costs_from_pricing_file() {
    let pricing_file = write_pricing_file(
        r#"{
            "us-east-1": { "t3.micro": 0.0104 },
            "eu-west-1": { "m5.large": 0.107 }
        }"#,
    );
    let pricing = PricingTable::load(pricing_file.path()).expect("pricing table should load");
    let now = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();

    let rows = report::reformat_instances(&sample_instances(), &pricing, now);

    assert_eq!(rows.len(), 2);

    let web = &rows[0];
    assert_eq!(web.get("InstanceId"), Some(&json!("i-web")));
    assert_eq!(web.get("Region"), Some(&json!("us-east-1a")));
    assert_eq!(web.get("Arn"), Some(&json!("arn:aws:iam::123:instance-profile/web")));
    // 10 days at 0.0104/hr
    assert_eq!(web.get("CostPerDay"), Some(&json!("$0.25")));
    assert_eq!(web.get("TotalBill"), Some(&json!("$2.50")));
    assert!(!web.contains_key("team"));
    assert!(!web.contains_key("State"));

    let db = &rows[1];
    assert_eq!(db.get("Region"), Some(&json!("eu-west-1b")));
    // 5 days at 0.107/hr = 12.84
    assert_eq!(db.get("CostPerDay"), Some(&json!("$2.57")));
    assert_eq!(db.get("TotalBill"), Some(&json!("$12.84")));
    // untagged instance simply has no tag keys
    assert!(!db.contains_key("Name"));
    assert!(!db.contains_key("owner"));
    assert!(!db.contains_key("guid"));
}

#[test]
fn instances_in_unpriced_regions_keep_their_rows() {
    let pricing_file = write_pricing_file(r#"{ "us-east-1": { "t3.micro": 0.0104 } }"#);
    let pricing = PricingTable::load(pricing_file.path()).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();

    let rows = report::reformat_instances(&sample_instances(), &pricing, now);

    let db = &rows[1];
    assert_eq!(db.get("InstanceId"), Some(&json!("i-db")));
    assert!(!db.contains_key("CostPerDay"));
    assert!(!db.contains_key("TotalBill"));
}

#[test]
fn missing_pricing_file_is_reported_with_its_path() {
    let missing = std::path::Path::new("/nonexistent/ec2_pricing.json");

    let error = PricingTable::load(missing).unwrap_err();

    assert!(matches!(error, PricingError::TableUnavailable { .. }));
    assert!(error.to_string().contains("/nonexistent/ec2_pricing.json"));
}

#[test]
fn malformed_pricing_file_is_rejected() {
    let pricing_file = write_pricing_file("{ not json");

    let error = PricingTable::load(pricing_file.path()).unwrap_err();

    assert!(matches!(error, PricingError::TableMalformed { .. }));
}

#[test]
fn eip_report_pipeline_renames_border_group_per_row() {
    let raw = vec![
        json!({
            "PublicIp": "3.95.0.1",
            "AllocationId": "eipalloc-1",
            "NetworkBorderGroup": "us-east-1",
            "InstanceId": "i-web",
            "Tags": { "Name": "nat", "owner": "alice", "guid": "g-2" }
        }),
        json!({
            "PublicIp": "3.95.0.2",
            "AllocationId": "eipalloc-2"
        }),
    ];

    let rows = report::reformat_eips(&raw);

    assert_eq!(rows[0].get("Region"), Some(&json!("us-east-1")));
    assert!(!rows[0].contains_key("NetworkBorderGroup"));
    assert!(!rows[1].contains_key("Region"));
    assert_eq!(rows[1].get("AllocationId"), Some(&json!("eipalloc-2")));
}
