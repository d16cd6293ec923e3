use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Address, Filter, Instance, Reservation, Tag, Volume};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

const RUNNING_STATE: &str = "running";
const UNUSED_VOLUME_STATUSES: &[&str] = &["available", "error"];

/// Region-scoped EC2 access for the inventory scan.
///
/// One SDK config is loaded up front; per-region clients are derived from it
/// so the multi-region loop does not re-resolve credentials on every region.
pub struct Ec2Scanner {
    base_config: SdkConfig,
    default_region: String,
}

impl Ec2Scanner {
    /// Region resolution priority:
    /// 1. Explicit region (`--region` CLI arg or AWS_REGION env var)
    /// 2. AWS SDK defaults (environment, ~/.aws/config, IMDS)
    pub async fn new(region: Option<&str>) -> Result<Self> {
        debug!("Initializing AWS SDK configuration");

        let base_config = match region {
            Some(r) => {
                info!(region = %r, "Using explicit AWS region");
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(r.to_string()))
                    .load()
                    .await
            }
            None => {
                debug!("Using default AWS region from environment/credentials/IMDS");
                aws_config::load_defaults(BehaviorVersion::latest()).await
            }
        };

        let default_region = base_config
            .region()
            .map(|r| r.as_ref())
            .unwrap_or("unknown")
            .to_string();

        info!(
            region = %default_region,
            "AWS EC2 client configuration initialized"
        );

        Ok(Self {
            base_config,
            default_region,
        })
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    fn client_for(&self, region: &str) -> Client {
        let config = aws_sdk_ec2::config::Builder::from(&self.base_config)
            .region(Region::new(region.to_string()))
            .build();
        Client::from_conf(config)
    }

    /// List every region name visible to this account, sorted for a stable
    /// scan order.
    pub async fn regions(&self) -> Result<Vec<String>> {
        let client = Client::new(&self.base_config);
        let response = client
            .describe_regions()
            .send()
            .await
            .context("Failed to describe EC2 regions")?;

        let mut names: Vec<String> = response
            .regions()
            .iter()
            .filter_map(|r| r.region_name().map(str::to_string))
            .collect();
        names.sort();

        info!(region_count = names.len(), "Fetched region list");
        Ok(names)
    }

    /// Raw records for instances in the `running` state in one region.
    pub async fn running_instances(&self, region: &str) -> Result<Vec<Value>> {
        let client = self.client_for(region);
        let response = client
            .describe_instances()
            .send()
            .await
            .with_context(|| format!("Failed to describe instances in {region}"))?;

        let records = collect_running(response.reservations());

        debug!(
            region,
            running_count = records.len(),
            "Collected running instances"
        );
        Ok(records)
    }

    /// Raw records for every Elastic IP allocation in one region.
    pub async fn addresses(&self, region: &str) -> Result<Vec<Value>> {
        let client = self.client_for(region);
        let response = client
            .describe_addresses()
            .send()
            .await
            .with_context(|| format!("Failed to describe addresses in {region}"))?;

        let records: Vec<Value> = response.addresses().iter().map(address_record).collect();

        debug!(region, eip_count = records.len(), "Collected Elastic IPs");
        Ok(records)
    }

    /// Raw records for volumes not attached to any instance in one region
    /// (status `available` or `error`), with the region injected into each
    /// record since volumes carry no region field of their own.
    pub async fn unused_volumes(&self, region: &str) -> Result<Vec<Value>> {
        let client = self.client_for(region);
        let response = client
            .describe_volumes()
            .filters(unused_volume_filter())
            .send()
            .await
            .with_context(|| format!("Failed to describe volumes in {region}"))?;

        let records: Vec<Value> = response
            .volumes()
            .iter()
            .map(|volume| {
                let mut record = volume_record(volume);
                if let Some(object) = record.as_object_mut() {
                    object.insert("Region".to_string(), json!(region));
                }
                record
            })
            .collect();

        debug!(
            region,
            volume_count = records.len(),
            "Collected unused volumes"
        );
        Ok(records)
    }

    /// Terminate instances in the scanner's default region. Returns the
    /// provider's state-change response as a JSON value.
    pub async fn terminate_instances(&self, instance_ids: &[String]) -> Result<Value> {
        info!(
            instance_ids = ?instance_ids,
            region = %self.default_region,
            api_action = "TerminateInstances",
            "Sending terminate request to AWS EC2 API"
        );

        let client = Client::new(&self.base_config);
        let response = client
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .context("Failed to terminate instances")?;

        let changes: Vec<Value> = response
            .terminating_instances()
            .iter()
            .map(|change| {
                json!({
                    "InstanceId": change.instance_id(),
                    "PreviousState": change
                        .previous_state()
                        .and_then(|s| s.name())
                        .map(|n| n.as_str()),
                    "CurrentState": change
                        .current_state()
                        .and_then(|s| s.name())
                        .map(|n| n.as_str()),
                })
            })
            .collect();

        Ok(json!({ "TerminatingInstances": changes }))
    }

    /// Delete one volume in the given region.
    pub async fn delete_volume(&self, volume_id: &str, region: &str) -> Result<Value> {
        info!(
            volume_id,
            region,
            api_action = "DeleteVolume",
            "Sending delete request to AWS EC2 API"
        );

        self.client_for(region)
            .delete_volume()
            .volume_id(volume_id)
            .send()
            .await
            .with_context(|| format!("Failed to delete volume {volume_id} in {region}"))?;

        Ok(json!({ "VolumeId": volume_id, "Region": region, "State": "deleting" }))
    }

    /// Release one Elastic IP allocation in the given region.
    pub async fn release_address(&self, allocation_id: &str, region: &str) -> Result<Value> {
        info!(
            allocation_id,
            region,
            api_action = "ReleaseAddress",
            "Sending release request to AWS EC2 API"
        );

        self.client_for(region)
            .release_address()
            .allocation_id(allocation_id)
            .send()
            .await
            .with_context(|| format!("Failed to release address {allocation_id} in {region}"))?;

        Ok(json!({ "AllocationId": allocation_id, "Region": region, "State": "released" }))
    }
}

/// Server-side filter restricting DescribeVolumes to volumes not attached
/// to any instance (status `available` or `error`).
pub fn unused_volume_filter() -> Filter {
    let mut filter = Filter::builder().name("status");
    for status in UNUSED_VOLUME_STATUSES {
        filter = filter.values(*status);
    }
    filter.build()
}

/// Flatten reservations into raw records, keeping only running instances.
pub fn collect_running(reservations: &[Reservation]) -> Vec<Value> {
    let mut records = Vec::new();
    for reservation in reservations {
        for instance in reservation.instances() {
            let state = instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str())
                .unwrap_or_default();
            if state == RUNNING_STATE {
                records.push(instance_record(instance));
            }
        }
    }
    records
}

/// Build a raw JSON record mirroring the DescribeInstances response shape.
/// Absent source fields stay absent so flattening can omit their keys.
pub fn instance_record(instance: &Instance) -> Value {
    let mut record = Map::new();

    if let Some(id) = instance.instance_id() {
        record.insert("InstanceId".to_string(), json!(id));
    }
    if let Some(instance_type) = instance.instance_type() {
        record.insert("InstanceType".to_string(), json!(instance_type.as_str()));
    }
    if let Some(state) = instance.state().and_then(|s| s.name()) {
        record.insert("State".to_string(), json!({ "Name": state.as_str() }));
    }
    if let Some(zone) = instance.placement().and_then(|p| p.availability_zone()) {
        record.insert("Placement".to_string(), json!({ "AvailabilityZone": zone }));
    }
    if let Some(launched) = instance.launch_time() {
        record.insert("LaunchTime".to_string(), json!(format_datetime(launched)));
    }
    if let Some(arn) = instance.iam_instance_profile().and_then(|p| p.arn()) {
        record.insert("IamInstanceProfile".to_string(), json!({ "Arn": arn }));
    }
    if !instance.tags().is_empty() {
        record.insert("Tags".to_string(), tags_object(instance.tags()));
    }

    Value::Object(record)
}

pub fn address_record(address: &Address) -> Value {
    let mut record = Map::new();

    if let Some(ip) = address.public_ip() {
        record.insert("PublicIp".to_string(), json!(ip));
    }
    if let Some(id) = address.allocation_id() {
        record.insert("AllocationId".to_string(), json!(id));
    }
    if let Some(group) = address.network_border_group() {
        record.insert("NetworkBorderGroup".to_string(), json!(group));
    }
    if let Some(id) = address.instance_id() {
        record.insert("InstanceId".to_string(), json!(id));
    }
    if !address.tags().is_empty() {
        record.insert("Tags".to_string(), tags_object(address.tags()));
    }

    Value::Object(record)
}

pub fn volume_record(volume: &Volume) -> Value {
    let mut record = Map::new();

    if let Some(id) = volume.volume_id() {
        record.insert("VolumeId".to_string(), json!(id));
    }
    if let Some(size) = volume.size() {
        record.insert("Size".to_string(), json!(size));
    }
    if let Some(state) = volume.state() {
        record.insert("State".to_string(), json!(state.as_str()));
    }
    if let Some(volume_type) = volume.volume_type() {
        record.insert("VolumeType".to_string(), json!(volume_type.as_str()));
    }
    if let Some(zone) = volume.availability_zone() {
        record.insert("AvailabilityZone".to_string(), json!(zone));
    }
    if let Some(created) = volume.create_time() {
        record.insert("CreateTime".to_string(), json!(format_datetime(created)));
    }
    if let Some(encrypted) = volume.encrypted() {
        record.insert("Encrypted".to_string(), json!(encrypted));
    }
    if let Some(iops) = volume.iops() {
        record.insert("Iops".to_string(), json!(iops));
    }
    if let Some(snapshot) = volume.snapshot_id() {
        if !snapshot.is_empty() {
            record.insert("SnapshotId".to_string(), json!(snapshot));
        }
    }
    if !volume.tags().is_empty() {
        record.insert("Tags".to_string(), tags_object(volume.tags()));
    }

    Value::Object(record)
}

/// Tag lists become objects keyed by tag key so dotted selection
/// (`Tags.owner`) works the same as any other nested field.
fn tags_object(tags: &[Tag]) -> Value {
    let mut map = Map::new();
    for tag in tags {
        if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}

fn format_datetime(datetime: &aws_smithy_types::DateTime) -> String {
    chrono::DateTime::from_timestamp(datetime.secs(), datetime.subsec_nanos())
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| datetime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{
        InstanceState, InstanceStateName, InstanceType, Placement, VolumeState, VolumeType,
    };

    fn tag(key: &str, value: &str) -> Tag {
        Tag::builder().key(key).value(value).build()
    }

    fn running_instance(id: &str) -> Instance {
        Instance::builder()
            .instance_id(id)
            .instance_type(InstanceType::T3Micro)
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .placement(Placement::builder().availability_zone("us-east-1a").build())
            .tags(tag("Name", "web-1"))
            .tags(tag("owner", "alice"))
            .build()
    }

    #[test]
    fn collect_running_keeps_only_running_instances() {
        let stopped = Instance::builder()
            .instance_id("i-stopped")
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Stopped)
                    .build(),
            )
            .build();
        let no_state = Instance::builder().instance_id("i-unknown").build();

        let reservations = vec![
            Reservation::builder()
                .instances(running_instance("i-running"))
                .instances(stopped)
                .build(),
            Reservation::builder().instances(no_state).build(),
        ];

        let records = collect_running(&reservations);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["InstanceId"], "i-running");
    }

    #[test]
    fn instance_record_mirrors_response_shape() {
        let record = instance_record(&running_instance("i-0abc"));

        assert_eq!(record["InstanceId"], "i-0abc");
        assert_eq!(record["InstanceType"], "t3.micro");
        assert_eq!(record["State"]["Name"], "running");
        assert_eq!(record["Placement"]["AvailabilityZone"], "us-east-1a");
        assert_eq!(record["Tags"]["Name"], "web-1");
        assert_eq!(record["Tags"]["owner"], "alice");
    }

    #[test]
    fn instance_record_omits_absent_fields() {
        let record = instance_record(&Instance::builder().instance_id("i-bare").build());

        let object = record.as_object().unwrap();
        assert!(!object.contains_key("IamInstanceProfile"));
        assert!(!object.contains_key("Tags"));
        assert!(!object.contains_key("LaunchTime"));
        assert!(!object.contains_key("Placement"));
    }

    #[test]
    fn address_record_keeps_network_border_group() {
        let address = Address::builder()
            .public_ip("3.95.0.1")
            .allocation_id("eipalloc-123")
            .network_border_group("us-east-1")
            .tags(tag("guid", "g-1"))
            .build();

        let record = address_record(&address);

        assert_eq!(record["PublicIp"], "3.95.0.1");
        assert_eq!(record["NetworkBorderGroup"], "us-east-1");
        assert_eq!(record["Tags"]["guid"], "g-1");
        assert!(record.get("InstanceId").is_none());
    }

    #[test]
    fn unused_volume_filter_selects_available_and_error_statuses() {
        let filter = unused_volume_filter();

        assert_eq!(filter.name(), Some("status"));
        assert_eq!(filter.values(), ["available", "error"]);
    }

    #[test]
    fn volume_record_carries_provider_attributes() {
        let volume = Volume::builder()
            .volume_id("vol-0abc")
            .size(100)
            .state(VolumeState::Available)
            .volume_type(VolumeType::Gp3)
            .availability_zone("us-west-2b")
            .encrypted(true)
            .build();

        let record = volume_record(&volume);

        assert_eq!(record["VolumeId"], "vol-0abc");
        assert_eq!(record["Size"], 100);
        assert_eq!(record["State"], "available");
        assert_eq!(record["VolumeType"], "gp3");
        assert_eq!(record["Encrypted"], true);
    }

    #[test]
    fn tags_object_skips_incomplete_tags() {
        let tags = vec![
            tag("owner", "alice"),
            Tag::builder().key("orphan-key").build(),
            Tag::builder().value("orphan-value").build(),
        ];

        let object = tags_object(&tags);

        assert_eq!(object.as_object().unwrap().len(), 1);
        assert_eq!(object["owner"], "alice");
    }

    #[test]
    fn format_datetime_renders_rfc3339() {
        let datetime = aws_smithy_types::DateTime::from_secs(1_700_000_000);
        assert_eq!(format_datetime(&datetime), "2023-11-14T22:13:20Z");
    }
}
