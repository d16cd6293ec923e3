use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::PricingError;

/// Upstream source of on-demand EC2 rates. The local pricing table is a
/// distilled cache of this index (region -> instance type -> hourly USD);
/// fetching and reducing the full index is out of scope here, so the URL is
/// only surfaced to operators when the local table is missing.
pub const EC2_PRICING_API_URL: &str =
    "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws/AmazonEC2/current/index.json";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Billing estimate for one instance since its launch time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillEstimate {
    pub hourly: f64,
    pub per_day: f64,
    pub total: f64,
}

/// On-demand hourly rates keyed by region code, then instance type.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    rates: HashMap<String, HashMap<String, f64>>,
}

impl PricingTable {
    pub fn load(path: &Path) -> Result<Self, PricingError> {
        let content = fs::read_to_string(path).map_err(|source| PricingError::TableUnavailable {
            path: path.display().to_string(),
            source,
        })?;

        let table: Self =
            serde_json::from_str(&content).map_err(|source| PricingError::TableMalformed {
                path: path.display().to_string(),
                source,
            })?;

        info!(
            path = %path.display(),
            regions = table.rates.len(),
            "Pricing table loaded"
        );

        Ok(table)
    }

    pub fn from_rates(rates: HashMap<String, HashMap<String, f64>>) -> Self {
        Self { rates }
    }

    pub fn hourly_rate(&self, instance_type: &str, region: &str) -> Result<f64, PricingError> {
        let region_rates = self
            .rates
            .get(region)
            .ok_or_else(|| PricingError::UnknownRegion {
                region: region.to_string(),
            })?;

        region_rates
            .get(instance_type)
            .copied()
            .ok_or_else(|| PricingError::UnknownInstanceType {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
            })
    }

    /// Estimate the running cost of an instance: hourly rate, per-day rate,
    /// and total accrued between `launch_time` and `now`. A launch time in
    /// the future (clock skew) counts as zero elapsed time.
    pub fn estimate(
        &self,
        instance_type: &str,
        region: &str,
        launch_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<BillEstimate, PricingError> {
        let hourly = self.hourly_rate(instance_type, region)?;
        let per_day = hourly * 24.0;

        let elapsed_seconds = now.signed_duration_since(launch_time).num_seconds().max(0);
        let days = elapsed_seconds as f64 / SECONDS_PER_DAY;
        let total = per_day * days;

        debug!(
            instance_type,
            region,
            hourly,
            days_running = days,
            "Computed billing estimate"
        );

        Ok(BillEstimate {
            hourly,
            per_day,
            total,
        })
    }
}
