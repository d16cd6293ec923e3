use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("pricing table unavailable at {path}: {source}")]
    TableUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pricing table at {path} is not valid JSON: {source}")]
    TableMalformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no pricing entries for region {region}")]
    UnknownRegion { region: String },

    #[error("no pricing entry for instance type {instance_type} in region {region}")]
    UnknownInstanceType {
        instance_type: String,
        region: String,
    },
}
