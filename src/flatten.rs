use serde_json::Value;
use std::collections::BTreeMap;

/// A single flattened reporting row. Values keep their JSON type so table
/// and JSON output can render them without re-parsing.
pub type Row = BTreeMap<String, Value>;

/// Select dotted-path keys out of a nested record, producing a flat row.
///
/// The output key is the last path segment (`Placement.AvailabilityZone`
/// becomes `AvailabilityZone`). Paths that do not resolve are omitted from
/// the row rather than inserted as null.
pub fn flatten_select(record: &Value, keys: &[&str]) -> Row {
    let mut row = Row::new();
    for key in keys {
        if let Some(value) = lookup_path(record, key) {
            let name = key.rsplit('.').next().unwrap_or(key);
            row.insert(name.to_string(), value.clone());
        }
    }
    row
}

/// Flatten a batch of raw records with the same key list.
pub fn reformat_data(records: &[Value], keys: &[&str]) -> Vec<Row> {
    records
        .iter()
        .map(|record| flatten_select(record, keys))
        .collect()
}

fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}
