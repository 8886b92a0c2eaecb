//! Walk every project and its resources and flatten what the metering API reports into rows.

use crate::{
    client::{Client, TimeRange},
    error::Error,
    meter::{self, ResourceKind},
    sink::{Row, RowSink},
};
use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use json::JsonValue;
use log::{debug, info};

/// Columns of the instance report.
pub const INSTANCE_FIELDS: &[&str] =
    &["project_id", "resource_id", "instance_flavor", "first_seen", "last_seen", "duration"];

/// Columns of the resource report.
pub const RESOURCE_FIELDS: &[&str] = &[
    "project_id",
    "resource_id",
    "name",
    "display_name",
    "type",
    "instance_flavor",
    "network_id",
    "cidr",
    "mac",
    "ips",
    "first_seen",
    "last_seen",
    "duration",
    "size",
];

/// Columns of the bandwidth report.
pub const BANDWIDTH_FIELDS: &[&str] = &["project_id", "date", "category", "type", "packets", "bytes"];

/// A resource record as listed under a project.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: String,
    pub metadata: JsonValue,
    pub meters: Vec<String>,
}

impl Resource {
    /// `None` if the record has no `resource_id`.
    pub fn from_json(resource: &JsonValue) -> Option<Self> {
        let id = resource["resource_id"].as_str()?.to_owned();
        let meters = resource["meter"]
            .members()
            .filter_map(|meter| meter["counter_name"].as_str())
            .map(String::from)
            .collect();
        Some(Self {
            id,
            metadata: resource["metadata"].clone(),
            meters,
        })
    }
}

/// Project ids worth visiting. The server sometimes lists null ids.
async fn project_ids(client: &Client) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for project_id in client.get_projects().await? {
        match project_id {
            Some(id) if !id.is_empty() => ids.push(id),
            _ => debug!("skipping project with no id"),
        }
    }
    Ok(ids)
}

async fn resources(client: &Client, project_id: &str) -> Result<Vec<Resource>> {
    let listing = client.get_resources(project_id, &TimeRange::all()).await?;
    let mut resources = Vec::with_capacity(listing.len());
    for record in &listing {
        match Resource::from_json(record) {
            Some(resource) => resources.push(resource),
            None => {
                let url = client.endpoint(&["projects", project_id, "resources"])?;
                return Err(Error::malformed(&url, format!("resource without a resource_id: {}", record.dump())).into());
            }
        }
    }
    Ok(resources)
}

/// Put `value` in the row unless it is null.
fn set(row: &mut Row, column: &'static str, value: &JsonValue) {
    if !value.is_null() {
        row.insert(column, value.to_string());
    }
}

fn set_duration(row: &mut Row, duration_info: &JsonValue) {
    set(row, "first_seen", &duration_info["start_timestamp"]);
    set(row, "last_seen", &duration_info["end_timestamp"]);
    set(row, "duration", &duration_info["duration"]);
}

/// Write one row per instance flavor meter, with how long the instance ran with it.
pub async fn dump_instances(client: &Client, sink: &mut impl RowSink) -> Result<usize> {
    let mut rows = 0;
    for project_id in project_ids(client).await? {
        info!("Dumping instances for project {}", project_id);
        for resource in resources(client, &project_id).await? {
            for meter_name in &resource.meters {
                let flavor = match meter::classify(meter_name) {
                    Some(ResourceKind::Instance { flavor }) => flavor,
                    _ => continue,
                };
                let duration_info =
                    client.get_resource_duration_info(&resource.id, meter_name, &TimeRange::all(), 0).await?;
                let mut row = Row::new();
                row.insert("project_id", project_id.clone());
                row.insert("resource_id", resource.id.clone());
                row.insert("instance_flavor", flavor.to_owned());
                set_duration(&mut row, &duration_info);
                sink.write_row(&row)?;
                rows += 1;
            }
        }
    }
    info!("Wrote {} instance rows", rows);
    Ok(rows)
}

/// Write one row per classified meter of every resource.
pub async fn dump_resources(client: &Client, sink: &mut impl RowSink) -> Result<usize> {
    let mut rows = 0;
    for project_id in project_ids(client).await? {
        info!("Dumping resources for project {}", project_id);
        for resource in resources(client, &project_id).await? {
            for meter_name in &resource.meters {
                if let Some(row) = resource_row(client, &project_id, &resource, meter_name).await? {
                    sink.write_row(&row)?;
                    rows += 1;
                }
            }
        }
    }
    info!("Wrote {} resource rows", rows);
    Ok(rows)
}

/// Build the report row for one meter of a resource, or `None` if the meter doesn't say what
/// kind of resource this is.
async fn resource_row(
    client: &Client,
    project_id: &str,
    resource: &Resource,
    meter_name: &str,
) -> Result<Option<Row>> {
    let kind = match meter::classify(meter_name) {
        Some(kind) => kind,
        None => return Ok(None),
    };
    let metadata = &resource.metadata;
    let mut row = Row::new();
    row.insert("project_id", project_id.to_owned());
    row.insert("resource_id", resource.id.clone());
    set(&mut row, "name", &metadata["name"]);
    set(&mut row, "display_name", &metadata["display_name"]);
    row.insert("type", kind.as_str().to_owned());
    set(&mut row, "size", &metadata["size"]);

    match kind {
        ResourceKind::Instance { flavor } => {
            row.insert("instance_flavor", flavor.to_owned());
        }
        ResourceKind::Volume => {
            // The recorded maximum wins over whatever size the metadata claims
            row.remove("size");
            if let Some(size) = client.get_resource_volume_max(&resource.id, meter_name, &TimeRange::all(), 0).await? {
                set(&mut row, "size", &size);
            }
        }
        ResourceKind::Image | ResourceKind::Network => {}
        ResourceKind::Subnet => {
            set(&mut row, "network_id", &metadata["network_id"]);
            set(&mut row, "cidr", &metadata["cidr"]);
        }
        ResourceKind::Port => {
            set(&mut row, "network_id", &metadata["network_id"]);
            set(&mut row, "mac", &metadata["mac_address"]);
            let ips: Vec<&str> =
                metadata["fixed_ips"].members().filter_map(|fixed_ip| fixed_ip["ip_address"].as_str()).collect();
            row.insert("ips", ips.join(","));
        }
    }

    let duration_info = client.get_resource_duration_info(&resource.id, meter_name, &TimeRange::all(), 0).await?;
    set_duration(&mut row, &duration_info);
    Ok(Some(row))
}

/// Write daily bandwidth totals for the last `days` days, counting back from local midnight.
pub async fn dump_bandwidth(client: &Client, sink: &mut impl RowSink, days: u32) -> Result<usize> {
    let today = Local::now().date_naive().and_time(NaiveTime::default());
    dump_bandwidth_from(client, sink, days, today).await
}

/// Write daily bandwidth totals for the `days` days before `today`.
///
/// Every (category, direction) pair of every day becomes at most one row, written only if at
/// least one of its unit totals is present.
pub async fn dump_bandwidth_from(
    client: &Client,
    sink: &mut impl RowSink,
    days: u32,
    today: NaiveDateTime,
) -> Result<usize> {
    let mut rows = 0;
    for project_id in project_ids(client).await? {
        info!("Dumping bandwidth for project {}", project_id);
        for day in 0..days {
            let end = today - Duration::days(i64::from(day));
            let start = end - Duration::days(1);
            let range = TimeRange::between(start, end);
            for category in meter::BANDWIDTH_CATEGORIES {
                for direction in meter::BANDWIDTH_TYPES {
                    let mut row = Row::new();
                    row.insert("project_id", project_id.clone());
                    row.insert("date", start.format("%Y-%m-%d %H:%M:%S").to_string());
                    row.insert("category", category.to_owned());
                    row.insert("type", direction.to_owned());
                    let mut has_data = false;
                    for value_type in meter::BANDWIDTH_VALUE_TYPES {
                        let meter_name = meter::bandwidth_meter(category, direction, value_type);
                        if let Some(volume) = client.get_project_volume_sum(&project_id, &meter_name, &range, 0).await? {
                            set(&mut row, value_type, &volume);
                            has_data = true;
                        }
                    }
                    if has_data {
                        sink.write_row(&row)?;
                        rows += 1;
                    }
                }
            }
        }
    }
    info!("Wrote {} bandwidth rows", rows);
    Ok(rows)
}
