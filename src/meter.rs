//! Meter names and what they say about the resource reporting them.

const INSTANCE_PREFIX: &str = "instance:";

/// The kind of resource a meter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind<'a> {
    Instance { flavor: &'a str },
    Volume,
    Image,
    Network,
    Subnet,
    Port,
}

impl ResourceKind<'_> {
    /// Value of the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Instance { .. } => "instance",
            ResourceKind::Volume => "volume",
            ResourceKind::Image => "image",
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Port => "port",
        }
    }
}

/// Classify a meter name. Meters that don't identify a resource kind give `None`.
///
/// Both the dotted (`volume.size`) and underscored (`volume_size`) size meters are accepted,
/// since different service versions report one or the other.
pub fn classify(meter: &str) -> Option<ResourceKind<'_>> {
    if let Some(flavor) = meter.strip_prefix(INSTANCE_PREFIX) {
        return Some(ResourceKind::Instance { flavor });
    }
    match meter {
        "volume.size" | "volume_size" => Some(ResourceKind::Volume),
        "image.size" | "image_size" => Some(ResourceKind::Image),
        "network" => Some(ResourceKind::Network),
        "subnet" => Some(ResourceKind::Subnet),
        "port" => Some(ResourceKind::Port),
        _ => None,
    }
}

/// Traffic categories reported by the bandwidth meters.
pub const BANDWIDTH_CATEGORIES: [&str; 2] = ["internal", "external"];
/// Traffic directions.
pub const BANDWIDTH_TYPES: [&str; 2] = ["in", "out"];
/// Units, in the order the bandwidth report checks them.
pub const BANDWIDTH_VALUE_TYPES: [&str; 2] = ["packets", "bytes"];

/// Name of the bandwidth meter for a category, direction and unit.
pub fn bandwidth_meter(category: &str, direction: &str, value_type: &str) -> String {
    format!("akanda.bandwidth:{}.{}.{}", category, direction, value_type)
}
