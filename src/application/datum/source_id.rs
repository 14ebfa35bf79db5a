//! Source id template expansion

use crate::domain::{ChargePoint, Location};

/// Recognized template placeholders.
const TOKEN_DEVICE_IDENTIFIER: &str = "{deviceIdentifier}";
const TOKEN_DEVICE_ID: &str = "{deviceId}";
const TOKEN_CONNECTOR_ID: &str = "{connectorId}";
const TOKEN_LOCATION: &str = "{location}";

/// Build a datum source id by expanding the template placeholders and
/// pruning empty path segments. An optional fixed suffix is appended to
/// the template before expansion.
pub fn resolve_source_id(
    template: &str,
    suffix: Option<&str>,
    charge_point: &ChargePoint,
    connector_id: i32,
    location: Option<Location>,
) -> String {
    let mut template = template.to_string();
    if let Some(suffix) = suffix {
        template.push_str(suffix);
    }
    let expanded = template
        .replace(TOKEN_DEVICE_IDENTIFIER, &charge_point.identity.identifier)
        .replace(TOKEN_DEVICE_ID, &charge_point.id.to_string())
        .replace(TOKEN_CONNECTOR_ID, &connector_id.to_string())
        .replace(
            TOKEN_LOCATION,
            location.map(|l| l.as_str()).unwrap_or_default(),
        );
    prune_empty_segments(&expanded)
}

fn prune_empty_segments(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

// ── Tests ──────────────────────────────────────────────────────
