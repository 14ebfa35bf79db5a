//! Datum publish settings

/// Source id template applied when neither the charge point nor its owner
/// configured one.
pub const DEFAULT_SOURCE_ID_TEMPLATE: &str = "/ocpp/cp/{deviceIdentifier}/{connectorId}/{location}";

/// Where datums derived for a charge point are published.
///
/// Resolved per charge point, falling back to owner-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    /// Persist datums to the primary time-series store
    pub publish_to_store: bool,
    /// Forward datums to the streaming publisher
    pub publish_to_stream: bool,
    /// Source id template, `None` for the system default
    pub source_id_template: Option<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            publish_to_store: true,
            publish_to_stream: false,
            source_id_template: None,
        }
    }
}

impl PublishSettings {
    /// The effective source id template.
    pub fn template(&self) -> &str {
        self.source_id_template
            .as_deref()
            .unwrap_or(DEFAULT_SOURCE_ID_TEMPLATE)
    }
}
