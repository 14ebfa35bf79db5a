//! Service configuration

use std::time::Duration;

/// Tuning knobs for the central system core services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// How long ended sessions are retained after posting
    pub purge_posted_after: Duration,
    /// Debounce delay applied to configuration change bursts
    pub reconfigure_delay: Duration,
    /// Maximum decimal places kept after unit conversion; negative keeps
    /// converted values unrounded
    pub max_decimal_scale: i32,
    /// Fixed suffix appended to the resolved source id template
    pub source_id_suffix: Option<String>,
    /// Maximum concurrent outbound action dispatches
    pub dispatch_concurrency: usize,
}

impl ServiceConfig {
    /// How often the retention purge runs: a quarter of the horizon,
    /// never below one second.
    pub fn purge_interval(&self) -> Duration {
        (self.purge_posted_after / 4).max(Duration::from_secs(1))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            purge_posted_after: Duration::from_secs(2 * 60 * 60),
            reconfigure_delay: Duration::from_secs(1),
            max_decimal_scale: 3,
            source_id_suffix: None,
            dispatch_concurrency: 8,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
