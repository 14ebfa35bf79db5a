//! Settings-gated datum publishing

use std::sync::Arc;

use tracing::warn;

use crate::application::ports::{DatumStore, StreamPublisher};
use crate::domain::{Datum, DomainResult, PublishSettings};

/// Publishes derived datums to the primary store and the streaming
/// publisher, each gated independently by the resolved settings.
pub struct DatumPublisher {
    store: Arc<dyn DatumStore>,
    stream: Option<Arc<dyn StreamPublisher>>,
}

impl DatumPublisher {
    pub fn new(store: Arc<dyn DatumStore>) -> Self {
        Self {
            store,
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: Arc<dyn StreamPublisher>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Publish one datum according to the settings pair. Both sinks are
    /// attempted independently; the first failure is returned after both
    /// had their chance.
    pub async fn publish(&self, datum: Datum, settings: &PublishSettings) -> DomainResult<()> {
        let mut first_error = None;

        if settings.publish_to_store {
            if let Err(e) = self.store.store(datum.clone()).await {
                warn!(source_id = datum.source_id.as_str(), error = %e, "Datum store failed");
                first_error = Some(e);
            }
        }
        if settings.publish_to_stream {
            if let Some(stream) = &self.stream {
                if let Err(e) = stream.publish(datum.clone()).await {
                    warn!(source_id = datum.source_id.as_str(), error = %e, "Datum stream publish failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        datums: Mutex<Vec<Datum>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.datums.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DatumStore for RecordingSink {
        async fn store(&self, datum: Datum) -> DomainResult<()> {
            self.datums.lock().unwrap().push(datum);
            Ok(())
        }
    }

    #[async_trait]
    impl StreamPublisher for RecordingSink {
        async fn publish(&self, datum: Datum) -> DomainResult<()> {
            self.datums.lock().unwrap().push(datum);
            Ok(())
        }
    }

    fn sample_datum() -> Datum {
        Datum::new(Utc::now(), "/ocpp/cp/CP001/1", 100)
    }

    #[tokio::test]
    async fn settings_gate_each_sink() {
        let store = Arc::new(RecordingSink::default());
        let stream = Arc::new(RecordingSink::default());
        let publisher = DatumPublisher::new(store.clone()).with_stream(stream.clone());

        let store_only = PublishSettings::default();
        publisher.publish(sample_datum(), &store_only).await.unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(stream.count(), 0);

        let both = PublishSettings {
            publish_to_stream: true,
            ..PublishSettings::default()
        };
        publisher.publish(sample_datum(), &both).await.unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(stream.count(), 1);

        let neither = PublishSettings {
            publish_to_store: false,
            publish_to_stream: false,
            source_id_template: None,
        };
        publisher.publish(sample_datum(), &neither).await.unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(stream.count(), 1);
    }
}
