//! Charging session service
//!
//! Owns the session state machine (absent, active, ended), ingests meter
//! readings idempotently, derives datums from them, and runs the retention
//! purge and debounced reconfiguration background tasks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::datum::{
    measurand_property, normalized_value, property_name, resolve_source_id, DatumPublisher,
};
use crate::application::identity::SharedIdentityService;
use crate::application::ports::AuthorizationService;
use crate::config::ServiceConfig;
use crate::domain::{
    AuthorizationStatus, ChargePoint, ChargePointIdentity, ChargeSession, ChargeSessionRepository,
    Datum, DatumClassification, DomainError, DomainResult, Measurand, PublishSettings, Reading,
    ReadingContext, SessionEndReason, UnitOfMeasure,
};

/// Parameters of a session start request
#[derive(Debug, Clone)]
pub struct StartSessionInfo {
    pub identity: ChargePointIdentity,
    pub auth_token: String,
    pub connector_id: i32,
    /// Meter register at start, in Wh
    pub meter_start: i32,
    pub timestamp: DateTime<Utc>,
}

/// Parameters of a session end request
#[derive(Debug, Clone)]
pub struct EndSessionInfo {
    pub identity: ChargePointIdentity,
    pub transaction_id: i32,
    pub auth_token: String,
    /// Meter register at end, in Wh
    pub meter_end: i32,
    pub timestamp: DateTime<Utc>,
    pub reason: SessionEndReason,
    /// Readings sampled during the transaction, delivered with the end
    pub transaction_data: Vec<Reading>,
}

#[derive(Default)]
struct BackgroundTasks {
    purge: Option<JoinHandle<()>>,
    reconfigure: Option<JoinHandle<()>>,
}

pub struct ChargingSessionService {
    identity: SharedIdentityService,
    auth: Arc<dyn AuthorizationService>,
    sessions: Arc<dyn ChargeSessionRepository>,
    publisher: Arc<DatumPublisher>,
    config: Arc<RwLock<ServiceConfig>>,
    tasks: Arc<Mutex<BackgroundTasks>>,
}

impl ChargingSessionService {
    pub fn new(
        identity: SharedIdentityService,
        auth: Arc<dyn AuthorizationService>,
        sessions: Arc<dyn ChargeSessionRepository>,
        publisher: Arc<DatumPublisher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            identity,
            auth,
            sessions,
            publisher,
            config: Arc::new(RwLock::new(config)),
            tasks: Arc::new(Mutex::new(BackgroundTasks::default())),
        }
    }

    pub async fn current_config(&self) -> ServiceConfig {
        self.config.read().await.clone()
    }

    // ── Session state machine ───────────────────────────────────

    /// Start a charge session on a connector.
    ///
    /// The connector must be free: at most one active session exists per
    /// connector, enforced atomically by the session store. The persisted
    /// session is re-read to observe the store-assigned transaction id.
    pub async fn start_session(&self, info: StartSessionInfo) -> DomainResult<ChargeSession> {
        let auth = self.auth.authorize(&info.identity, &info.auth_token).await?;
        if !auth.status.is_accepted() {
            return Err(DomainError::Authorization(auth.status));
        }

        let charge_point = match self.identity.resolve_charge_point(&info.identity).await {
            Ok(cp) if cp.enabled => cp,
            _ => return Err(DomainError::Authorization(AuthorizationStatus::Invalid)),
        };

        if self
            .sessions
            .find_active(charge_point.id, info.connector_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Authorization(AuthorizationStatus::ConcurrentTx));
        }

        let session = ChargeSession::new(
            charge_point.id,
            info.connector_id,
            info.auth_token.clone(),
            info.timestamp,
        );
        let session_id = session.id;
        if let Err(e) = self.sessions.save(session).await {
            return Err(match e {
                DomainError::SessionConflict { .. } => {
                    DomainError::Authorization(AuthorizationStatus::ConcurrentTx)
                }
                DomainError::IntegrityViolation(_) => {
                    DomainError::Authorization(AuthorizationStatus::Invalid)
                }
                other => other,
            });
        }
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| {
                DomainError::Storage(format!("charge session {} vanished after save", session_id))
            })?;

        info!(
            charge_point = %charge_point.identity,
            connector_id = info.connector_id,
            session_id = %session.id,
            transaction_id = session.transaction_id,
            "Charge session started"
        );

        let reading = Reading::new(
            Measurand::EnergyActiveImportRegister,
            Decimal::from(info.meter_start),
            info.timestamp,
        )
        .with_context(ReadingContext::TransactionBegin)
        .with_unit(UnitOfMeasure::Wh)
        .for_session(session.id);

        let settings = self.identity.resolve_settings(&charge_point).await?;
        self.ingest(&charge_point, &settings, vec![reading]).await?;

        Ok(session)
    }

    /// End an active charge session. Ending is terminal: the record is
    /// updated once and a second end attempt fails.
    pub async fn end_session(&self, info: EndSessionInfo) -> DomainResult<ChargeSession> {
        let Ok(charge_point) = self.identity.resolve_charge_point(&info.identity).await else {
            return Err(DomainError::Authorization(AuthorizationStatus::Invalid));
        };

        let Some(mut session) = self
            .sessions
            .find_by_transaction(charge_point.id, info.transaction_id)
            .await?
        else {
            return Err(DomainError::Authorization(AuthorizationStatus::Invalid));
        };
        if !session.is_active() {
            return Err(DomainError::Authorization(AuthorizationStatus::Invalid));
        }

        session.end(info.auth_token.clone(), info.reason, info.timestamp);
        self.sessions.update(session.clone()).await?;

        info!(
            charge_point = %charge_point.identity,
            session_id = %session.id,
            transaction_id = session.transaction_id,
            reason = %info.reason,
            "Charge session ended"
        );

        let mut readings = info.transaction_data;
        for reading in &mut readings {
            if reading.session_id.is_none() {
                reading.session_id = Some(session.id);
            }
        }
        readings.push(
            Reading::new(
                Measurand::EnergyActiveImportRegister,
                Decimal::from(info.meter_end),
                info.timestamp,
            )
            .with_context(ReadingContext::TransactionEnd)
            .with_unit(UnitOfMeasure::Wh)
            .for_session(session.id),
        );

        let settings = self.identity.resolve_settings(&charge_point).await?;
        self.ingest(&charge_point, &settings, readings).await?;

        Ok(session)
    }

    /// Ingest meter readings outside a session end, including session-less
    /// meter values. Returns how many readings were newly stored.
    pub async fn add_readings(
        &self,
        identity: &ChargePointIdentity,
        readings: Vec<Reading>,
    ) -> DomainResult<usize> {
        if readings.is_empty() {
            return Ok(0);
        }
        let charge_point = self.identity.resolve_charge_point(identity).await?;
        let settings = self.identity.resolve_settings(&charge_point).await?;
        self.ingest(&charge_point, &settings, readings).await
    }

    // ── Shared reading ingestion ────────────────────────────────

    /// Sort, dedupe, persist and derive datums from a reading batch.
    ///
    /// Deduplication is content-based against the readings already stored
    /// for each session, which keeps ingestion correct under duplicate
    /// delivery without locking. Surviving readings are walked in order,
    /// merging into one open datum per resolved source id and flushing
    /// whenever the timestamp moves on.
    async fn ingest(
        &self,
        charge_point: &ChargePoint,
        settings: &PublishSettings,
        mut readings: Vec<Reading>,
    ) -> DomainResult<usize> {
        readings.sort();

        let mut stored: HashMap<Option<Uuid>, Vec<Reading>> = HashMap::new();
        for reading in &readings {
            if !stored.contains_key(&reading.session_id) {
                let existing = self.sessions.find_readings(reading.session_id).await?;
                stored.insert(reading.session_id, existing);
            }
        }

        let mut fresh: Vec<Reading> = Vec::with_capacity(readings.len());
        for reading in readings {
            let Some(seen) = stored.get_mut(&reading.session_id) else {
                continue;
            };
            if seen.contains(&reading) {
                continue;
            }
            seen.push(reading.clone());
            fresh.push(reading);
        }
        if fresh.is_empty() {
            return Ok(0);
        }
        self.sessions.save_readings(fresh.clone()).await?;

        let (max_decimal_scale, source_id_suffix) = {
            let config = self.config.read().await;
            (config.max_decimal_scale, config.source_id_suffix.clone())
        };

        let mut sessions: HashMap<Uuid, Option<ChargeSession>> = HashMap::new();
        let mut open: HashMap<String, Datum> = HashMap::new();

        for reading in &fresh {
            let session = match reading.session_id {
                Some(id) => {
                    if !sessions.contains_key(&id) {
                        let loaded = self.sessions.find_by_id(id).await?;
                        sessions.insert(id, loaded);
                    }
                    sessions.get(&id).and_then(|s| s.as_ref())
                }
                None => None,
            };

            let Some((classification, _)) = measurand_property(reading.measurand) else {
                debug!(measurand = ?reading.measurand, "No datum property for measurand");
                continue;
            };
            let Some(property) = property_name(reading.measurand, reading.phase) else {
                continue;
            };
            let value = normalized_value(reading.unit, reading.value, max_decimal_scale);

            let connector_id = session.map(|s| s.connector_id).unwrap_or(0);
            let source_id = resolve_source_id(
                settings.template(),
                source_id_suffix.as_deref(),
                charge_point,
                connector_id,
                reading.location,
            );

            match open.get_mut(&source_id) {
                Some(datum) => {
                    if datum.timestamp != reading.timestamp {
                        let next =
                            session_datum(charge_point, &source_id, reading.timestamp, session);
                        let finished = std::mem::replace(datum, next);
                        self.publisher.publish(finished, settings).await?;
                    }
                    datum.put(classification, property, value);
                }
                None => {
                    let mut datum =
                        session_datum(charge_point, &source_id, reading.timestamp, session);
                    datum.put(classification, property, value);
                    open.insert(source_id, datum);
                }
            }
        }

        let mut remaining: Vec<Datum> = open.into_values().collect();
        remaining.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        for datum in remaining {
            self.publisher.publish(datum, settings).await?;
        }

        Ok(fresh.len())
    }

    // ── Background tasks ────────────────────────────────────────

    /// Start the retention purge loop. Idempotent.
    pub async fn startup(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.purge.is_none() {
            tasks.purge = Some(spawn_purge_loop(self.config.clone(), self.sessions.clone()));
            info!("Charging session service started");
        }
    }

    /// Stop all background tasks. Idempotent; the service can be started
    /// again afterwards.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if let Some(handle) = tasks.purge.take() {
            handle.abort();
        }
        if let Some(handle) = tasks.reconfigure.take() {
            handle.abort();
        }
        info!("Charging session service stopped");
    }

    /// Schedule a configuration swap after the debounce delay. Bursts of
    /// change notifications coalesce into one apply.
    pub async fn configuration_changed(&self, config: ServiceConfig) {
        let mut tasks = self.tasks.lock().await;
        if let Some(pending) = tasks.reconfigure.take() {
            pending.abort();
        }
        let shared_config = self.config.clone();
        let sessions = self.sessions.clone();
        let shared_tasks = self.tasks.clone();
        let delay = config.reconfigure_delay;
        tasks.reconfigure = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut current = shared_config.write().await;
                *current = config;
            }
            let mut tasks = shared_tasks.lock().await;
            // Drop our own handle and bounce the purge loop onto the new config.
            tasks.reconfigure = None;
            if let Some(handle) = tasks.purge.take() {
                handle.abort();
                tasks.purge = Some(spawn_purge_loop(shared_config.clone(), sessions));
            }
            info!("Applied updated service configuration");
        }));
    }
}

fn spawn_purge_loop(
    config: Arc<RwLock<ServiceConfig>>,
    sessions: Arc<dyn ChargeSessionRepository>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let (horizon, interval) = {
                let config = config.read().await;
                (config.purge_posted_after, config.purge_interval())
            };
            tokio::time::sleep(interval).await;
            let cutoff = Utc::now()
                - chrono::Duration::from_std(horizon).unwrap_or_else(|_| chrono::Duration::zero());
            match sessions.delete_posted_before(cutoff).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged posted charge sessions"),
                Err(e) => warn!(error = %e, "Charge session purge failed"),
            }
        }
    })
}

/// A datum shell for one source id and timestamp, tagged with the owning
/// session's properties when the readings belong to a session.
fn session_datum(
    charge_point: &ChargePoint,
    source_id: &str,
    timestamp: DateTime<Utc>,
    session: Option<&ChargeSession>,
) -> Datum {
    let mut datum = Datum::new(timestamp, source_id, charge_point.node_id);
    if let Some(session) = session {
        datum.put_status("sessionId", session.id.to_string());
        datum.put_status("authToken", session.auth_token.clone());
        datum.put_status("transactionId", session.transaction_id.to_string());
        if let Some(reason) = session.end_reason {
            datum.put_status("endReason", reason.to_string());
        }
        if let Some(duration) = session.duration_seconds() {
            datum.put(
                DatumClassification::Instantaneous,
                "duration",
                Decimal::from(duration),
            );
        }
    }
    datum
}

// ── Tests ──────────────────────────────────────────────────────
