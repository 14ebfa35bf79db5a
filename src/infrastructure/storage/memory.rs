//! In-memory storage implementation

use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::ports::InstructionStore;
use crate::domain::{
    ChargePoint, ChargePointIdentity, ChargePointRepository, ChargeSession,
    ChargeSessionRepository, Connector, ConnectorRepository, DomainError, DomainResult,
    Instruction, InstructionState, PublishSettings, Reading, SettingsRepository,
};

/// In-memory store for development and testing.
///
/// Honors the same atomicity contracts as a SQL backing store: the
/// active-session-per-connector guard is a single atomic check-then-insert,
/// and connector topology batches apply under one lock.
pub struct InMemoryStore {
    charge_points: DashMap<i64, ChargePoint>,
    connectors: DashMap<(i64, i32), Connector>,
    topology_lock: Mutex<()>,
    sessions: DashMap<Uuid, ChargeSession>,
    /// Connector occupancy index; the uniqueness guard for active sessions
    active_sessions: DashMap<(i64, i32), Uuid>,
    readings: DashMap<Option<Uuid>, Vec<Reading>>,
    charge_point_settings: DashMap<i64, PublishSettings>,
    user_settings: DashMap<i64, PublishSettings>,
    instructions: DashMap<i64, Instruction>,
    charge_point_counter: AtomicI64,
    transaction_counter: AtomicI32,
    instruction_counter: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            charge_points: DashMap::new(),
            connectors: DashMap::new(),
            topology_lock: Mutex::new(()),
            sessions: DashMap::new(),
            active_sessions: DashMap::new(),
            readings: DashMap::new(),
            charge_point_settings: DashMap::new(),
            user_settings: DashMap::new(),
            instructions: DashMap::new(),
            charge_point_counter: AtomicI64::new(1),
            transaction_counter: AtomicI32::new(1),
            instruction_counter: AtomicI64::new(1),
        }
    }

    // ── Provisioning helpers ───────────────────────────────────

    /// Insert a charge point, assigning its id when unset.
    pub fn add_charge_point(&self, mut charge_point: ChargePoint) -> ChargePoint {
        if charge_point.id == 0 {
            charge_point.id = self.charge_point_counter.fetch_add(1, Ordering::SeqCst);
        }
        self.charge_points
            .insert(charge_point.id, charge_point.clone());
        charge_point
    }

    /// Overwrite a charge point row.
    pub fn put_charge_point(&self, charge_point: ChargePoint) {
        self.charge_points.insert(charge_point.id, charge_point);
    }

    /// Insert a session as-is, indexing it when still active.
    pub fn add_session(&self, session: ChargeSession) {
        if session.is_active() {
            self.active_sessions
                .insert((session.charge_point_id, session.connector_id), session.id);
        }
        self.sessions.insert(session.id, session);
    }

    pub fn put_charge_point_settings(&self, charge_point_id: i64, settings: PublishSettings) {
        self.charge_point_settings.insert(charge_point_id, settings);
    }

    pub fn put_user_settings(&self, user_id: i64, settings: PublishSettings) {
        self.user_settings.insert(user_id, settings);
    }

    /// Queue an instruction, assigning its id when unset.
    pub fn add_instruction(&self, mut instruction: Instruction) -> Instruction {
        let id = instruction
            .id
            .unwrap_or_else(|| self.instruction_counter.fetch_add(1, Ordering::SeqCst));
        instruction.id = Some(id);
        self.instructions.insert(id, instruction.clone());
        instruction
    }

    pub fn instruction(&self, id: i64) -> Option<Instruction> {
        self.instructions.get(&id).map(|i| i.clone())
    }

    /// Force an instruction state, as an external actor would.
    pub fn set_instruction_state(&self, id: i64, state: InstructionState) -> bool {
        match self.instructions.get_mut(&id) {
            Some(mut instruction) => {
                instruction.state = state;
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChargePointRepository for InMemoryStore {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<ChargePoint> {
        let exists = self
            .charge_points
            .iter()
            .any(|cp| cp.identity == charge_point.identity);
        if exists {
            return Err(DomainError::Storage(format!(
                "charge point {} already provisioned",
                charge_point.identity
            )));
        }
        Ok(self.add_charge_point(charge_point))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<ChargePoint>> {
        Ok(self.charge_points.get(&id).map(|cp| cp.clone()))
    }

    async fn find_by_identity(
        &self,
        identity: &ChargePointIdentity,
    ) -> DomainResult<Option<ChargePoint>> {
        Ok(self
            .charge_points
            .iter()
            .find(|cp| cp.identity == *identity)
            .map(|cp| cp.clone()))
    }

    async fn find_by_identifier(&self, identifier: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(self
            .charge_points
            .iter()
            .find(|cp| cp.identity.identifier == identifier)
            .map(|cp| cp.clone()))
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        if !self.charge_points.contains_key(&charge_point.id) {
            return Err(DomainError::UnknownChargePoint(
                charge_point.identity.identifier.clone(),
            ));
        }
        self.charge_points.insert(charge_point.id, charge_point);
        Ok(())
    }
}

#[async_trait]
impl ConnectorRepository for InMemoryStore {
    async fn find_for_charge_point(&self, charge_point_id: i64) -> DomainResult<Vec<Connector>> {
        let mut connectors: Vec<Connector> = self
            .connectors
            .iter()
            .filter(|c| c.charge_point_id == charge_point_id)
            .map(|c| c.clone())
            .collect();
        connectors.sort_by_key(|c| c.connector_id);
        Ok(connectors)
    }

    async fn upsert_status(&self, connector: Connector) -> DomainResult<()> {
        self.connectors.insert(
            (connector.charge_point_id, connector.connector_id),
            connector,
        );
        Ok(())
    }

    async fn apply_topology(
        &self,
        charge_point_id: i64,
        create: Vec<Connector>,
        delete: Vec<i32>,
    ) -> DomainResult<()> {
        let _guard = self.topology_lock.lock().await;
        for connector in create {
            self.connectors
                .insert((charge_point_id, connector.connector_id), connector);
        }
        for connector_id in delete {
            self.connectors.remove(&(charge_point_id, connector_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ChargeSessionRepository for InMemoryStore {
    async fn save(&self, mut session: ChargeSession) -> DomainResult<()> {
        if !self.charge_points.contains_key(&session.charge_point_id) {
            return Err(DomainError::IntegrityViolation(format!(
                "charge point {} does not exist",
                session.charge_point_id
            )));
        }
        let key = (session.charge_point_id, session.connector_id);
        // The occupancy entry serialises concurrent saves per connector,
        // making the existence check and the insert one atomic step.
        match self.active_sessions.entry(key) {
            Entry::Occupied(mut slot) => {
                let still_active = self
                    .sessions
                    .get(slot.get())
                    .map(|s| s.is_active())
                    .unwrap_or(false);
                if still_active {
                    return Err(DomainError::SessionConflict {
                        charge_point_id: key.0,
                        connector_id: key.1,
                    });
                }
                session.transaction_id = self.transaction_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(session.id);
                self.sessions.insert(session.id, session);
                Ok(())
            }
            Entry::Vacant(slot) => {
                session.transaction_id = self.transaction_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(session.id);
                self.sessions.insert(session.id, session);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargeSession>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn find_active(
        &self,
        charge_point_id: i64,
        connector_id: i32,
    ) -> DomainResult<Option<ChargeSession>> {
        let Some(active) = self.active_sessions.get(&(charge_point_id, connector_id)) else {
            return Ok(None);
        };
        Ok(self
            .sessions
            .get(active.value())
            .filter(|s| s.is_active())
            .map(|s| s.clone()))
    }

    async fn find_by_transaction(
        &self,
        charge_point_id: i64,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargeSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.charge_point_id == charge_point_id && s.transaction_id == transaction_id)
            .map(|s| s.clone()))
    }

    async fn update(&self, session: ChargeSession) -> DomainResult<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(DomainError::Storage(format!(
                "charge session {} not found",
                session.id
            )));
        }
        if session.ended.is_some() {
            let key = (session.charge_point_id, session.connector_id);
            // Free the connector only while the slot still points here.
            self.active_sessions
                .remove_if(&key, |_, active| *active == session.id);
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn delete_posted_before(&self, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|s| s.posted.map(|posted| posted < cutoff).unwrap_or(false))
            .map(|s| s.id)
            .collect();
        for id in &expired {
            if let Some((_, session)) = self.sessions.remove(id) {
                self.active_sessions.remove_if(
                    &(session.charge_point_id, session.connector_id),
                    |_, active| *active == session.id,
                );
            }
            self.readings.remove(&Some(*id));
        }
        Ok(expired.len())
    }

    async fn save_readings(&self, readings: Vec<Reading>) -> DomainResult<()> {
        for reading in readings {
            self.readings
                .entry(reading.session_id)
                .or_default()
                .push(reading);
        }
        Ok(())
    }

    async fn find_readings(&self, session_id: Option<Uuid>) -> DomainResult<Vec<Reading>> {
        Ok(self
            .readings
            .get(&session_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryStore {
    async fn find_for_charge_point(
        &self,
        charge_point_id: i64,
    ) -> DomainResult<Option<PublishSettings>> {
        Ok(self
            .charge_point_settings
            .get(&charge_point_id)
            .map(|s| s.clone()))
    }

    async fn find_user_defaults(&self, user_id: i64) -> DomainResult<Option<PublishSettings>> {
        Ok(self.user_settings.get(&user_id).map(|s| s.clone()))
    }
}

#[async_trait]
impl InstructionStore for InMemoryStore {
    async fn compare_and_set_state(
        &self,
        instruction_id: i64,
        expected: InstructionState,
        next: InstructionState,
        result_params: BTreeMap<String, String>,
    ) -> DomainResult<bool> {
        let Some(mut instruction) = self.instructions.get_mut(&instruction_id) else {
            return Err(DomainError::Storage(format!(
                "instruction {} not found",
                instruction_id
            )));
        };
        if instruction.state != expected {
            return Ok(false);
        }
        instruction.state = next;
        instruction.result_params.extend(result_params);
        Ok(true)
    }
}

// ── Tests ──────────────────────────────────────────────────────
