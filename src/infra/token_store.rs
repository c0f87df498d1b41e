use crate::application_port::*;
use crate::domain_model::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory sessions keyed by principal.
///
/// Each record sits behind its own async mutex: work on one principal is
/// serialized, different principals proceed in parallel.
#[derive(Debug, Default)]
pub struct TokenStore {
    records: DashMap<Principal, Arc<Mutex<TokenRecord>>>,
}

/// Exclusive access to one principal's record, held across a login or refresh
/// round trip so concurrent callers wait for its outcome instead of racing.
pub struct SessionGuard {
    principal: Principal,
    record: OwnedMutexGuard<TokenRecord>,
}

impl SessionGuard {
    pub fn principal(&self) -> Principal {
        self.principal
    }

    pub fn record(&self) -> &TokenRecord {
        &self.record
    }

    /// Usable tokens; expired ones are dropped from the record on the way.
    pub fn tokens(&mut self) -> (Option<String>, Option<String>) {
        self.record.live_tokens(Utc::now())
    }

    pub fn update(
        &mut self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<TokenRecord, AuthError> {
        self.record.update(access, refresh)?;
        Ok(self.record.clone())
    }

    pub fn clear_access(&mut self) {
        self.record.clear_access();
    }
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, principal: Principal) -> Arc<Mutex<TokenRecord>> {
        Arc::clone(&self.records.entry(principal).or_default())
    }

    /// Waits for exclusive access to the principal's record, creating an empty
    /// one on first reference.
    ///
    /// A cell evicted while we waited on it is no longer reachable from the
    /// map, so the wait starts over on the fresh cell.
    pub async fn lock(&self, principal: Principal) -> SessionGuard {
        loop {
            let cell = self.cell(principal);
            let record = Arc::clone(&cell).lock_owned().await;
            if self.is_current(principal, &cell) {
                return SessionGuard { principal, record };
            }
        }
    }

    fn is_current(&self, principal: Principal, cell: &Arc<Mutex<TokenRecord>>) -> bool {
        self.records
            .get(&principal)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), cell))
    }

    pub async fn upsert(
        &self,
        principal: Principal,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<TokenRecord, AuthError> {
        self.lock(principal).await.update(access, refresh)
    }

    pub async fn get(&self, principal: Principal) -> (Option<String>, Option<String>) {
        let cell = match self.records.get(&principal) {
            Some(entry) => Arc::clone(entry.value()),
            None => return (None, None),
        };
        let mut record = cell.lock().await;
        record.live_tokens(Utc::now())
    }

    /// Removes the record once any login or refresh running on it has
    /// finished, so its outcome is part of what is returned.
    pub async fn evict(&self, principal: Principal) -> Result<TokenRecord, AuthError> {
        let cell = self
            .records
            .get(&principal)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AuthError::NotFound(principal))?;
        let record = cell.lock().await;
        self.records
            .remove_if(&principal, |_, current| Arc::ptr_eq(current, &cell))
            .ok_or(AuthError::NotFound(principal))?;
        Ok(record.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
