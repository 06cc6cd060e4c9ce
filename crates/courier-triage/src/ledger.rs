//! Closure record persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::model::ClosureRecord;
use crate::source::TriageError;

/// Stores per-date completion records.
#[async_trait]
pub trait ClosureLedger: Send + Sync {
    /// Loads the record for a plan date, if one exists.
    async fn load(&self, plan_date: NaiveDate) -> Result<Option<ClosureRecord>, TriageError>;

    /// Stores (or replaces) a record.
    async fn store(&self, record: ClosureRecord) -> Result<(), TriageError>;
}

/// In-memory ledger for tests and local runs.
#[derive(Default)]
pub struct InMemoryClosureLedger {
    records: RwLock<HashMap<NaiveDate, ClosureRecord>>,
}

impl InMemoryClosureLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClosureLedger for InMemoryClosureLedger {
    async fn load(&self, plan_date: NaiveDate) -> Result<Option<ClosureRecord>, TriageError> {
        Ok(self.records.read().await.get(&plan_date).cloned())
    }

    async fn store(&self, record: ClosureRecord) -> Result<(), TriageError> {
        self.records.write().await.insert(record.plan_date, record);
        Ok(())
    }
}
