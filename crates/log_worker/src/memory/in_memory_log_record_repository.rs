use async_trait::async_trait;
use common::domain::{DomainResult, LogRecord, LogRecordRepository, log_key, tenant_key};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of LogRecordRepository keyed by (tenant_key, log_key)
#[derive(Clone)]
pub struct InMemoryLogRecordRepository {
    records: Arc<RwLock<HashMap<(String, String), LogRecord>>>,
}

impl InMemoryLogRecordRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryLogRecordRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogRecordRepository for InMemoryLogRecordRepository {
    async fn upsert(&self, record: &LogRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.insert(
            (record.tenant_key.clone(), record.log_key.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn find(&self, tenant_id: &str, log_id: &str) -> DomainResult<Option<LogRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(tenant_key(tenant_id), log_key(log_id)))
            .cloned())
    }
}
