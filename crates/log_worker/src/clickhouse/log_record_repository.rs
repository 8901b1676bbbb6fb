use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use common::clickhouse::ClickHouseClient;
use common::domain::{
    DomainError, DomainResult, EnvelopeSource, LogRecord, LogRecordRepository, log_key,
    tenant_key,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Stored item shape; column names are read by external tooling
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct LogRecordRow {
    pub tenant_pk: String,
    pub log_sk: String,
    pub source: String,
    pub original_text: String,
    pub modified_data: String,
    #[serde(with = "clickhouse::serde::chrono::datetime64::millis")]
    pub processed_at: DateTime<Utc>,
}

impl From<&LogRecord> for LogRecordRow {
    fn from(record: &LogRecord) -> Self {
        LogRecordRow {
            tenant_pk: record.tenant_key.clone(),
            log_sk: record.log_key.clone(),
            source: record.source.as_str().to_string(),
            original_text: record.original_text.clone(),
            modified_data: record.derived_text.clone(),
            processed_at: record.processed_at,
        }
    }
}

impl TryFrom<LogRecordRow> for LogRecord {
    type Error = DomainError;

    fn try_from(row: LogRecordRow) -> Result<Self, Self::Error> {
        Ok(LogRecord {
            tenant_key: row.tenant_pk,
            log_key: row.log_sk,
            source: row.source.parse::<EnvelopeSource>()?,
            original_text: row.original_text,
            derived_text: row.modified_data,
            processed_at: row.processed_at,
        })
    }
}

/// ClickHouse implementation of LogRecordRepository.
///
/// The table is a ReplacingMergeTree ordered by the record key, versioned by
/// `processed_at`; reads use `FINAL` so a key always resolves to its latest write.
#[derive(Clone)]
pub struct ClickHouseLogRecordRepository {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseLogRecordRepository {
    pub fn new(client: ClickHouseClient, table: String) -> Self {
        Self { client, table }
    }

    pub fn create_table_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                tenant_pk String, \
                log_sk String, \
                source LowCardinality(String), \
                original_text String, \
                modified_data String, \
                processed_at DateTime64(3, 'UTC')\
            ) ENGINE = ReplacingMergeTree(processed_at) \
            ORDER BY (tenant_pk, log_sk)",
            self.table
        )
    }

    /// Create the backing table if it does not exist yet
    pub async fn ensure_table(&self) -> anyhow::Result<()> {
        self.client.execute(&self.create_table_statement()).await?;
        info!(table = %self.table, "log record table ready");
        Ok(())
    }
}

#[async_trait]
impl LogRecordRepository for ClickHouseLogRecordRepository {
    async fn upsert(&self, record: &LogRecord) -> DomainResult<()> {
        let row = LogRecordRow::from(record);

        debug!(
            table = %self.table,
            tenant_pk = %row.tenant_pk,
            log_sk = %row.log_sk,
            "writing log record to ClickHouse"
        );

        let mut insert = self
            .client
            .get_client()
            .insert::<LogRecordRow>(&self.table)
            .await
            .map_err(|e| {
                error!("failed to create ClickHouse inserter: {}", e);
                DomainError::RepositoryError(e.into())
            })?;

        insert.write(&row).await.map_err(|e| {
            error!("failed to write row to ClickHouse: {}", e);
            DomainError::RepositoryError(e.into())
        })?;

        insert.end().await.map_err(|e| {
            error!("failed to finalize ClickHouse insert: {}", e);
            DomainError::RepositoryError(e.into())
        })?;

        Ok(())
    }

    async fn find(&self, tenant_id: &str, log_id: &str) -> DomainResult<Option<LogRecord>> {
        let query = format!(
            "SELECT ?fields FROM {} FINAL WHERE tenant_pk = ? AND log_sk = ? LIMIT 1",
            self.table
        );

        let row = self
            .client
            .get_client()
            .query(&query)
            .bind(tenant_key(tenant_id))
            .bind(log_key(log_id))
            .fetch_optional::<LogRecordRow>()
            .await
            .map_err(|e| {
                error!("failed to query ClickHouse: {}", e);
                DomainError::RepositoryError(e.into())
            })?;

        row.map(LogRecord::try_from).transpose()
    }
}
