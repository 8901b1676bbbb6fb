use anyhow::{Context, Result};
use clickhouse::Client;
use tracing::debug;

#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
}

impl ClickHouseClient {
    pub fn new(url: &str, database: &str, username: &str, password: &str) -> Self {
        let client = Client::default()
            .with_url(url)
            .with_database(database)
            .with_user(username)
            .with_password(password)
            .with_compression(clickhouse::Compression::Lz4);

        Self { client }
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("ClickHouse ping failed")?;
        Ok(())
    }

    /// Run a DDL statement such as `CREATE TABLE IF NOT EXISTS`
    pub async fn execute(&self, statement: &str) -> Result<()> {
        debug!(statement = %statement, "executing ClickHouse statement");
        self.client
            .query(statement)
            .execute()
            .await
            .context("ClickHouse statement failed")?;
        Ok(())
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}
