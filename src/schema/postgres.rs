use crate::error::Result;
use crate::pool::StoreConnector;
use crate::schema::ddl::{ID_COLUMNS, POSTGRES_TABLES_SQL, TABLES};
use crate::schema::mysql::ensure_identifier;
use deadpool_postgres::Client;
use tracing::{debug, info};

const ADMIN_DATABASE: &str = "postgres";

pub struct PostgresSchema;

impl PostgresSchema {
    pub fn new() -> Self {
        Self
    }

    pub async fn database_exists(&self, client: &Client, db_name: &str) -> Result<bool> {
        let row = client
            .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&db_name])
            .await?;

        Ok(row.is_some())
    }

    /// Create the database through the admin connection, then the tables inside it.
    pub async fn create(&self, connector: &StoreConnector, db_name: &str) -> Result<()> {
        ensure_identifier(db_name)?;

        {
            let admin_pool = connector.postgres(ADMIN_DATABASE).await?;
            let client = admin_pool.get().await?;

            if self.database_exists(&client, db_name).await? {
                debug!("PostgreSQL: database {} already exists", db_name);
            } else {
                // Identifiers cannot be bound as parameters in DDL
                client
                    .batch_execute(&format!("CREATE DATABASE \"{}\"", db_name))
                    .await?;
                info!("PostgreSQL: created database {}", db_name);
            }
        }

        let pool = connector.postgres(db_name).await?;
        let client = pool.get().await?;
        client.batch_execute(POSTGRES_TABLES_SQL).await?;

        info!("PostgreSQL: structure created in {}", db_name);
        Ok(())
    }

    pub async fn drop(&self, connector: &StoreConnector, db_name: &str) -> Result<()> {
        ensure_identifier(db_name)?;

        let admin_pool = connector.postgres(ADMIN_DATABASE).await?;
        let client = admin_pool.get().await?;

        // Other sessions on the database block DROP DATABASE
        let terminated = client
            .query(
                "SELECT pg_terminate_backend(pg_stat_activity.pid)
                 FROM pg_stat_activity
                 WHERE pg_stat_activity.datname = $1
                 AND pid <> pg_backend_pid()",
                &[&db_name],
            )
            .await?;
        debug!("PostgreSQL: terminated {} sessions on {}", terminated.len(), db_name);

        client
            .batch_execute(&format!("DROP DATABASE IF EXISTS \"{}\"", db_name))
            .await?;

        info!("PostgreSQL: database '{}' dropped (or did not exist)", db_name);
        Ok(())
    }

    pub async fn truncate_all(&self, client: &Client) -> Result<()> {
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", TABLES.join(", "));
        client.batch_execute(&sql).await?;
        Ok(())
    }

    /// Move every serial sequence past the ids inserted explicitly.
    pub async fn realign_sequences(&self, client: &Client) -> Result<()> {
        for (table, column) in ID_COLUMNS {
            let sql = format!(
                "SELECT setval(pg_get_serial_sequence('{table}', '{column}'), \
                 COALESCE((SELECT MAX({column}) FROM {table}), 0) + 1, false)",
                table = table.to_lowercase(),
                column = column.to_lowercase(),
            );
            client.batch_execute(&sql).await?;
        }

        debug!("PostgreSQL: sequences realigned");
        Ok(())
    }
}

impl Default for PostgresSchema {
    fn default() -> Self {
        Self::new()
    }
}
