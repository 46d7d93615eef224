use crate::config::{Config, SqlServer};
use crate::error::{LabError, Result};
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use redis::aio::ConnectionManager;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::ConnectOptions;
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Opens connections to every store the lab talks to.
///
/// Each operation asks for the connection it needs and drops it when done;
/// nothing is cached between operations.
pub struct StoreConnector {
    config: Config,
}

impl StoreConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Single MySQL connection to the lab server, optionally bound to `database`.
    pub async fn mysql(&self, database: Option<&str>) -> Result<MySqlConnection> {
        connect_mysql(&self.config.mysql, database).await
    }

    /// Single MySQL connection to the RDS instance.
    pub async fn rds(&self, database: Option<&str>) -> Result<MySqlConnection> {
        let server = self.config.rds.server()?;
        connect_mysql(&server, database).await
    }

    /// PostgreSQL pool for `database`, tested with a ping before returning.
    pub async fn postgres(&self, database: &str) -> Result<Pool> {
        let url = self.config.postgres.postgres_url(database);
        let pool = create_pool(&url, 2)?;

        let client = pool.get().await.map_err(|e| LabError::ConnectionFailed {
            store: format!("PostgreSQL ({})", database),
            cause: e.to_string(),
        })?;

        client.execute("SELECT 1", &[]).await.map_err(|e| LabError::ConnectionFailed {
            store: format!("PostgreSQL ({})", database),
            cause: format!("Ping failed: {}", e),
        })?;

        debug!("Connected to PostgreSQL database {}", database);
        Ok(pool)
    }

    pub async fn mongo(&self) -> Result<mongodb::Client> {
        mongo_client(&self.config.mongo_uri).await
    }

    pub async fn mongo_atlas(&self) -> Result<mongodb::Client> {
        let uri = self.config.atlas.uri()?;
        mongo_client(&uri).await
    }

    pub async fn redis(&self) -> Result<ConnectionManager> {
        let client = redis::Client::open(self.config.redis_url.clone())
            .map_err(|e| LabError::connection("Redis", e))?;
        let mut manager = ConnectionManager::new(client)
            .await
            .map_err(|e| LabError::connection("Redis", e))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut manager)
            .await
            .map_err(|e| LabError::connection("Redis", format!("Ping failed: {}", e)))?;

        info!("Connected to Redis at {}", self.config.redis_url);
        Ok(manager)
    }

    pub async fn dynamo(&self) -> aws_sdk_dynamodb::Client {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.config.aws_region.clone()))
            .load()
            .await;
        aws_sdk_dynamodb::Client::new(&aws_config)
    }
}

async fn connect_mysql(server: &SqlServer, database: Option<&str>) -> Result<MySqlConnection> {
    let mut options = MySqlConnectOptions::new()
        .host(&server.host)
        .port(server.port)
        .username(&server.user)
        .password(&server.password);

    if let Some(db) = database {
        options = options.database(db);
    }

    let conn = options.connect().await.map_err(|e| LabError::ConnectionFailed {
        store: format!("MySQL ({}:{})", server.host, server.port),
        cause: e.to_string(),
    })?;

    debug!("Connected to MySQL at {}:{} (database: {:?})", server.host, server.port, database);
    Ok(conn)
}

async fn mongo_client(uri: &str) -> Result<mongodb::Client> {
    mongodb::Client::with_uri_str(uri)
        .await
        .map_err(|e| LabError::connection("MongoDB", e))
}

pub fn create_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| LabError::Internal(format!("Failed to create pool: {}", e)))
}

/// Database and table names are spliced into DDL, so only plain identifiers pass.
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let Some(first_char) = name.chars().next() else {
        return false;
    };
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return false;
    }

    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifier() {
        assert!(is_valid_identifier("CENTROCUIDADOFAMILIAR"));
        assert!(is_valid_identifier("CentroCuidadoNube"));
        assert!(is_valid_identifier("_test"));
        assert!(is_valid_identifier("servicios_db"));

        assert!(!is_valid_identifier("")); // Empty
        assert!(!is_valid_identifier("DROP TABLE")); // SQL injection attempt
        assert!(!is_valid_identifier("1_test")); // Starts with number
        assert!(!is_valid_identifier("db;--"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }
}
