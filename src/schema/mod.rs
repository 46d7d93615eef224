//! Schema lifecycle for the three primary stores.
//!
//! `create_all` and `reset_all` visit MySQL, PostgreSQL and MongoDB in that
//! order; a failing store is logged and the next one is still attempted.

pub mod ddl;
mod fixture;
mod mongo;
mod mysql;
mod postgres;

pub use ddl::{split_statements, TABLES};
pub use fixture::{install_fixture, prepare_time_registry, FixtureSummary, RegistryStatus, TableCount};
pub use mongo::{MongoSchema, COLLECTIONS, CUIDADORES, LOGS, SERVICIOS, USUARIOS};
pub use mysql::MySqlSchema;
pub use postgres::PostgresSchema;

use crate::error::Result;
use crate::outcome::StoreOutcome;
use crate::pool::StoreConnector;
use tracing::info;

pub async fn create_all(connector: &StoreConnector) -> Vec<StoreOutcome> {
    let db_name = connector.config().db_name.clone();
    let mut outcomes = Vec::new();

    info!("-> Creating MySQL structure...");
    let result = MySqlSchema::new()
        .create(connector, &db_name)
        .await
        .map(|n| format!("{} tables ready", n));
    outcomes.push(StoreOutcome::record("MySQL", result));

    info!("-> Creating PostgreSQL structure...");
    let result = PostgresSchema::new()
        .create(connector, &db_name)
        .await
        .map(|_| "structure created".to_string());
    outcomes.push(StoreOutcome::record("PostgreSQL", result));

    info!("-> Creating MongoDB collections...");
    let result = create_mongo(connector, &db_name)
        .await
        .map(|n| format!("{} collections created", n));
    outcomes.push(StoreOutcome::record("MongoDB", result));

    outcomes
}

async fn create_mongo(connector: &StoreConnector, db_name: &str) -> Result<usize> {
    let client = connector.mongo().await?;
    let created = MongoSchema::new().create(&client, db_name).await?;
    client.shutdown().await;
    Ok(created)
}

pub async fn reset_all(connector: &StoreConnector) -> Vec<StoreOutcome> {
    let db_name = connector.config().db_name.clone();
    let mut outcomes = Vec::new();

    info!("-> Dropping MySQL database...");
    let result = MySqlSchema::new()
        .drop(connector, &db_name)
        .await
        .map(|_| format!("database '{}' dropped", db_name));
    outcomes.push(StoreOutcome::record("MySQL", result));

    info!("-> Dropping PostgreSQL database...");
    let result = PostgresSchema::new()
        .drop(connector, &db_name)
        .await
        .map(|_| format!("database '{}' dropped", db_name));
    outcomes.push(StoreOutcome::record("PostgreSQL", result));

    info!("-> Dropping MongoDB database...");
    let result = drop_mongo(connector, &db_name)
        .await
        .map(|_| format!("database '{}' dropped", db_name));
    outcomes.push(StoreOutcome::record("MongoDB", result));

    outcomes
}

async fn drop_mongo(connector: &StoreConnector, db_name: &str) -> Result<()> {
    let client = connector.mongo().await?;
    MongoSchema::new().drop(&client, db_name).await?;
    client.shutdown().await;
    Ok(())
}
