//! Populate every primary store with one shared synthetic dataset.

mod generator;
mod mongo;
mod sql;

pub use generator::{dni_letter, SeedDataset, SeedSettings, ESPECIALIDADES};
pub use mongo::{cuidador_document, populate_mongodb, servicio_document, usuaria_document};
pub use sql::{populate_mysql, populate_postgres};

use crate::error::Result;
use crate::outcome::StoreOutcome;
use crate::pool::StoreConnector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

pub fn build_dataset(connector: &StoreConnector) -> SeedDataset {
    let config = connector.config();
    let settings = SeedSettings::new(
        config.seed_records,
        config.seed_services,
        chrono::Local::now().naive_local(),
    );

    let mut rng = match config.seed_rng {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    SeedDataset::generate(&settings, &mut rng)
}

pub async fn populate_all(connector: &StoreConnector) -> Vec<StoreOutcome> {
    let db_name = connector.config().db_name.clone();
    let data = build_dataset(connector);

    info!(
        "Generated {} usuarias, {} servicios ({} rows)",
        data.usuarias.len(),
        data.servicios.len(),
        data.total_rows()
    );

    let mut outcomes = Vec::new();

    info!("-> Populating MySQL...");
    let result = populate_mysql(connector, &db_name, &data)
        .await
        .map(|n| format!("{} rows inserted", n));
    outcomes.push(StoreOutcome::record("MySQL", result));

    info!("-> Populating PostgreSQL...");
    let result = populate_postgres(connector, &db_name, &data)
        .await
        .map(|n| format!("{} rows inserted", n));
    outcomes.push(StoreOutcome::record("PostgreSQL", result));

    info!("-> Populating MongoDB...");
    let result = populate_mongo(connector, &db_name, &data)
        .await
        .map(|n| format!("{} documents inserted", n));
    outcomes.push(StoreOutcome::record("MongoDB", result));

    outcomes
}

async fn populate_mongo(connector: &StoreConnector, db_name: &str, data: &SeedDataset) -> Result<usize> {
    let client = connector.mongo().await?;
    let inserted = populate_mongodb(&client, db_name, data).await?;
    client.shutdown().await;
    Ok(inserted)
}
