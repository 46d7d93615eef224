use crate::error::Result;
use bson::{doc, Document};
use mongodb::{Client, IndexModel};
use tracing::{debug, info};

pub const USUARIOS: &str = "usuarios_mongo";
pub const CUIDADORES: &str = "cuidadores_mongo";
pub const SERVICIOS: &str = "servicios_mongo";
pub const LOGS: &str = "logs";

pub const COLLECTIONS: [&str; 4] = [USUARIOS, CUIDADORES, SERVICIOS, LOGS];

pub struct MongoSchema;

impl MongoSchema {
    pub fn new() -> Self {
        Self
    }

    /// Create the collections that do not exist yet and the servicios index.
    pub async fn create(&self, client: &Client, db_name: &str) -> Result<usize> {
        let db = client.database(db_name);
        let existing = db.list_collection_names().await?;

        let mut created = 0;
        for name in COLLECTIONS {
            if existing.iter().any(|c| c == name) {
                debug!("MongoDB: collection {} already exists", name);
                continue;
            }
            db.create_collection(name).await?;
            created += 1;
        }

        let index = IndexModel::builder().keys(doc! { "IDUsuario": 1 }).build();
        db.collection::<Document>(SERVICIOS).create_index(index).await?;

        info!("MongoDB: {} collections created in {}", created, db_name);
        Ok(created)
    }

    pub async fn drop(&self, client: &Client, db_name: &str) -> Result<()> {
        client.database(db_name).drop().await?;
        info!("MongoDB: database '{}' dropped", db_name);
        Ok(())
    }
}

impl Default for MongoSchema {
    fn default() -> Self {
        Self::new()
    }
}
