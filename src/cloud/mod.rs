//! AWS lab: RDS, DynamoDB and the integration report.

pub mod dynamo;
pub mod integration;
pub mod rds;

use crate::error::Result;
use crate::pool::StoreConnector;
use tracing::{error, info};

pub use dynamo::attribute_to_json;

pub async fn run_dynamo(connector: &StoreConnector) -> Result<()> {
    let client = connector.dynamo().await;
    dynamo::run(&client).await
}

/// RDS, then DynamoDB, then the integration report. The first failing step stops the run.
pub async fn run_all(connector: &StoreConnector) -> Result<()> {
    info!("==================================================================");
    info!("  FULL AWS FLOW: MANAGEMENT AND CLOUD INTEGRATION");
    info!("==================================================================");

    info!("--- STEP 1: RDS (MySQL in the cloud) ---");
    if let Err(e) = rds::run(connector).await {
        error!("[FATAL] RDS step failed: {}", e);
        return Err(e);
    }
    info!("[OK] RDS step completed");

    info!("--- STEP 2: DynamoDB (NoSQL in the cloud) ---");
    if let Err(e) = run_dynamo(connector).await {
        error!("[FATAL] DynamoDB step failed: {}", e);
        return Err(e);
    }
    info!("[OK] DynamoDB step completed");

    info!("--- STEP 3: integration report ---");
    match integration::run(connector).await {
        Ok(path) => info!("[OK] Integration report written to {}", path.display()),
        Err(e) => {
            error!("[FATAL] Integration step failed: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
