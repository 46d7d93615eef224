//! Runs the whole AWS lab: RDS, DynamoDB, then the integration report.
//!
//! Usage:
//!   cargo run --bin run-all-aws

use carecenter_lab::cloud;
use carecenter_lab::config::Config;
use carecenter_lab::logging;
use carecenter_lab::pool::StoreConnector;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = logging::init("run-all-aws.log");

    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file found or error loading it: {}", e);
    }

    let connector = StoreConnector::new(Config::from_env()?);
    cloud::run_all(&connector).await?;

    Ok(())
}
