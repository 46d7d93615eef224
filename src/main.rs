use carecenter_lab::config::Config;
use carecenter_lab::error::Result;
use carecenter_lab::outcome::{all_succeeded, ensure_all_succeeded, StoreOutcome};
use carecenter_lab::pool::StoreConnector;
use carecenter_lab::{cache, cloud, logging, report, schema, seed, series};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "carecenter-lab", version, about = "Care center data lab across SQL, NoSQL, Redis and AWS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema in MySQL, PostgreSQL and MongoDB
    Create,
    /// Fill the three stores with one synthetic dataset
    Populate,
    /// Drop the lab database in MySQL, PostgreSQL and MongoDB
    Reset,
    /// Write datos_analisis.json (service quality by gender and income)
    Analyze,
    /// Write usuarias_renta_alta.json consolidated from the three stores
    HighIncome,
    /// Load the series catalog into Atlas and export the filtered views
    Series,
    /// Redis demos
    #[command(subcommand)]
    Redis(RedisCommand),
    /// AWS demos
    #[command(subcommand)]
    Aws(AwsCommand),
}

#[derive(Subcommand)]
enum RedisCommand {
    /// Create REGISTRO_TIEMPO and report the source table counts
    SetupSql,
    /// Replace the MySQL data with the small fixed sample
    Fixture,
    /// Step-by-step tour of keys, JSON, lists and search
    Walkthrough,
    /// Service durations through a Redis index into REGISTRO_TIEMPO
    Durations,
    /// Copy MySQL rows into Redis and cached servicios back into MySQL
    Sync {
        /// Centro whose cached servicios are copied to MySQL
        #[arg(long, default_value = "Domicilio")]
        centro: String,
    },
}

#[derive(Subcommand)]
enum AwsCommand {
    /// Create ReportesNube on RDS, insert the sample reports and query them
    Rds,
    /// Create the DynamoDB tables and run the item, scan, index and PartiQL demos
    Dynamo,
    /// Write aws_integration_result.json from active DynamoDB users and RDS reports
    Integrate,
    /// RDS, DynamoDB and integration in sequence
    All,
}

fn summarize(operation: &str, outcomes: &[StoreOutcome]) -> Result<()> {
    if all_succeeded(outcomes) {
        info!("{}: every store succeeded", operation);
    }
    ensure_all_succeeded(operation, outcomes).inspect_err(|e| warn!("{}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = logging::init("carecenter-lab.log");

    // Load environment from .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file found or error loading it: {}", e);
    }

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Lab database: {}", config.db_name);
    let connector = StoreConnector::new(config);
    let db_name = connector.config().db_name.clone();

    match cli.command {
        Command::Create => {
            let outcomes = schema::create_all(&connector).await;
            summarize("create", &outcomes)?;
        }
        Command::Populate => {
            let outcomes = seed::populate_all(&connector).await;
            summarize("populate", &outcomes)?;
        }
        Command::Reset => {
            let outcomes = schema::reset_all(&connector).await;
            summarize("reset", &outcomes)?;
        }
        Command::Analyze => match report::analysis::run(&connector).await? {
            Some(path) => info!("Analysis written to {}", path.display()),
            None => warn!("Analysis not generated"),
        },
        Command::HighIncome => {
            let path = report::high_income::run(&connector).await?;
            info!("Consolidated file written to {}", path.display());
        }
        Command::Series => {
            let files = series::run(&connector).await?;
            info!("{} series exports written", files.len());
        }
        Command::Redis(command) => match command {
            RedisCommand::SetupSql => {
                let status = schema::prepare_time_registry(&connector, &db_name).await?;
                if !status.has_services {
                    warn!("Run 'populate' before 'redis durations'");
                }
            }
            RedisCommand::Fixture => {
                let summary = schema::install_fixture(&connector, &db_name).await?;
                info!(
                    "Fixture installed: {} usuarias, {} cuidadores, {} dependientes, {} centros",
                    summary.usuarias, summary.cuidadores, summary.dependientes, summary.centros
                );
            }
            RedisCommand::Walkthrough => cache::walkthrough::run(&connector).await?,
            RedisCommand::Durations => {
                let written = cache::durations::run(&connector).await?;
                info!("{} duration records migrated", written);
            }
            RedisCommand::Sync { centro } => {
                let summary = cache::sync::run(&connector, &centro).await?;
                info!(
                    "Sync done: {} usuarias, {} cuidadores, {} servicios migrated",
                    summary.usuarias, summary.cuidadores, summary.servicios_migrados
                );
            }
        },
        Command::Aws(command) => {
            let result = match command {
                AwsCommand::Rds => cloud::rds::run(&connector).await,
                AwsCommand::Dynamo => cloud::run_dynamo(&connector).await,
                AwsCommand::Integrate => cloud::integration::run(&connector).await.map(|_| ()),
                AwsCommand::All => cloud::run_all(&connector).await,
            };
            if let Err(e) = result {
                error!("AWS command failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_subcommand_has_help_text() {
        let cli = Cli::command();
        for group in ["redis", "aws"] {
            let command = cli.find_subcommand(group).unwrap();
            for sub in command.get_subcommands() {
                assert!(sub.get_about().is_some(), "{} {} has no help text", group, sub.get_name());
            }
        }
    }
}
