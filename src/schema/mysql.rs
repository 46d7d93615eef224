use crate::error::{LabError, Result};
use crate::pool::{is_valid_identifier, StoreConnector};
use crate::schema::ddl::{split_statements, MYSQL_TABLES_SQL, TABLES};
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};

pub struct MySqlSchema;

impl MySqlSchema {
    pub fn new() -> Self {
        Self
    }

    /// Create the database (if missing) and every table of the MySQL script.
    pub async fn create(&self, connector: &StoreConnector, db_name: &str) -> Result<usize> {
        ensure_identifier(db_name)?;

        let mut conn = connector.mysql(None).await?;

        self.create_database(&mut conn, db_name).await?;
        sqlx::raw_sql(&format!("USE `{}`", db_name))
            .execute(&mut conn)
            .await?;

        let executed = self.execute_script(&mut conn, MYSQL_TABLES_SQL).await?;
        conn.close().await?;

        info!("MySQL: structure created in {} ({} statements)", db_name, executed);
        Ok(executed)
    }

    pub async fn create_database(&self, conn: &mut MySqlConnection, db_name: &str) -> Result<()> {
        ensure_identifier(db_name)?;

        sqlx::raw_sql(&format!("CREATE DATABASE IF NOT EXISTS `{}`", db_name))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn execute_script(&self, conn: &mut MySqlConnection, script: &str) -> Result<usize> {
        let statements = split_statements(script);

        for statement in &statements {
            debug!("MySQL: {}", statement.lines().next().unwrap_or(""));
            sqlx::raw_sql(statement).execute(&mut *conn).await?;
        }

        Ok(statements.len())
    }

    pub async fn drop(&self, connector: &StoreConnector, db_name: &str) -> Result<()> {
        ensure_identifier(db_name)?;

        // Connect without selecting the database so it can be dropped
        let mut conn = connector.mysql(None).await?;
        sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS `{}`", db_name))
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        info!("MySQL: database '{}' dropped (or did not exist)", db_name);
        Ok(())
    }

    /// Empty every care center table, plus any `extra` tables that exist.
    pub async fn truncate_all(&self, conn: &mut MySqlConnection, extra: &[&str]) -> Result<()> {
        sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 0")
            .execute(&mut *conn)
            .await?;

        for table in TABLES.iter().rev() {
            sqlx::raw_sql(&format!("TRUNCATE TABLE {}", table))
                .execute(&mut *conn)
                .await?;
        }

        for table in extra {
            if let Err(e) = sqlx::raw_sql(&format!("TRUNCATE TABLE {}", table))
                .execute(&mut *conn)
                .await
            {
                warn!("MySQL: could not truncate {}: {}", table, e);
            }
        }

        sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 1")
            .execute(&mut *conn)
            .await?;

        debug!("MySQL: all tables truncated");
        Ok(())
    }
}

impl Default for MySqlSchema {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn ensure_identifier(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(LabError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}
