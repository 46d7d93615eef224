//! Reporting table on the RDS MySQL instance.

use crate::error::Result;
use crate::pool::StoreConnector;
use crate::schema::MySqlSchema;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use tracing::info;

const REPORTES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ReportesNube (
    ID INT AUTO_INCREMENT PRIMARY KEY,
    Tipo VARCHAR(50),
    Descripcion VARCHAR(255),
    Fecha TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const REPORTES: [(&str, &str); 3] = [
    ("Mensual", "Reporte de ingresos enero"),
    ("Incidencia", "Caída del servidor principal"),
    ("Auditoria", "Revisión anual completada"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reporte {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Tipo")]
    pub tipo: Option<String>,
    #[serde(rename = "Descripcion")]
    pub descripcion: Option<String>,
    /// `Fecha` is a TIMESTAMP column, which sqlx only decodes into `DateTime<Utc>`.
    #[serde(rename = "Fecha", serialize_with = "serialize_fecha")]
    pub fecha: Option<DateTime<Utc>>,
}

fn serialize_fecha<S: serde::Serializer>(fecha: &Option<DateTime<Utc>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match fecha {
        Some(f) => serializer.serialize_str(&f.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => serializer.serialize_none(),
    }
}

impl Reporte {
    fn from_row(row: &MySqlRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("ID")?,
            tipo: row.try_get("Tipo")?,
            descripcion: row.try_get("Descripcion")?,
            fecha: row.try_get("Fecha")?,
        })
    }
}

pub async fn fetch_reportes(conn: &mut MySqlConnection) -> Result<Vec<Reporte>> {
    let rows = sqlx::query("SELECT ID, Tipo, Descripcion, Fecha FROM ReportesNube")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(Reporte::from_row).collect()
}

/// Create the database and table on RDS, insert the sample reports and run three queries.
pub async fn run(connector: &StoreConnector) -> Result<()> {
    let db_name = connector.config().rds.database.clone();
    let server = connector.config().rds.server()?;
    info!("Connecting to RDS at {}...", server.host);

    let mut conn = connector.rds(None).await?;
    MySqlSchema::new().create_database(&mut conn, &db_name).await?;
    conn.close().await?;
    info!("Database '{}' verified/created", db_name);

    let mut conn = connector.rds(Some(&db_name)).await?;
    sqlx::raw_sql(REPORTES_TABLE_SQL).execute(&mut conn).await?;
    info!("Table 'ReportesNube' ready");

    let mut tx = conn.begin().await?;
    for (tipo, descripcion) in REPORTES {
        sqlx::query("INSERT INTO ReportesNube (Tipo, Descripcion) VALUES (?, ?)")
            .bind(tipo)
            .bind(descripcion)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    info!("{} reports inserted", REPORTES.len());

    info!("QUERY 1: all reports");
    for reporte in fetch_reportes(&mut conn).await? {
        info!("  Row: {:?}", reporte);
    }

    info!("QUERY 2: Tipo = 'Incidencia'");
    let incidencias = sqlx::query("SELECT Descripcion, Fecha FROM ReportesNube WHERE Tipo = ?")
        .bind("Incidencia")
        .fetch_all(&mut conn)
        .await?;
    for row in &incidencias {
        let descripcion: Option<String> = row.try_get("Descripcion")?;
        let fecha: Option<DateTime<Utc>> = row.try_get("Fecha")?;
        info!(
            "  Incidencia: {:?} ({:?})",
            descripcion,
            fecha.map(|f| f.format("%Y-%m-%d %H:%M:%S").to_string())
        );
    }

    info!("QUERY 3: report count");
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ReportesNube")
        .fetch_one(&mut conn)
        .await?;
    info!("  Total: {}", total);

    conn.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::{MySql, Type};

    #[test]
    fn test_reporte_serializes_fecha_as_text() {
        let reporte = Reporte {
            id: 2,
            tipo: Some("Incidencia".to_string()),
            descripcion: Some("Caída del servidor principal".to_string()),
            fecha: NaiveDate::from_ymd_opt(2025, 2, 3)
                .unwrap()
                .and_hms_opt(4, 5, 6)
                .map(|naive| naive.and_utc()),
        };

        let value = serde_json::to_value(&reporte).unwrap();

        assert_eq!(value["ID"], 2);
        assert_eq!(value["Tipo"], "Incidencia");
        assert_eq!(value["Fecha"], "2025-02-03 04:05:06");
    }

    #[test]
    fn test_fecha_decodes_from_timestamp_column() {
        let timestamp = <DateTime<Utc> as Type<MySql>>::type_info();
        assert!(<Option<DateTime<Utc>> as Type<MySql>>::compatible(&timestamp));
    }
}
