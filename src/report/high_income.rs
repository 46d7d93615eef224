//! Usuarias above the income threshold, consolidated from the three primary stores.

use crate::error::Result;
use crate::model::decimal_to_f64;
use crate::pool::StoreConnector;
use crate::report::export::{iso_timestamp, write_json};
use crate::schema::USUARIOS;
use bson::{doc, Bson, Document};
use chrono::NaiveDateTime;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{Connection, Row};
use std::path::PathBuf;
use tracing::{error, info};

pub const OUTPUT_FILE: &str = "usuarias_renta_alta.json";
pub const RENT_THRESHOLD: f64 = 30000.0;

fn threshold_decimal() -> Decimal {
    Decimal::new(3_000_000, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighIncomeRecord {
    #[serde(rename = "IDUsuario")]
    pub id_usuario: Option<i64>,
    #[serde(rename = "Nombre", skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(rename = "Apellido", skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
    #[serde(rename = "NombreCompleto", skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
    #[serde(rename = "Genero")]
    pub genero: Option<String>,
    #[serde(rename = "Barrio")]
    pub barrio: Option<String>,
    #[serde(rename = "RentaPercapita")]
    pub renta_percapita: Option<f64>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Fuente")]
    pub fuente: &'static str,
}

async fn from_mysql(connector: &StoreConnector, db_name: &str) -> Result<Vec<HighIncomeRecord>> {
    let mut conn = connector.mysql(Some(db_name)).await?;
    let rows = sqlx::query(
        "SELECT IDUsuario, Nombre, Apellido, Genero, Barrio, RentaPercapita, Email
         FROM USUARIA WHERE RentaPercapita > ?",
    )
    .bind(threshold_decimal())
    .fetch_all(&mut conn)
    .await?;
    conn.close().await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: i32 = row.try_get("IDUsuario")?;
        let renta: Option<Decimal> = row.try_get("RentaPercapita")?;
        records.push(HighIncomeRecord {
            id_usuario: Some(id as i64),
            nombre: row.try_get("Nombre")?,
            apellido: row.try_get("Apellido")?,
            nombre_completo: None,
            genero: row.try_get("Genero")?,
            barrio: row.try_get("Barrio")?,
            renta_percapita: renta.map(decimal_to_f64),
            email: row.try_get("Email")?,
            fuente: "MySQL",
        });
    }
    Ok(records)
}

async fn from_postgres(connector: &StoreConnector, db_name: &str) -> Result<Vec<HighIncomeRecord>> {
    let pool = connector.postgres(db_name).await?;
    let client = pool.get().await?;

    // Unquoted identifiers come back lowercase
    let rows = client
        .query(
            "SELECT IDUsuario, Nombre, Apellido, Genero, Barrio, RentaPercapita, Email
             FROM USUARIA WHERE RentaPercapita > $1",
            &[&threshold_decimal()],
        )
        .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: i32 = row.try_get("idusuario")?;
        let renta: Option<Decimal> = row.try_get("rentapercapita")?;
        records.push(HighIncomeRecord {
            id_usuario: Some(id as i64),
            nombre: row.try_get("nombre")?,
            apellido: row.try_get("apellido")?,
            nombre_completo: None,
            genero: row.try_get("genero")?,
            barrio: row.try_get("barrio")?,
            renta_percapita: renta.map(decimal_to_f64),
            email: row.try_get("email")?,
            fuente: "PostgreSQL",
        });
    }
    Ok(records)
}

fn as_i64(value: Option<&Bson>) -> Option<i64> {
    match value? {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => Some(*v as i64),
        _ => None,
    }
}

fn as_f64(value: Option<&Bson>) -> Option<f64> {
    match value? {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

fn as_string(value: Option<&Bson>) -> Option<String> {
    match value? {
        Bson::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Flatten a projected usuaria document into the SQL-shaped record.
pub fn record_from_document(doc: &Document) -> HighIncomeRecord {
    let sensibles = doc.get_document("DatosSensibles").ok();
    let contacto = doc.get_document("Contacto").ok();

    HighIncomeRecord {
        id_usuario: as_i64(doc.get("IDUsuario")),
        nombre: None,
        apellido: None,
        nombre_completo: as_string(doc.get("NombreCompleto")),
        genero: as_string(sensibles.and_then(|d| d.get("Genero"))),
        barrio: as_string(sensibles.and_then(|d| d.get("Barrio"))),
        renta_percapita: as_f64(sensibles.and_then(|d| d.get("RentaPercapita"))),
        email: as_string(contacto.and_then(|d| d.get("email"))),
        fuente: "MongoDB",
    }
}

async fn from_mongodb(connector: &StoreConnector, db_name: &str) -> Result<Vec<HighIncomeRecord>> {
    let client = connector.mongo().await?;
    let collection = client.database(db_name).collection::<Document>(USUARIOS);

    let docs: Vec<Document> = collection
        .find(doc! { "DatosSensibles.RentaPercapita": { "$gt": RENT_THRESHOLD } })
        .projection(doc! {
            "IDUsuario": 1,
            "NombreCompleto": 1,
            "DatosSensibles.Genero": 1,
            "DatosSensibles.Barrio": 1,
            "DatosSensibles.RentaPercapita": 1,
            "Contacto.email": 1,
            "_id": 0,
        })
        .await?
        .try_collect()
        .await?;

    client.shutdown().await;
    Ok(docs.iter().map(record_from_document).collect())
}

fn or_empty(source: &str, result: Result<Vec<HighIncomeRecord>>) -> Vec<HighIncomeRecord> {
    match result {
        Ok(records) => {
            info!("  {}: {} usuarias found", source, records.len());
            records
        }
        Err(e) => {
            error!("  {} ERROR: {}", source, e);
            Vec::new()
        }
    }
}

pub fn build_report(records: &[HighIncomeRecord], consolidated_at: NaiveDateTime) -> Value {
    json!({
        "metadata": {
            "fecha_consolidacion": iso_timestamp(consolidated_at),
            "criterio_filtro": format!("Renta Percapita Superior a {:.1} €", RENT_THRESHOLD),
            "total_registros_consolidados": records.len(),
        },
        "usuarias_renta_alta": records,
    })
}

/// Query every store, keep whatever succeeded, and write the consolidated file.
pub async fn run(connector: &StoreConnector) -> Result<PathBuf> {
    let config = connector.config();
    let db_name = config.db_name.as_str();

    info!("-> Extracting usuarias with renta > {} from MySQL...", RENT_THRESHOLD);
    let mut records = or_empty("MySQL", from_mysql(connector, db_name).await);

    info!("-> Extracting usuarias with renta > {} from PostgreSQL...", RENT_THRESHOLD);
    records.extend(or_empty("PostgreSQL", from_postgres(connector, db_name).await));

    info!("-> Extracting usuarias with renta > {} from MongoDB...", RENT_THRESHOLD);
    records.extend(or_empty("MongoDB", from_mongodb(connector, db_name).await));

    let report = build_report(&records, chrono::Local::now().naive_local());
    let path = config.output_path(OUTPUT_FILE);
    write_json(&path, &report)?;

    info!("{} records consolidated", records.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabError;

    #[test]
    fn test_record_from_document() {
        let doc = doc! {
            "IDUsuario": 4,
            "NombreCompleto": "Luis Gómez",
            "DatosSensibles": { "Genero": "Masculino", "Barrio": "Centro", "RentaPercapita": 41000.5 },
            "Contacto": { "email": "luis@example.com" },
        };

        let record = record_from_document(&doc);

        assert_eq!(record.id_usuario, Some(4));
        assert_eq!(record.nombre_completo.as_deref(), Some("Luis Gómez"));
        assert_eq!(record.renta_percapita, Some(41000.5));
        assert_eq!(record.email.as_deref(), Some("luis@example.com"));
        assert_eq!(record.fuente, "MongoDB");
    }

    #[test]
    fn test_record_from_partial_document() {
        let record = record_from_document(&doc! { "IDUsuario": 9_i64 });
        assert_eq!(record.id_usuario, Some(9));
        assert!(record.genero.is_none());
        assert!(record.renta_percapita.is_none());
    }

    #[test]
    fn test_failing_source_contributes_nothing() {
        let records = or_empty("PostgreSQL", Err(LabError::connection("PostgreSQL", "refused")));
        assert!(records.is_empty());
    }

    #[test]
    fn test_report_serializes_source_specific_fields() {
        let records = vec![
            HighIncomeRecord {
                id_usuario: Some(1),
                nombre: Some("Ana".to_string()),
                apellido: Some("Ruiz".to_string()),
                nombre_completo: None,
                genero: Some("Femenino".to_string()),
                barrio: Some("Triana".to_string()),
                renta_percapita: Some(35000.0),
                email: Some("ana@example.com".to_string()),
                fuente: "MySQL",
            },
            record_from_document(&doc! { "IDUsuario": 1, "NombreCompleto": "Ana Ruiz" }),
        ];
        let at = chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let report = build_report(&records, at);

        assert_eq!(report["metadata"]["total_registros_consolidados"], 2);
        assert_eq!(
            report["metadata"]["criterio_filtro"],
            "Renta Percapita Superior a 30000.0 €"
        );
        let sql = &report["usuarias_renta_alta"][0];
        assert_eq!(sql["Nombre"], "Ana");
        assert!(sql.get("NombreCompleto").is_none());
        let mongo = &report["usuarias_renta_alta"][1];
        assert_eq!(mongo["NombreCompleto"], "Ana Ruiz");
        assert_eq!(mongo["Fuente"], "MongoDB");
        assert!(mongo.get("Nombre").is_none());
    }
}
