//! Service durations computed from MySQL, filtered by RediSearch, and written back to REGISTRO_TIEMPO.

use crate::cache::keys::{self, TIEMPOS_INDEX, TIEMPO_PREFIX};
use crate::cache::reply::{parse_search, SearchDoc};
use crate::cache::source::fetch_servicios;
use crate::error::Result;
use crate::pool::StoreConnector;
use crate::schema::ddl::REGISTRO_TIEMPO_SQL;
use redis::aio::ConnectionManager;
use sqlx::mysql::MySqlConnection;
use sqlx::{Connection, Row};
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on search results migrated in one run.
const SEARCH_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub id_servicio: i32,
    pub usuario: String,
    pub cuidador: String,
    pub centro: String,
    pub duracion_minutos: i32,
}

impl TimeRecord {
    /// Rebuild a record from a hash returned by FT.SEARCH; the id comes from the key.
    pub fn from_search_doc(doc: &SearchDoc) -> Option<Self> {
        Some(Self {
            id_servicio: keys::trailing_id(&doc.id).parse().ok()?,
            usuario: doc.field("usuario").unwrap_or_default().to_string(),
            cuidador: doc.field("cuidador").unwrap_or_default().to_string(),
            centro: doc.field("centro").unwrap_or_default().to_string(),
            duracion_minutos: doc.field("duracion")?.parse().ok()?,
        })
    }
}

async fn load_hashes(conn: &mut MySqlConnection, con: &mut ConnectionManager) -> Result<usize> {
    let servicios = fetch_servicios(conn, true).await?;
    if servicios.is_empty() {
        return Ok(0);
    }

    let mut pipe = redis::pipe();
    for servicio in &servicios {
        pipe.hset_multiple(keys::tiempo_servicio(servicio.id), &servicio.to_hash_fields())
            .ignore();
    }
    pipe.query_async::<()>(con).await?;

    Ok(servicios.len())
}

async fn create_index(con: &mut ConnectionManager) -> Result<()> {
    if let Err(e) = redis::cmd("FT.DROPINDEX")
        .arg(TIEMPOS_INDEX)
        .query_async::<()>(con)
        .await
    {
        info!("No previous '{}' index ({})", TIEMPOS_INDEX, e);
    }

    redis::cmd("FT.CREATE")
        .arg(TIEMPOS_INDEX)
        .arg(&["ON", "HASH", "PREFIX", "1", TIEMPO_PREFIX, "SCHEMA"])
        .arg(&["duracion", "NUMERIC", "SORTABLE"])
        .arg(&["centro", "TEXT", "SORTABLE"])
        .arg(&["usuario", "TEXT", "SORTABLE"])
        .query_async::<()>(con)
        .await?;

    info!("Index '{}' created", TIEMPOS_INDEX);
    Ok(())
}

async fn search_positive(con: &mut ConnectionManager) -> Result<Vec<TimeRecord>> {
    let reply: redis::Value = redis::cmd("FT.SEARCH")
        .arg(TIEMPOS_INDEX)
        .arg("@duracion:[(0 +inf]")
        .arg(&["SORTBY", "duracion", "DESC"])
        .arg("LIMIT")
        .arg(0)
        .arg(SEARCH_LIMIT)
        .query_async(con)
        .await?;

    let parsed = parse_search(&reply)?;
    info!("Redis found {} services with duration > 0", parsed.total);

    Ok(parsed.docs.iter().filter_map(TimeRecord::from_search_doc).collect())
}

async fn upsert_records(conn: &mut MySqlConnection, records: &[TimeRecord]) -> Result<u64> {
    let mut tx = conn.begin().await?;
    let mut affected = 0;

    for record in records {
        let result = sqlx::query(
            "INSERT INTO REGISTRO_TIEMPO
                 (IDServicioOriginal, NombreUsuario, NombreCuidador, NombreCentro, DuracionMinutos, FechaCalculo)
             VALUES (?, ?, ?, ?, ?, NOW())
             ON DUPLICATE KEY UPDATE DuracionMinutos = VALUES(DuracionMinutos), FechaCalculo = NOW()",
        )
        .bind(record.id_servicio)
        .bind(&record.usuario)
        .bind(&record.cuidador)
        .bind(&record.centro)
        .bind(record.duracion_minutos)
        .execute(&mut *tx)
        .await?;
        affected += result.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

async fn log_sample(conn: &mut MySqlConnection) -> Result<()> {
    let rows = sqlx::query(
        "SELECT IDServicioOriginal, NombreUsuario, NombreCuidador, NombreCentro, DuracionMinutos
         FROM REGISTRO_TIEMPO ORDER BY DuracionMinutos DESC LIMIT 5",
    )
    .fetch_all(&mut *conn)
    .await?;

    info!("--- REGISTRO_TIEMPO sample ---");
    for row in &rows {
        let id: Option<i32> = row.try_get("IDServicioOriginal")?;
        let usuario: Option<String> = row.try_get("NombreUsuario")?;
        let cuidador: Option<String> = row.try_get("NombreCuidador")?;
        let centro: Option<String> = row.try_get("NombreCentro")?;
        let minutos: Option<i32> = row.try_get("DuracionMinutos")?;
        info!("  {:?} | {:?} | {:?} | {:?} | {:?} min", id, usuario, cuidador, centro, minutos);
    }
    Ok(())
}

/// Returns the number of rows written to REGISTRO_TIEMPO.
pub async fn run(connector: &StoreConnector) -> Result<usize> {
    let mut conn = connector.mysql(Some(&connector.config().db_name)).await?;
    let mut con = connector.redis().await?;

    sqlx::raw_sql(REGISTRO_TIEMPO_SQL).execute(&mut conn).await?;

    info!("STEP 1: loading finished services from MySQL into Redis hashes...");
    let loaded = load_hashes(&mut conn, &mut con).await?;
    if loaded == 0 {
        warn!("No services in MySQL to load");
        conn.close().await?;
        return Ok(0);
    }
    info!("{} records loaded under '{}*'", loaded, TIEMPO_PREFIX);

    info!("STEP 2: creating the search index...");
    create_index(&mut con).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    info!("STEP 3: querying Redis and migrating the result to MySQL...");
    let records = search_positive(&mut con).await?;
    if records.is_empty() {
        conn.close().await?;
        return Ok(0);
    }

    let affected = upsert_records(&mut conn, &records).await?;
    info!("{} rows affected in REGISTRO_TIEMPO", affected);

    log_sample(&mut conn).await?;
    conn.close().await?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(id: &str, fields: &[(&str, &str)]) -> SearchDoc {
        SearchDoc {
            id: id.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_time_record_from_search_doc() {
        let record = TimeRecord::from_search_doc(&doc(
            "datos_mysql:servicio:17",
            &[("usuario", "Ana"), ("cuidador", "Sin Asignar"), ("centro", "Domicilio"), ("duracion", "240")],
        ))
        .unwrap();

        assert_eq!(record.id_servicio, 17);
        assert_eq!(record.usuario, "Ana");
        assert_eq!(record.duracion_minutos, 240);
    }

    #[test]
    fn test_time_record_requires_id_and_duration() {
        assert!(TimeRecord::from_search_doc(&doc("datos_mysql:servicio:x", &[("duracion", "5")])).is_none());
        assert!(TimeRecord::from_search_doc(&doc("datos_mysql:servicio:3", &[("usuario", "Ana")])).is_none());
    }
}
