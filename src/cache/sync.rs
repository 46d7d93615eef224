//! Two-way copy between MySQL and Redis JSON documents.

use crate::cache::keys::{self, SERVICIOS_INDEX};
use crate::cache::reply::{parse_search, SearchDoc};
use crate::error::Result;
use crate::pool::StoreConnector;
use redis::aio::ConnectionManager;
use serde::Deserialize;
use serde_json::json;
use sqlx::mysql::MySqlConnection;
use sqlx::{Connection, Row};
use tracing::{error, info, warn};

pub const MIGRATED_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS redis_servicios_migrados (
    id_servicio INT PRIMARY KEY,
    usuario VARCHAR(200),
    centro VARCHAR(100),
    precio DOUBLE,
    duracion_minutos INT,
    estado VARCHAR(20)
)
"#;

/// Servicio document as stored by the walkthrough under `servicio:{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CachedServicio {
    pub id_servicio: i32,
    pub usuario: String,
    pub centro: String,
    pub precio: f64,
    pub duracion_minutos: i64,
    pub estado: Option<String>,
}

impl CachedServicio {
    /// Search hits on a JSON index carry the whole document under `$`.
    pub fn from_search_doc(doc: &SearchDoc) -> Option<Self> {
        serde_json::from_str(doc.field("$")?).ok()
    }
}

/// Decode every hit, returning the servicios and how many hits could not be read.
fn cached_servicios(docs: &[SearchDoc]) -> (Vec<CachedServicio>, usize) {
    let servicios: Vec<CachedServicio> = docs.iter().filter_map(CachedServicio::from_search_doc).collect();
    let skipped = docs.len() - servicios.len();
    (servicios, skipped)
}

#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub usuarias: usize,
    pub cuidadores: usize,
    pub servicios_migrados: usize,
}

async fn mysql_to_redis(conn: &mut MySqlConnection, con: &mut ConnectionManager) -> Result<(usize, usize)> {
    let usuarias = sqlx::query("SELECT IDUsuario, Nombre, Apellido, Barrio, Email FROM USUARIA")
        .fetch_all(&mut *conn)
        .await?;
    let cuidadores = sqlx::query("SELECT IDCuidador, Nombre, Apellido, Especialidad FROM CUIDADOR")
        .fetch_all(&mut *conn)
        .await?;

    let mut pipe = redis::pipe();

    for row in &usuarias {
        let id: i32 = row.try_get("IDUsuario")?;
        let doc = json!({
            "IDUsuario": id,
            "Nombre": row.try_get::<Option<String>, _>("Nombre")?,
            "Apellido": row.try_get::<Option<String>, _>("Apellido")?,
            "Barrio": row.try_get::<Option<String>, _>("Barrio")?,
            "Email": row.try_get::<Option<String>, _>("Email")?,
        });
        pipe.cmd("JSON.SET").arg(keys::usuaria_sql(id)).arg("$").arg(doc.to_string()).ignore();
    }

    for row in &cuidadores {
        let id: i32 = row.try_get("IDCuidador")?;
        let doc = json!({
            "IDCuidador": id,
            "Nombre": row.try_get::<Option<String>, _>("Nombre")?,
            "Apellido": row.try_get::<Option<String>, _>("Apellido")?,
            "Especialidad": row.try_get::<Option<String>, _>("Especialidad")?,
        });
        pipe.cmd("JSON.SET").arg(keys::cuidador_sql(id)).arg("$").arg(doc.to_string()).ignore();
    }

    if usuarias.is_empty() && cuidadores.is_empty() {
        warn!("No USUARIA or CUIDADOR rows in MySQL to copy");
        return Ok((0, 0));
    }

    pipe.query_async::<()>(con).await?;
    Ok((usuarias.len(), cuidadores.len()))
}

async fn redis_to_mysql(
    conn: &mut MySqlConnection,
    con: &mut ConnectionManager,
    centro: &str,
) -> Result<usize> {
    let query = format!("@centro:{{{}}}", keys::escape_tag(centro));
    let reply: redis::Value = redis::cmd("FT.SEARCH")
        .arg(SERVICIOS_INDEX)
        .arg(&query)
        .arg(&["LIMIT", "0", "100"])
        .query_async(con)
        .await?;

    let parsed = parse_search(&reply)?;
    if parsed.total == 0 {
        info!("No documents for centro '{}' in '{}' (run the walkthrough first)", centro, SERVICIOS_INDEX);
        return Ok(0);
    }

    let (servicios, skipped) = cached_servicios(&parsed.docs);
    if skipped > 0 {
        warn!("Skipped {} of {} cached servicios that could not be decoded", skipped, parsed.docs.len());
    }

    sqlx::raw_sql(MIGRATED_TABLE_SQL).execute(&mut *conn).await?;

    let mut tx = conn.begin().await?;
    for s in &servicios {
        sqlx::query(
            "INSERT INTO redis_servicios_migrados (id_servicio, usuario, centro, precio, duracion_minutos, estado)
             VALUES (?, ?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                 usuario = VALUES(usuario),
                 centro = VALUES(centro),
                 precio = VALUES(precio),
                 duracion_minutos = VALUES(duracion_minutos),
                 estado = VALUES(estado)",
        )
        .bind(s.id_servicio)
        .bind(&s.usuario)
        .bind(&s.centro)
        .bind(s.precio)
        .bind(s.duracion_minutos)
        .bind(&s.estado)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(servicios.len())
}

/// Mirror USUARIA and CUIDADOR into Redis, then copy the cached servicios of `centro` into MySQL.
///
/// Each direction is independent: a failure in one is logged and the other still runs.
pub async fn run(connector: &StoreConnector, centro: &str) -> Result<SyncSummary> {
    let mut conn = connector.mysql(Some(&connector.config().db_name)).await?;
    let mut con = connector.redis().await?;
    let mut summary = SyncSummary::default();

    info!("21. MySQL -> Redis: USUARIA and CUIDADOR as JSON documents");
    match mysql_to_redis(&mut conn, &mut con).await {
        Ok((usuarias, cuidadores)) => {
            info!("  -> {} usuarias and {} cuidadores copied", usuarias, cuidadores);
            summary.usuarias = usuarias;
            summary.cuidadores = cuidadores;
        }
        Err(e) => error!("  -> MySQL -> Redis failed: {}", e),
    }

    info!("22. Redis -> MySQL: servicios of centro '{}'", centro);
    match redis_to_mysql(&mut conn, &mut con, centro).await {
        Ok(count) => {
            info!("  -> {} servicios stored in 'redis_servicios_migrados'", count);
            summary.servicios_migrados = count;
        }
        Err(e) => error!("  -> Redis -> MySQL failed: {}", e),
    }

    conn.close().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cached_servicio_from_search_doc() {
        let mut fields = HashMap::new();
        fields.insert(
            "$".to_string(),
            r#"{"id_servicio":3,"usuario":"Ana García","cuidador":"Sin Asignar","especialidad":"General","centro":"Domicilio","precio":45.5,"duracion_minutos":120,"estado":"Completado"}"#
                .to_string(),
        );
        let doc = SearchDoc {
            id: "servicio:3".to_string(),
            fields,
        };

        let servicio = CachedServicio::from_search_doc(&doc).unwrap();

        assert_eq!(servicio.id_servicio, 3);
        assert_eq!(servicio.centro, "Domicilio");
        assert_eq!(servicio.precio, 45.5);
        assert_eq!(servicio.estado.as_deref(), Some("Completado"));
    }

    #[test]
    fn test_cached_servicio_without_payload() {
        let doc = SearchDoc {
            id: "servicio:3".to_string(),
            fields: HashMap::new(),
        };
        assert!(CachedServicio::from_search_doc(&doc).is_none());
    }

    #[test]
    fn test_cached_servicios_counts_undecodable_hits() {
        let doc = |id: &str, payload: &str| SearchDoc {
            id: id.to_string(),
            fields: HashMap::from([("$".to_string(), payload.to_string())]),
        };
        let docs = vec![
            doc(
                "servicio:1",
                r#"{"id_servicio":1,"usuario":"Ana García","centro":"Domicilio","precio":30.0,"duracion_minutos":60,"estado":null}"#,
            ),
            doc("servicio:2", r#"{"id_servicio":"dos"}"#),
            SearchDoc {
                id: "servicio:3".to_string(),
                fields: HashMap::new(),
            },
        ];

        let (servicios, skipped) = cached_servicios(&docs);

        assert_eq!(servicios.len(), 1);
        assert_eq!(servicios[0].id_servicio, 1);
        assert_eq!(skipped, 2);
    }
}
