//! Guided tour of Redis features, fed from the MySQL care center data.

use crate::cache::keys::{self, HISTORIAL_USUARIO_1, SERVICIOS_INDEX, SERVICIO_PREFIX, USUARIO_NOMBRE_PATTERN};
use crate::cache::reply::{parse_aggregate, parse_search};
use crate::cache::source::fetch_servicios;
use crate::error::Result;
use crate::pool::StoreConnector;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::{Connection, Row};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

fn banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("  {}", title.to_uppercase());
    info!("{}", "=".repeat(60));
}

/// Keys whose value contains `needle`; `values` is the MGET reply for `keys`.
pub fn keys_with_value(keys: &[String], values: &[Option<String>], needle: &str) -> Vec<String> {
    keys.iter()
        .zip(values)
        .filter(|(_, value)| value.as_deref().is_some_and(|v| v.contains(needle)))
        .map(|(key, _)| key.clone())
        .collect()
}

/// One line per FT.AGGREGATE group.
pub fn describe_group(row: &HashMap<String, String>) -> String {
    let number = |name: &str| row.get(name).and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0);

    format!(
        "{}: {} servicios, {:.2}€, {:.1} min avg",
        row.get("centro").map(String::as_str).unwrap_or("Desconocido"),
        row.get("conteo").map(String::as_str).unwrap_or("0"),
        number("ingresos_totales"),
        number("duracion_media"),
    )
}

async fn sorted_keys(con: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>> {
    let mut found: Vec<String> = con.keys(pattern).await?;
    found.sort();
    Ok(found)
}

async fn mget(con: &mut ConnectionManager, keys: &[String]) -> Result<Vec<Option<String>>> {
    // Explicit MGET: the helper sends GET for a single key and the reply shape changes
    let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(con).await?;
    Ok(values)
}

async fn copy_usuarios(connector: &StoreConnector, con: &mut ConnectionManager) -> Result<usize> {
    let mut conn = connector.mysql(Some(&connector.config().db_name)).await?;
    let rows = sqlx::query("SELECT IDUsuario, Nombre, Apellido, DNI FROM USUARIA LIMIT 10")
        .fetch_all(&mut conn)
        .await?;
    conn.close().await?;

    let mut pipe = redis::pipe();
    for row in &rows {
        let id: i32 = row.try_get("IDUsuario")?;
        let nombre: Option<String> = row.try_get("Nombre")?;
        let apellido: Option<String> = row.try_get("Apellido")?;
        let dni: String = row.try_get("DNI")?;

        pipe.set(keys::usuario_field(id, "nombre"), nombre.unwrap_or_default()).ignore();
        pipe.set(keys::usuario_field(id, "apellido"), apellido.unwrap_or_default()).ignore();
        pipe.set(keys::usuario_field(id, "dni"), dni).ignore();
    }
    pipe.query_async::<()>(con).await?;

    Ok(rows.len())
}

async fn load_servicio_documents(connector: &StoreConnector, con: &mut ConnectionManager) -> Result<usize> {
    let mut conn = connector.mysql(Some(&connector.config().db_name)).await?;
    let servicios = fetch_servicios(&mut conn, false).await?;
    conn.close().await?;

    let mut pipe = redis::pipe();
    for servicio in &servicios {
        pipe.cmd("JSON.SET")
            .arg(keys::servicio(servicio.id))
            .arg("$")
            .arg(servicio.to_document().to_string())
            .ignore();
    }
    pipe.query_async::<()>(con).await?;

    Ok(servicios.len())
}

async fn create_servicios_index(con: &mut ConnectionManager) -> Result<()> {
    if let Err(e) = redis::cmd("FT.DROPINDEX")
        .arg(SERVICIOS_INDEX)
        .query_async::<()>(con)
        .await
    {
        info!("  -> No previous index to drop ({})", e);
    }

    redis::cmd("FT.CREATE")
        .arg(SERVICIOS_INDEX)
        .arg(&["ON", "JSON", "PREFIX", "1", SERVICIO_PREFIX, "SCHEMA"])
        .arg(&["$.usuario", "AS", "usuario", "TEXT"])
        .arg(&["$.centro", "AS", "centro", "TAG"])
        .arg(&["$.precio", "AS", "precio", "NUMERIC", "SORTABLE"])
        .arg(&["$.duracion_minutos", "AS", "duracion", "NUMERIC", "SORTABLE"])
        .query_async::<()>(con)
        .await?;

    Ok(())
}

async fn group_by_centro(con: &mut ConnectionManager) -> Result<Vec<String>> {
    let reply: redis::Value = redis::cmd("FT.AGGREGATE")
        .arg(SERVICIOS_INDEX)
        .arg("*")
        .arg(&["GROUPBY", "1", "@centro"])
        .arg(&["REDUCE", "COUNT", "0", "AS", "conteo"])
        .arg(&["REDUCE", "SUM", "1", "@precio", "AS", "ingresos_totales"])
        .arg(&["REDUCE", "AVG", "1", "@duracion", "AS", "duracion_media"])
        .arg(&["SORTBY", "2", "@conteo", "DESC"])
        .query_async(con)
        .await?;

    Ok(parse_aggregate(&reply)?.iter().map(describe_group).collect())
}

/// Run the twenty walkthrough steps in order against a flushed Redis.
pub async fn run(connector: &StoreConnector) -> Result<()> {
    let mut con = connector.redis().await?;
    let r = &mut con;

    banner("Limpieza inicial");
    redis::cmd("FLUSHALL").query_async::<()>(r).await?;
    info!("  -> Redis flushed");

    banner("1. Crear registros clave-valor (desde MySQL)");
    let copied = copy_usuarios(connector, r).await?;
    if copied == 0 {
        warn!("  -> USUARIA is empty in MySQL, run 'populate' first");
    } else {
        info!("  -> {} usuarios copied into simple keys", copied);
    }

    banner("2. Obtener número de claves");
    let total: i64 = redis::cmd("DBSIZE").query_async(r).await?;
    info!("  -> Total keys: {}", total);

    let nombre_1 = keys::usuario_field(1, "nombre");

    banner("3. Obtener registro por clave");
    let value: Option<String> = r.get(&nombre_1).await?;
    info!("  -> {}: {:?}", nombre_1, value);

    banner("4. Actualizar valor");
    let antiguo: Option<String> = r.get(&nombre_1).await?;
    let editado = format!("{} (Editado)", antiguo.clone().unwrap_or_default());
    r.set::<_, _, ()>(&nombre_1, &editado).await?;
    let nuevo: Option<String> = r.get(&nombre_1).await?;
    info!("  -> {:?} -> {:?}", antiguo, nuevo);

    banner("5. Eliminar clave-valor");
    let dni_1 = keys::usuario_field(1, "dni");
    r.del::<_, ()>(&dni_1).await?;
    let exists: bool = r.exists(&dni_1).await?;
    info!("  -> '{}' deleted, exists: {}", dni_1, exists);

    banner("6. Obtener todas las claves");
    let nombre_keys = sorted_keys(r, USUARIO_NOMBRE_PATTERN).await?;
    info!("  -> {} keys, first: {:?}", nombre_keys.len(), &nombre_keys[..nombre_keys.len().min(3)]);

    banner("7. Obtener todos los valores");
    let nombres = if nombre_keys.is_empty() {
        Vec::new()
    } else {
        mget(r, &nombre_keys).await?
    };
    info!("  -> Nombres: {:?} ...", &nombres[..nombres.len().min(5)]);

    banner("8. Patrón * (asterisco)");
    info!("  -> {:?}", sorted_keys(r, "centro:usuario:2:*").await?);

    banner("9. Patrón [] (rango)");
    info!("  -> {:?}", sorted_keys(r, "centro:usuario:[1-3]:nombre").await?);

    banner("10. Patrón ? (interrogación)");
    info!("  -> {} single-digit ids", sorted_keys(r, "centro:usuario:?:nombre").await?.len());

    banner("11. Filtrar por valor");
    info!("  -> Usuarios 'Ana': {:?}", keys_with_value(&nombre_keys, &nombres, "Ana"));

    banner("12. Actualizar por filtro");
    for key in sorted_keys(r, "centro:usuario:[1-2]:apellido").await? {
        let antiguo: Option<String> = r.get(&key).await?;
        r.set::<_, _, ()>(&key, format!("VIP {}", antiguo.unwrap_or_default()))
            .await?;
    }
    info!("  -> Apellidos updated");

    banner("13. Eliminar por filtro");
    r.set::<_, _, ()>("temp:borrame", "1").await?;
    let temp = sorted_keys(r, "temp:*").await?;
    if !temp.is_empty() {
        let deleted: i64 = r.del(&temp).await?;
        info!("  -> {} keys deleted", deleted);
    }

    banner("14. Crear JSON (desde MySQL)");
    let loaded = load_servicio_documents(connector, r).await?;
    info!("  -> {} servicios loaded as JSON documents", loaded);

    banner("15. Filtrar JSON por atributo");
    let partial: Option<String> = redis::cmd("JSON.GET")
        .arg(keys::servicio(1))
        .arg("$.precio")
        .arg("$.usuario")
        .query_async(r)
        .await?;
    info!("  -> {}", partial.unwrap_or_else(|| "(missing)".to_string()));

    banner("16. Crear una lista");
    r.del::<_, ()>(HISTORIAL_USUARIO_1).await?;
    r.rpush::<_, _, ()>(HISTORIAL_USUARIO_1, vec![keys::servicio(1), keys::servicio(5)])
        .await?;
    info!("  -> List created");

    banner("17. Obtener elementos de lista");
    let historial: Vec<String> = r.lrange(HISTORIAL_USUARIO_1, 0, -1).await?;
    info!("  -> Historial: {:?}", historial);

    banner("18. Crear índice (RediSearch)");
    create_servicios_index(r).await?;
    info!("  -> Index '{}' created", SERVICIOS_INDEX);
    // Existing keys are indexed in the background
    tokio::time::sleep(Duration::from_secs(1)).await;

    banner("19. Búsqueda con índices");
    let reply: redis::Value = redis::cmd("FT.SEARCH")
        .arg(SERVICIOS_INDEX)
        .arg("@precio:[-inf 80]")
        .arg(&["SORTBY", "precio", "ASC"])
        .query_async(r)
        .await?;
    info!("  -> Found: {}", parse_search(&reply)?.total);

    banner("20. Group by con índices");
    match group_by_centro(r).await {
        Ok(groups) => {
            for line in groups {
                info!("  -> {}", line);
            }
        }
        Err(e) => error!("  -> Aggregation failed: {}", e),
    }

    banner("Fin");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_with_value() {
        let keys = vec![
            "centro:usuario:1:nombre".to_string(),
            "centro:usuario:2:nombre".to_string(),
            "centro:usuario:3:nombre".to_string(),
        ];
        let values = vec![Some("Ana (Editado)".to_string()), None, Some("Luis".to_string())];

        assert_eq!(keys_with_value(&keys, &values, "Ana"), vec!["centro:usuario:1:nombre"]);
        assert!(keys_with_value(&keys, &values, "Marta").is_empty());
    }

    #[test]
    fn test_describe_group() {
        let row: HashMap<String, String> = [
            ("centro", "Domicilio"),
            ("conteo", "4"),
            ("ingresos_totales", "210.456"),
            ("duracion_media", "150"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(describe_group(&row), "Domicilio: 4 servicios, 210.46€, 150.0 min avg");
        assert_eq!(
            describe_group(&HashMap::new()),
            "Desconocido: 0 servicios, 0.00€, 0.0 min avg"
        );
    }
}
