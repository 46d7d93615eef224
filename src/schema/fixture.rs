//! Small fixed dataset and the REGISTRO_TIEMPO table used by the Redis demos.

use crate::error::Result;
use crate::pool::StoreConnector;
use crate::schema::ddl::REGISTRO_TIEMPO_SQL;
use crate::schema::mysql::MySqlSchema;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Connection, Row};
use tracing::{info, warn};

/// Row counts reported before the Redis duration pipeline runs.
#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub counts: Vec<TableCount>,
    pub has_services: bool,
}

impl RegistryStatus {
    fn from_counts(counts: Vec<TableCount>) -> Self {
        let has_services = counts
            .iter()
            .find(|c| c.table == "SERVICIO")
            .and_then(|c| c.rows)
            .map(|rows| rows > 0)
            .unwrap_or(false);

        Self {
            counts,
            has_services,
        }
    }
}

const CHECKED_TABLES: [&str; 4] = ["USUARIA", "CUIDADOR", "CENTRO", "SERVICIO"];

/// Create REGISTRO_TIEMPO and report how much data the source tables hold.
pub async fn prepare_time_registry(connector: &StoreConnector, db_name: &str) -> Result<RegistryStatus> {
    let mut conn = connector.mysql(Some(db_name)).await?;

    sqlx::raw_sql(REGISTRO_TIEMPO_SQL).execute(&mut conn).await?;
    info!("Table 'REGISTRO_TIEMPO' verified/created");

    let mut counts = Vec::new();
    for table in CHECKED_TABLES {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut conn).await {
            Ok(rows) => {
                info!(" -> Table {}: {} rows", table, rows);
                counts.push(TableCount {
                    table: table.to_string(),
                    rows: Some(rows),
                });
            }
            Err(e) => {
                warn!(" -> Table {}: could not be read ({})", table, e);
                counts.push(TableCount {
                    table: table.to_string(),
                    rows: None,
                });
            }
        }
    }

    conn.close().await?;

    let status = RegistryStatus::from_counts(counts);
    if status.has_services {
        info!("Source data ready: Redis can compute service durations");
    } else {
        warn!("SERVICIO is empty: the duration pipeline will not produce anything");
    }

    Ok(status)
}

struct FixtureUsuaria {
    id: i32,
    nombre: &'static str,
    apellido: &'static str,
    dni: &'static str,
    nacimiento: (i32, u32, u32),
    barrio: &'static str,
    renta_cents: i64,
    telefono: &'static str,
    email: &'static str,
    genero: &'static str,
}

const FIXTURE_USUARIAS: [FixtureUsuaria; 2] = [
    FixtureUsuaria {
        id: 1,
        nombre: "Ana",
        apellido: "García",
        dni: "12345678A",
        nacimiento: (1985, 5, 15),
        barrio: "Centro",
        renta_cents: 2_500_000,
        telefono: "600111222",
        email: "ana.garcia@email.com",
        genero: "Femenino",
    },
    FixtureUsuaria {
        id: 2,
        nombre: "Luis",
        apellido: "Martínez",
        dni: "87654321B",
        nacimiento: (1990, 11, 20),
        barrio: "Nervión",
        renta_cents: 3_200_000,
        telefono: "600333444",
        email: "luis.martinez@email.com",
        genero: "Masculino",
    },
];

// (id, nombre, apellido, dni, telefono, disponibilidad, especialidad)
const FIXTURE_CUIDADORES: [(i32, &str, &str, &str, &str, &str, &str); 2] = [
    (101, "Carmen", "Ruiz", "11112222C", "650101010", "Lunes-Viernes Mañana", "Geriatría"),
    (102, "Javier", "Sánchez", "33334444D", "650202020", "Fines de Semana", "Fisioterapia"),
];

// (id, id_usuario, nombre, apellido, tipo, nacimiento, perfil)
const FIXTURE_DEPENDIENTES: [(i32, i32, &str, &str, &str, (i32, u32, u32), &str); 2] = [
    (1, 1, "Elena", "García", "Grado III", (1950, 3, 10), "Hipertensión"),
    (2, 1, "Marcos", "García", "Grado I", (2015, 1, 25), "Asma"),
];

// (id, nombre, direccion, descripcion, capacidad)
const FIXTURE_CENTROS: [(i32, &str, &str, &str, i32); 1] =
    [(1, "Centro de Día Sol", "Calle Sol 10", "Centro de día para mayores", 50)];

fn date((y, m, d): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FixtureSummary {
    pub usuarias: usize,
    pub cuidadores: usize,
    pub dependientes: usize,
    pub centros: usize,
}

/// Create the database and tables if missing, then wipe them and load the fixed sample rows.
///
/// The structure is created first so the fixture also works on a fresh server.
pub async fn install_fixture(connector: &StoreConnector, db_name: &str) -> Result<FixtureSummary> {
    MySqlSchema::new().create(connector, db_name).await?;

    let mut conn = connector.mysql(Some(db_name)).await?;

    info!("Cleaning old data and inserting the sample rows...");
    MySqlSchema::new().truncate_all(&mut conn, &[]).await?;

    let mut tx = conn.begin().await?;

    for u in &FIXTURE_USUARIAS {
        sqlx::query("INSERT INTO USUARIA VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(u.id)
            .bind(u.nombre)
            .bind(u.apellido)
            .bind(u.dni)
            .bind(date(u.nacimiento))
            .bind(u.barrio)
            .bind(Decimal::new(u.renta_cents, 2))
            .bind(u.telefono)
            .bind(u.email)
            .bind(u.genero)
            .execute(&mut *tx)
            .await?;
    }

    for (id, nombre, apellido, dni, telefono, disponibilidad, especialidad) in FIXTURE_CUIDADORES {
        sqlx::query("INSERT INTO CUIDADOR VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(nombre)
            .bind(apellido)
            .bind(dni)
            .bind(telefono)
            .bind(disponibilidad)
            .bind(especialidad)
            .execute(&mut *tx)
            .await?;
    }

    for (id, id_usuario, nombre, apellido, tipo, nacimiento, perfil) in FIXTURE_DEPENDIENTES {
        sqlx::query("INSERT INTO DEPENDIENTE VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(id_usuario)
            .bind(nombre)
            .bind(apellido)
            .bind(tipo)
            .bind(date(nacimiento))
            .bind(perfil)
            .execute(&mut *tx)
            .await?;
    }

    for (id, nombre, direccion, descripcion, capacidad) in FIXTURE_CENTROS {
        sqlx::query("INSERT INTO CENTRO VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(nombre)
            .bind(direccion)
            .bind(descripcion)
            .bind(capacidad)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let summary = FixtureSummary {
        usuarias: FIXTURE_USUARIAS.len(),
        cuidadores: FIXTURE_CUIDADORES.len(),
        dependientes: FIXTURE_DEPENDIENTES.len(),
        centros: FIXTURE_CENTROS.len(),
    };
    info!(
        "Inserted {} usuarias, {} cuidadores, {} dependientes, {} centros",
        summary.usuarias, summary.cuidadores, summary.dependientes, summary.centros
    );

    info!("Checking USUARIA contents:");
    let rows = sqlx::query("SELECT IDUsuario, Nombre, Apellido, Email FROM USUARIA ORDER BY IDUsuario")
        .fetch_all(&mut conn)
        .await?;
    for row in rows {
        let id: i32 = row.try_get("IDUsuario")?;
        let nombre: String = row.try_get("Nombre")?;
        let apellido: String = row.try_get("Apellido")?;
        let email: Option<String> = row.try_get("Email")?;
        info!("  ({}, {}, {}, {:?})", id, nombre, apellido, email);
    }

    conn.close().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_status_detects_services() {
        let status = RegistryStatus::from_counts(vec![
            TableCount { table: "USUARIA".into(), rows: Some(3) },
            TableCount { table: "SERVICIO".into(), rows: Some(0) },
        ]);
        assert!(!status.has_services);

        let status = RegistryStatus::from_counts(vec![TableCount {
            table: "SERVICIO".into(),
            rows: Some(12),
        }]);
        assert!(status.has_services);

        let status = RegistryStatus::from_counts(vec![TableCount {
            table: "SERVICIO".into(),
            rows: None,
        }]);
        assert!(!status.has_services);
    }

    #[test]
    fn test_fixture_references_are_consistent() {
        let usuaria_ids: Vec<i32> = FIXTURE_USUARIAS.iter().map(|u| u.id).collect();
        for (_, id_usuario, ..) in FIXTURE_DEPENDIENTES {
            assert!(usuaria_ids.contains(&id_usuario));
        }
        for u in &FIXTURE_USUARIAS {
            assert!(date(u.nacimiento).is_some());
        }
    }
}
