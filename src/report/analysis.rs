//! Service quality against gender and income, from the MySQL store.

use crate::error::Result;
use crate::model::decimal_to_f64;
use crate::pool::StoreConnector;
use crate::report::export::{iso_timestamp, write_json};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Connection, Row};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

pub const OUTPUT_FILE: &str = "datos_analisis.json";

const DESCRIPTION: &str = "Análisis discriminante que cruza variables socioeconómicas (Género, Renta) con la Calidad del Servicio (Puntuación) y el Costo (Precio/Subvención).";

const UNSPECIFIED_GENDER: &str = "No especificado";

const ANALYSIS_QUERY: &str = r#"
    SELECT
        U.IDUsuario,
        U.Barrio,
        U.RentaPercapita,
        U.Genero,
        S.PrecioFinal,
        S.SubvencionAplicada,
        R.Puntuacion,
        D.TipoDependencia
    FROM USUARIA U
    JOIN SERVICIO S ON U.IDUsuario = S.IDUsuario
    JOIN DEPENDIENTE D ON S.IDDependiente = D.IDDependiente
    LEFT JOIN RESENA R ON S.IDServicio = R.IDServicio
    WHERE S.Estado = 'Completado' AND R.Puntuacion IS NOT NULL
"#;

/// One completed and reviewed service with the usuaria's demographics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisRow {
    #[serde(rename = "IDUsuario")]
    pub id_usuario: i32,
    pub barrio: Option<String>,
    pub renta_percapita: Option<f64>,
    pub genero: Option<String>,
    pub precio_final: Option<f64>,
    pub subvencion_aplicada: Option<f64>,
    pub puntuacion: Option<i32>,
    pub tipo_dependencia: Option<String>,
}

impl AnalysisRow {
    fn from_row(row: &MySqlRow) -> Result<Self> {
        let decimal = |name: &str| -> Result<Option<f64>> {
            let value: Option<Decimal> = row.try_get(name)?;
            Ok(value.map(decimal_to_f64))
        };

        Ok(Self {
            id_usuario: row.try_get("IDUsuario")?,
            barrio: row.try_get("Barrio")?,
            renta_percapita: decimal("RentaPercapita")?,
            genero: row.try_get("Genero")?,
            precio_final: decimal("PrecioFinal")?,
            subvencion_aplicada: decimal("SubvencionAplicada")?,
            puntuacion: row.try_get("Puntuacion")?,
            tipo_dependencia: row.try_get("TipoDependencia")?,
        })
    }
}

pub fn rent_group(renta: f64) -> &'static str {
    if renta < 20000.0 {
        "Baja"
    } else if renta <= 40000.0 {
        "Media"
    } else {
        "Alta"
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn averages(groups: BTreeMap<String, Vec<i32>>) -> BTreeMap<String, f64> {
    groups
        .into_iter()
        .filter(|(_, scores)| !scores.is_empty())
        .map(|(key, scores)| {
            let sum: i64 = scores.iter().map(|&s| s as i64).sum();
            (key, round2(sum as f64 / scores.len() as f64))
        })
        .collect()
}

/// Average puntuación per gender; a missing or empty gender counts as "No especificado".
pub fn average_by_gender(rows: &[AnalysisRow]) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for row in rows {
        let Some(score) = row.puntuacion else {
            continue;
        };
        let gender = match row.genero.as_deref() {
            Some(g) if !g.is_empty() => g.to_string(),
            _ => UNSPECIFIED_GENDER.to_string(),
        };
        groups.entry(gender).or_default().push(score);
    }
    averages(groups)
}

/// Average puntuación per rent group; rows without renta are skipped.
pub fn average_by_rent_group(rows: &[AnalysisRow]) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for row in rows {
        if let (Some(renta), Some(score)) = (row.renta_percapita, row.puntuacion) {
            groups.entry(rent_group(renta).to_string()).or_default().push(score);
        }
    }
    averages(groups)
}

pub fn build_report(rows: &[AnalysisRow], generated_at: NaiveDateTime) -> Value {
    json!({
        "metadata": {
            "fecha_generacion": iso_timestamp(generated_at),
            "descripcion": DESCRIPTION,
            "registros_analizados_con_resena": rows.len(),
        },
        "indicadores_clave_discriminacion": {
            "puntuacion_promedio_por_genero": average_by_gender(rows),
            "puntuacion_promedio_por_grupo_renta": average_by_rent_group(rows),
        },
        "datos_discriminantes_crudos": rows,
    })
}

pub async fn fetch_rows(connector: &StoreConnector, db_name: &str) -> Result<Vec<AnalysisRow>> {
    let mut conn = connector.mysql(Some(db_name)).await?;
    let rows = sqlx::query(ANALYSIS_QUERY).fetch_all(&mut conn).await?;
    conn.close().await?;

    rows.iter().map(AnalysisRow::from_row).collect()
}

/// Query, aggregate and write the analysis file. Returns `None` when there is nothing to analyze.
pub async fn run(connector: &StoreConnector) -> Result<Option<PathBuf>> {
    let config = connector.config();

    info!("-> Fetching completed and reviewed services from MySQL...");
    let rows = fetch_rows(connector, &config.db_name).await?;
    info!("  {} completed and reviewed services", rows.len());

    if rows.is_empty() {
        warn!("No data to analyze, {} not written", OUTPUT_FILE);
        return Ok(None);
    }

    let report = build_report(&rows, chrono::Local::now().naive_local());
    let path = config.output_path(OUTPUT_FILE);
    write_json(&path, &report)?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(genero: Option<&str>, renta: Option<f64>, puntuacion: Option<i32>) -> AnalysisRow {
        AnalysisRow {
            id_usuario: 1,
            barrio: Some("Triana".to_string()),
            renta_percapita: renta,
            genero: genero.map(str::to_string),
            precio_final: Some(45.5),
            subvencion_aplicada: Some(4.5),
            puntuacion,
            tipo_dependencia: Some("Mayor".to_string()),
        }
    }

    #[test]
    fn test_rent_group_boundaries() {
        assert_eq!(rent_group(19999.99), "Baja");
        assert_eq!(rent_group(20000.0), "Media");
        assert_eq!(rent_group(40000.0), "Media");
        assert_eq!(rent_group(40000.01), "Alta");
    }

    #[test]
    fn test_average_by_gender() {
        let rows = vec![
            row(Some("Femenino"), Some(15000.0), Some(5)),
            row(Some("Femenino"), Some(25000.0), Some(4)),
            row(Some("Femenino"), Some(25000.0), Some(4)),
            row(None, Some(50000.0), Some(2)),
            row(Some("Masculino"), None, None),
        ];

        let averages = average_by_gender(&rows);
        assert_eq!(averages.get("Femenino"), Some(&4.33));
        assert_eq!(averages.get("No especificado"), Some(&2.0));
        assert!(!averages.contains_key("Masculino"));
    }

    #[test]
    fn test_average_by_rent_group_omits_empty_groups() {
        let rows = vec![
            row(Some("Femenino"), Some(15000.0), Some(5)),
            row(Some("Femenino"), Some(18000.0), Some(2)),
            row(Some("Femenino"), None, Some(1)),
        ];

        let averages = average_by_rent_group(&rows);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages.get("Baja"), Some(&3.5));
    }

    #[test]
    fn test_build_report_shape() {
        let rows = vec![row(Some("Femenino"), Some(35000.0), Some(4))];
        let at = chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let report = build_report(&rows, at);

        assert_eq!(report["metadata"]["registros_analizados_con_resena"], 1);
        assert_eq!(
            report["indicadores_clave_discriminacion"]["puntuacion_promedio_por_grupo_renta"]["Media"],
            4.0
        );
        let raw = &report["datos_discriminantes_crudos"][0];
        assert_eq!(raw["IDUsuario"], 1);
        assert_eq!(raw["RentaPercapita"], 35000.0);
        assert_eq!(raw["TipoDependencia"], "Mayor");
    }
}
