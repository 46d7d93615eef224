//! Joins DynamoDB users and RDS reports into a single JSON report.

use crate::cloud::dynamo;
use crate::cloud::rds::{fetch_reportes, Reporte};
use crate::error::Result;
use crate::pool::StoreConnector;
use crate::report::export::write_json;
use serde_json::{json, Value};
use sqlx::Connection;
use std::path::PathBuf;
use tracing::{error, info};

pub const OUTPUT_FILE: &str = "aws_integration_result.json";
pub const ORIGEN: &str = "AWS Lab Integration";

const PREVIEW_CHARS: usize = 500;

pub fn build_report(usuarios: &[Value], reportes: &[Reporte]) -> Value {
    json!({
        "origen": ORIGEN,
        "estadisticas": {
            "total_usuarios_activos_dynamo": usuarios.len(),
            "total_reportes_rds": reportes.len(),
        },
        "datos": {
            "usuarios_cloud": usuarios,
            "reportes_sistema": reportes,
        },
    })
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn reportes_from_rds(connector: &StoreConnector) -> Result<Vec<Reporte>> {
    let db_name = connector.config().rds.database.clone();
    let mut conn = connector.rds(Some(&db_name)).await?;
    let reportes = fetch_reportes(&mut conn).await?;
    conn.close().await?;
    Ok(reportes)
}

/// Write the integration report. A source that fails contributes an empty list.
pub async fn run(connector: &StoreConnector) -> Result<PathBuf> {
    info!("--- STARTING AWS DATA INTEGRATION ---");

    // Without an RDS host there is nothing to integrate
    connector.config().rds.server()?;

    info!(" -> Querying DynamoDB (active users)...");
    let client = connector.dynamo().await;
    let usuarios = match dynamo::active_users(&client).await {
        Ok(items) => items,
        Err(e) => {
            error!("DynamoDB error: {}", e);
            Vec::new()
        }
    };

    info!(" -> Querying RDS (reports)...");
    let reportes = match reportes_from_rds(connector).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("RDS error: {}", e);
            Vec::new()
        }
    };

    let report = build_report(&usuarios, &reportes);
    let path = connector.config().output_path(OUTPUT_FILE);
    write_json(&path, &report)?;

    let pretty = serde_json::to_string_pretty(&report)?;
    info!("Partial content:\n{}...", preview(&pretty, PREVIEW_CHARS));

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_report() {
        let usuarios = vec![json!({ "UsuarioID": "U100", "Estado": "Activo" })];
        let reportes = vec![Reporte {
            id: 1,
            tipo: Some("Mensual".to_string()),
            descripcion: Some("Reporte de ingresos enero".to_string()),
            fecha: None,
        }];

        let report = build_report(&usuarios, &reportes);

        assert_eq!(report["origen"], "AWS Lab Integration");
        assert_eq!(report["estadisticas"]["total_usuarios_activos_dynamo"], 1);
        assert_eq!(report["estadisticas"]["total_reportes_rds"], 1);
        assert_eq!(report["datos"]["usuarios_cloud"][0]["UsuarioID"], "U100");
        assert_eq!(report["datos"]["reportes_sistema"][0]["Tipo"], "Mensual");
    }

    #[test]
    fn test_empty_sources() {
        let report = build_report(&[], &[]);
        assert_eq!(report["estadisticas"]["total_reportes_rds"], 0);
        assert_eq!(report["datos"]["usuarios_cloud"], json!([]));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("Caída", 3), "Caí");
        assert_eq!(preview("abc", 10), "abc");
    }
}
