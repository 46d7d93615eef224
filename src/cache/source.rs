use crate::error::Result;
use crate::model::{decimal_to_f64, duration_minutes};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::Row;

pub const SIN_ASIGNAR: &str = "Sin Asignar";
pub const GENERAL: &str = "General";
pub const DOMICILIO: &str = "Domicilio";

const SERVICIO_JOIN: &str = r#"
    SELECT
        s.IDServicio, s.FechaHoraInicio, s.FechaHoraFin, s.PrecioFinal, s.Estado,
        u.Nombre AS NomUsu, u.Apellido AS ApeUsu,
        c.Nombre AS NomCui, c.Especialidad,
        cen.NombreCentro
    FROM SERVICIO s
    LEFT JOIN USUARIA u ON s.IDUsuario = u.IDUsuario
    LEFT JOIN CUIDADOR c ON s.IDCuidador = c.IDCuidador
    LEFT JOIN CENTRO cen ON s.IDCentro = cen.IDCentro
"#;

/// A SERVICIO row joined with the names of the people and place involved.
#[derive(Debug, Clone, Default)]
pub struct ServicioRow {
    pub id: i32,
    pub inicio: Option<NaiveDateTime>,
    pub fin: Option<NaiveDateTime>,
    pub precio_final: Option<Decimal>,
    pub estado: Option<String>,
    pub usuario_nombre: Option<String>,
    pub usuario_apellido: Option<String>,
    pub cuidador_nombre: Option<String>,
    pub especialidad: Option<String>,
    pub centro: Option<String>,
}

impl ServicioRow {
    fn from_row(row: &MySqlRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("IDServicio")?,
            inicio: row.try_get("FechaHoraInicio")?,
            fin: row.try_get("FechaHoraFin")?,
            precio_final: row.try_get("PrecioFinal")?,
            estado: row.try_get("Estado")?,
            usuario_nombre: row.try_get("NomUsu")?,
            usuario_apellido: row.try_get("ApeUsu")?,
            cuidador_nombre: row.try_get("NomCui")?,
            especialidad: row.try_get("Especialidad")?,
            centro: row.try_get("NombreCentro")?,
        })
    }

    pub fn duracion_minutos(&self) -> i64 {
        match (self.inicio, self.fin) {
            (Some(inicio), Some(fin)) => duration_minutes(inicio, fin),
            _ => 0,
        }
    }

    pub fn usuario(&self) -> String {
        format!(
            "{} {}",
            self.usuario_nombre.as_deref().unwrap_or(""),
            self.usuario_apellido.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    pub fn cuidador(&self) -> &str {
        self.cuidador_nombre.as_deref().unwrap_or(SIN_ASIGNAR)
    }

    pub fn centro(&self) -> &str {
        self.centro.as_deref().unwrap_or(DOMICILIO)
    }

    /// JSON document stored under `servicio:{id}`.
    pub fn to_document(&self) -> Value {
        json!({
            "id_servicio": self.id,
            "usuario": self.usuario(),
            "cuidador": self.cuidador(),
            "especialidad": self.especialidad.as_deref().unwrap_or(GENERAL),
            "centro": self.centro(),
            "precio": self.precio_final.map(decimal_to_f64).unwrap_or(0.0),
            "duracion_minutos": self.duracion_minutos(),
            "estado": self.estado,
        })
    }

    /// Hash fields stored under `datos_mysql:servicio:{id}`.
    pub fn to_hash_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("usuario", self.usuario_nombre.clone().unwrap_or_default()),
            ("cuidador", self.cuidador().to_string()),
            ("centro", self.centro().to_string()),
            ("duracion", self.duracion_minutos().to_string()),
        ]
    }
}

/// Every service, or only those with an end time when `finished_only` is set.
pub async fn fetch_servicios(conn: &mut MySqlConnection, finished_only: bool) -> Result<Vec<ServicioRow>> {
    let sql = if finished_only {
        format!("{} WHERE s.FechaHoraFin IS NOT NULL", SERVICIO_JOIN)
    } else {
        SERVICIO_JOIN.to_string()
    };

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(ServicioRow::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_document_defaults() {
        let row = ServicioRow {
            id: 5,
            inicio: Some(at(9, 0)),
            fin: Some(at(11, 30)),
            precio_final: Some(Decimal::new(7250, 2)),
            estado: Some("Completado".to_string()),
            usuario_nombre: Some("Ana".to_string()),
            usuario_apellido: Some("García".to_string()),
            ..Default::default()
        };

        let doc = row.to_document();

        assert_eq!(doc["id_servicio"], 5);
        assert_eq!(doc["usuario"], "Ana García");
        assert_eq!(doc["cuidador"], "Sin Asignar");
        assert_eq!(doc["especialidad"], "General");
        assert_eq!(doc["centro"], "Domicilio");
        assert_eq!(doc["precio"], 72.5);
        assert_eq!(doc["duracion_minutos"], 150);
    }

    #[test]
    fn test_missing_times_give_zero_duration() {
        let row = ServicioRow {
            id: 1,
            inicio: Some(at(9, 0)),
            ..Default::default()
        };
        assert_eq!(row.duracion_minutos(), 0);
        assert_eq!(row.to_document()["precio"], 0.0);
    }

    #[test]
    fn test_hash_fields() {
        let row = ServicioRow {
            id: 8,
            inicio: Some(at(10, 0)),
            fin: Some(at(11, 0)),
            usuario_nombre: Some("Luis".to_string()),
            cuidador_nombre: Some("Carmen".to_string()),
            centro: Some("Centro Sol".to_string()),
            ..Default::default()
        };

        let fields = row.to_hash_fields();

        assert_eq!(fields[0], ("id", "8".to_string()));
        assert!(fields.contains(&("cuidador", "Carmen".to_string())));
        assert!(fields.contains(&("centro", "Centro Sol".to_string())));
        assert!(fields.contains(&("duracion", "60".to_string())));
    }
}
