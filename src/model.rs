//! Care center domain records shared by the seeders, reports and cache demos.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct Usuaria {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub fecha_nacimiento: NaiveDate,
    pub barrio: String,
    pub renta_percapita: Decimal,
    pub telefono: String,
    pub email: String,
    pub genero: String,
}

impl Usuaria {
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dependiente {
    pub id: i32,
    pub id_usuario: i32,
    pub nombre: String,
    pub apellido: String,
    pub tipo_dependencia: String,
    pub fecha_nacimiento: NaiveDate,
    pub perfil_medico: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cuidador {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub telefono: String,
    pub disponibilidad: String,
    pub especialidad: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Centro {
    pub id: i32,
    pub nombre: String,
    pub direccion: String,
    pub descripcion: String,
    pub capacidad_maxima: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstadoServicio {
    Completado,
    Pendiente,
    Cancelado,
}

impl EstadoServicio {
    pub const ALL: [EstadoServicio; 3] = [
        EstadoServicio::Completado,
        EstadoServicio::Pendiente,
        EstadoServicio::Cancelado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoServicio::Completado => "Completado",
            EstadoServicio::Pendiente => "Pendiente",
            EstadoServicio::Cancelado => "Cancelado",
        }
    }
}

impl fmt::Display for EstadoServicio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Servicio {
    pub id: i32,
    pub id_usuario: i32,
    pub id_dependiente: i32,
    pub id_cuidador: Option<i32>,
    pub id_centro: Option<i32>,
    pub inicio: NaiveDateTime,
    pub fin: NaiveDateTime,
    pub precio_base: Decimal,
    pub subvencion: Decimal,
    pub precio_final: Decimal,
    pub estado: EstadoServicio,
    pub comentario_interno: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transaccion {
    pub id: i32,
    pub id_servicio: i32,
    pub fecha: NaiveDateTime,
    pub monto: Decimal,
    pub estado_pago: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resena {
    pub id: i32,
    pub id_servicio: i32,
    pub id_usuario: i32,
    pub puntuacion: i32,
    pub comentario: String,
    pub fecha: NaiveDateTime,
}

/// Whole minutes between two instants; zero when `fin` is not after `inicio`.
pub fn duration_minutes(inicio: NaiveDateTime, fin: NaiveDateTime) -> i64 {
    if fin > inicio {
        (fin - inicio).num_minutes()
    } else {
        0
    }
}

/// DECIMAL columns become plain JSON numbers in every export.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(duration_minutes(at(9, 0), at(11, 30)), 150);
        assert_eq!(duration_minutes(at(9, 0), at(9, 0)), 0);
        assert_eq!(duration_minutes(at(12, 0), at(9, 0)), 0);
    }

    #[test]
    fn test_decimal_to_f64() {
        assert_eq!(decimal_to_f64(Decimal::new(2_500_050, 2)), 25000.5);
        assert_eq!(decimal_to_f64(Decimal::ZERO), 0.0);
    }

    #[test]
    fn test_estado_labels() {
        let labels: Vec<&str> = EstadoServicio::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(labels, vec!["Completado", "Pendiente", "Cancelado"]);
        assert_eq!(EstadoServicio::Pendiente.to_string(), "Pendiente");
    }
}
