use crate::error::Result;
use crate::model::{decimal_to_f64, Cuidador, Dependiente, Servicio, Usuaria};
use crate::schema::{CUIDADORES, SERVICIOS, USUARIOS};
use crate::seed::generator::SeedDataset;
use bson::{doc, Bson, DateTime, Document};
use chrono::NaiveDateTime;
use mongodb::Client;
use tracing::{debug, info};

pub fn usuaria_document<'a>(
    usuaria: &Usuaria,
    dependientes: impl Iterator<Item = &'a Dependiente>,
) -> Document {
    let dependientes: Vec<Document> = dependientes
        .map(|d| {
            doc! {
                "Nombre": d.nombre.as_str(),
                "TipoDependencia": d.tipo_dependencia.as_str(),
            }
        })
        .collect();

    doc! {
        "IDUsuario": usuaria.id,
        "NombreCompleto": usuaria.nombre_completo(),
        "Contacto": {
            "email": usuaria.email.as_str(),
            "DNI": usuaria.dni.as_str(),
            "Telefono": usuaria.telefono.as_str(),
        },
        "DatosSensibles": {
            "Genero": usuaria.genero.as_str(),
            "Barrio": usuaria.barrio.as_str(),
            "RentaPercapita": decimal_to_f64(usuaria.renta_percapita),
        },
        "Dependientes": dependientes,
    }
}

pub fn cuidador_document(cuidador: &Cuidador) -> Document {
    doc! {
        "IDCuidador": cuidador.id,
        "NombreCompleto": format!("{} {}", cuidador.nombre, cuidador.apellido),
        "DNI": cuidador.dni.as_str(),
        "Telefono": cuidador.telefono.as_str(),
        "Disponibilidad": cuidador.disponibilidad.as_str(),
        "Especialidad": cuidador.especialidad.as_str(),
    }
}

pub fn servicio_document(servicio: &Servicio) -> Document {
    let cuidador = match servicio.id_cuidador {
        Some(id) => Bson::Int32(id),
        None => Bson::Null,
    };
    let centro = match servicio.id_centro {
        Some(id) => Bson::Int32(id),
        None => Bson::Null,
    };

    doc! {
        "IDServicio": servicio.id,
        "IDUsuario": servicio.id_usuario,
        "IDCuidador": cuidador,
        "IDCentro": centro,
        "FechaHoraInicio": bson_date(servicio.inicio),
        "FechaHoraFin": bson_date(servicio.fin),
        "PrecioFinal": decimal_to_f64(servicio.precio_final),
        "Estado": servicio.estado.as_str(),
        "ComentarioInterno": servicio.comentario_interno.as_str(),
    }
}

fn bson_date(value: NaiveDateTime) -> DateTime {
    DateTime::from_millis(value.and_utc().timestamp_millis())
}

/// Clear the three data collections and insert the dataset's documents.
pub async fn populate_mongodb(client: &Client, db_name: &str, data: &SeedDataset) -> Result<usize> {
    let db = client.database(db_name);

    let usuarias: Vec<Document> = data
        .usuarias
        .iter()
        .map(|u| usuaria_document(u, data.dependientes_of(u.id)))
        .collect();
    let cuidadores: Vec<Document> = data.cuidadores.iter().map(cuidador_document).collect();
    let servicios: Vec<Document> = data.servicios.iter().map(servicio_document).collect();

    let mut inserted = 0;
    for (name, docs) in [(USUARIOS, usuarias), (CUIDADORES, cuidadores), (SERVICIOS, servicios)] {
        let collection = db.collection::<Document>(name);
        let deleted = collection.delete_many(doc! {}).await?;
        debug!("MongoDB: cleared {} documents from {}", deleted.deleted_count, name);

        if docs.is_empty() {
            continue;
        }

        let result = collection.insert_many(docs).await?;
        inserted += result.inserted_ids.len();
    }

    info!("MongoDB: {} documents inserted in {}", inserted, db_name);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EstadoServicio;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn usuaria() -> Usuaria {
        Usuaria {
            id: 7,
            nombre: "Ana".to_string(),
            apellido: "Pérez".to_string(),
            dni: "12345678Z".to_string(),
            fecha_nacimiento: NaiveDate::from_ymd_opt(1980, 5, 4).unwrap(),
            barrio: "Triana".to_string(),
            renta_percapita: Decimal::new(3_550_075, 2),
            telefono: "600000001".to_string(),
            email: "anaperez7@example.com".to_string(),
            genero: "Femenino".to_string(),
        }
    }

    #[test]
    fn test_usuaria_document_shape() {
        let dependiente = Dependiente {
            id: 7,
            id_usuario: 7,
            nombre: "Elena".to_string(),
            apellido: "Pérez".to_string(),
            tipo_dependencia: "Mayor".to_string(),
            fecha_nacimiento: NaiveDate::from_ymd_opt(1940, 1, 1).unwrap(),
            perfil_medico: "Movilidad reducida".to_string(),
        };

        let doc = usuaria_document(&usuaria(), [dependiente].iter());

        assert_eq!(doc.get_i32("IDUsuario").unwrap(), 7);
        assert_eq!(doc.get_str("NombreCompleto").unwrap(), "Ana Pérez");
        assert_eq!(
            doc.get_document("Contacto").unwrap().get_str("DNI").unwrap(),
            "12345678Z"
        );
        let sensibles = doc.get_document("DatosSensibles").unwrap();
        assert_eq!(sensibles.get_f64("RentaPercapita").unwrap(), 35500.75);
        assert_eq!(sensibles.get_str("Genero").unwrap(), "Femenino");

        let dependientes = doc.get_array("Dependientes").unwrap();
        assert_eq!(dependientes.len(), 1);
    }

    #[test]
    fn test_servicio_document_nulls_and_dates() {
        let inicio = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let servicio = Servicio {
            id: 3,
            id_usuario: 7,
            id_dependiente: 7,
            id_cuidador: None,
            id_centro: Some(2),
            inicio,
            fin: inicio + chrono::Duration::hours(2),
            precio_base: Decimal::new(5000, 2),
            subvencion: Decimal::new(500, 2),
            precio_final: Decimal::new(4500, 2),
            estado: EstadoServicio::Pendiente,
            comentario_interno: "Llamar antes".to_string(),
        };

        let doc = servicio_document(&servicio);

        assert_eq!(doc.get("IDCuidador"), Some(&Bson::Null));
        assert_eq!(doc.get_i32("IDCentro").unwrap(), 2);
        assert_eq!(doc.get_f64("PrecioFinal").unwrap(), 45.0);
        assert_eq!(doc.get_str("Estado").unwrap(), "Pendiente");

        let start = doc.get_datetime("FechaHoraInicio").unwrap();
        let end = doc.get_datetime("FechaHoraFin").unwrap();
        assert_eq!(end.timestamp_millis() - start.timestamp_millis(), 2 * 3600 * 1000);
    }
}
