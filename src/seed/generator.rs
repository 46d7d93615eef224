//! Synthetic care center data.
//!
//! One dataset is generated per run and written to every store, so the SQL
//! databases and MongoDB hold the same people and services.

use crate::model::{
    Centro, Cuidador, Dependiente, EstadoServicio, Resena, Servicio, Transaccion, Usuaria,
};
use chrono::{Duration, NaiveDateTime};
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::company::en::{CatchPhrase, CompanyName};
use fake::faker::internet::en::FreeEmailProvider;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashSet;

const DNI_LETTERS: &[u8; 23] = b"TRWAGMYFPDXBNJZSQVHLCKE";

const GENEROS: [&str; 2] = ["Femenino", "Masculino"];
const BARRIOS: [&str; 6] = ["Centro", "Nervión", "Triana", "Macarena", "Los Remedios", "Bellavista"];
const TIPOS_DEPENDENCIA: [&str; 3] = ["Niño", "Mayor", "Otro"];
const DISPONIBILIDADES: [&str; 3] = ["Mañana", "Tarde", "Completa"];
pub const ESPECIALIDADES: [&str; 4] = ["Geriatría", "Infantil", "Fisioterapia", "Terapia"];
const ESTADOS_PAGO: [&str; 2] = ["Pagado", "Pendiente"];

#[derive(Debug, Clone)]
pub struct SeedSettings {
    pub records: usize,
    pub services: usize,
    pub centros: usize,
    /// Services start within the year before this instant.
    pub reference: NaiveDateTime,
}

impl SeedSettings {
    pub fn new(records: usize, services: usize, reference: NaiveDateTime) -> Self {
        Self {
            records,
            services,
            centros: 5,
            reference,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeedDataset {
    pub usuarias: Vec<Usuaria>,
    pub dependientes: Vec<Dependiente>,
    pub cuidadores: Vec<Cuidador>,
    pub centros: Vec<Centro>,
    pub servicios: Vec<Servicio>,
    pub transacciones: Vec<Transaccion>,
    pub resenas: Vec<Resena>,
}

impl SeedDataset {
    /// Generate a complete dataset with ids starting at 1 in every table.
    pub fn generate<R: Rng + ?Sized>(settings: &SeedSettings, rng: &mut R) -> Self {
        let mut used_dnis = HashSet::new();
        let mut data = SeedDataset::default();

        for i in 0..settings.records {
            let id = (i + 1) as i32;
            let nombre: String = FirstName().fake_with_rng(rng);
            let apellido: String = LastName().fake_with_rng(rng);
            let provider: String = FreeEmailProvider().fake_with_rng(rng);

            data.usuarias.push(Usuaria {
                id,
                email: format!("{}.{}{}@{}", slug(&nombre), slug(&apellido), id, provider),
                nombre,
                apellido,
                dni: unique_dni(rng, &mut used_dnis),
                fecha_nacimiento: (settings.reference - Duration::days(rng.gen_range(18 * 365..=90 * 365))).date(),
                barrio: pick(rng, &BARRIOS).to_string(),
                renta_percapita: money(rng, 10_000_00, 60_000_00),
                telefono: phone(rng),
                genero: pick(rng, &GENEROS).to_string(),
            });
        }

        // One dependiente per usuaria, sharing her id
        for usuaria in &data.usuarias {
            data.dependientes.push(Dependiente {
                id: usuaria.id,
                id_usuario: usuaria.id,
                nombre: FirstName().fake_with_rng(rng),
                apellido: usuaria.apellido.clone(),
                tipo_dependencia: pick(rng, &TIPOS_DEPENDENCIA).to_string(),
                fecha_nacimiento: (settings.reference - Duration::days(rng.gen_range(365..=90 * 365))).date(),
                perfil_medico: Sentence(3..8).fake_with_rng(rng),
            });
        }

        for i in 0..settings.records {
            data.cuidadores.push(Cuidador {
                id: (i + 1) as i32,
                nombre: FirstName().fake_with_rng(rng),
                apellido: LastName().fake_with_rng(rng),
                dni: unique_dni(rng, &mut used_dnis),
                telefono: phone(rng),
                disponibilidad: pick(rng, &DISPONIBILIDADES).to_string(),
                especialidad: pick(rng, &ESPECIALIDADES).to_string(),
            });
        }

        for i in 0..settings.centros {
            let street: String = StreetName().fake_with_rng(rng);
            let number: String = BuildingNumber().fake_with_rng(rng);
            let city: String = CityName().fake_with_rng(rng);

            data.centros.push(Centro {
                id: (i + 1) as i32,
                nombre: CompanyName().fake_with_rng(rng),
                direccion: format!("{} {}, {}", street, number, city),
                descripcion: CatchPhrase().fake_with_rng(rng),
                capacidad_maxima: rng.gen_range(10..=100),
            });
        }

        // Servicios need at least one usuaria and one cuidador to point at
        let services = if data.usuarias.is_empty() { 0 } else { settings.services };

        for i in 0..services {
            let id = (i + 1) as i32;
            let usuaria = &data.usuarias[rng.gen_range(0..data.usuarias.len())];
            let id_usuario = usuaria.id;

            let id_cuidador = if rng.gen_bool(0.75) {
                Some(rng.gen_range(1..=data.cuidadores.len()) as i32)
            } else {
                None
            };
            let id_centro = if !data.centros.is_empty() && rng.gen_bool(0.8) {
                Some(rng.gen_range(1..=data.centros.len()) as i32)
            } else {
                None
            };

            let inicio = settings.reference - Duration::minutes(rng.gen_range(0..365 * 24 * 60));
            let fin = inicio + Duration::hours(rng.gen_range(1..=5));

            let precio_base = money(rng, 20_00, 150_00);
            let subvencion = (precio_base * Decimal::new(rng.gen_range(0..=30), 2)).round_dp(2);

            data.servicios.push(Servicio {
                id,
                id_usuario,
                id_dependiente: id_usuario,
                id_cuidador,
                id_centro,
                inicio,
                fin,
                precio_base,
                subvencion,
                precio_final: precio_base - subvencion,
                estado: pick_estado(rng),
                comentario_interno: Sentence(4..10).fake_with_rng(rng),
            });
        }

        for servicio in data.servicios.iter().filter(|s| s.estado == EstadoServicio::Completado) {
            data.transacciones.push(Transaccion {
                id: (data.transacciones.len() + 1) as i32,
                id_servicio: servicio.id,
                fecha: servicio.fin,
                monto: servicio.precio_final,
                estado_pago: pick(rng, &ESTADOS_PAGO).to_string(),
            });

            if rng.gen_bool(0.8) {
                data.resenas.push(Resena {
                    id: (data.resenas.len() + 1) as i32,
                    id_servicio: servicio.id,
                    id_usuario: servicio.id_usuario,
                    puntuacion: rng.gen_range(1..=5),
                    comentario: Sentence(5..12).fake_with_rng(rng),
                    fecha: servicio.fin + Duration::hours(rng.gen_range(1..=72)),
                });
            }
        }

        data
    }

    pub fn dependientes_of(&self, id_usuario: i32) -> impl Iterator<Item = &Dependiente> {
        self.dependientes.iter().filter(move |d| d.id_usuario == id_usuario)
    }

    pub fn total_rows(&self) -> usize {
        self.usuarias.len()
            + self.dependientes.len()
            + self.cuidadores.len()
            + self.centros.len()
            + self.servicios.len()
            + self.transacciones.len()
            + self.resenas.len()
    }
}

/// Check letter of a Spanish DNI number.
pub fn dni_letter(number: u32) -> char {
    DNI_LETTERS[(number % 23) as usize] as char
}

fn unique_dni<R: Rng + ?Sized>(rng: &mut R, used: &mut HashSet<u32>) -> String {
    loop {
        let number = rng.gen_range(10_000_000..100_000_000);
        if used.insert(number) {
            return format!("{:08}{}", number, dni_letter(number));
        }
    }
}

fn money<R: Rng + ?Sized>(rng: &mut R, min_cents: i64, max_cents: i64) -> Decimal {
    Decimal::new(rng.gen_range(min_cents..=max_cents), 2)
}

fn phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("6{:08}", rng.gen_range(0..100_000_000u32))
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

fn pick_estado<R: Rng + ?Sized>(rng: &mut R) -> EstadoServicio {
    match rng.gen_range(0..100) {
        0..=59 => EstadoServicio::Completado,
        60..=84 => EstadoServicio::Pendiente,
        _ => EstadoServicio::Cancelado,
    }
}

fn slug(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings() -> SeedSettings {
        let reference = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        SeedSettings::new(20, 50, reference)
    }

    fn dataset(seed: u64) -> SeedDataset {
        SeedDataset::generate(&settings(), &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_dni_letter() {
        // 12345678 % 23 == 14 -> 'Z'
        assert_eq!(dni_letter(12_345_678), 'Z');
        assert_eq!(dni_letter(0), 'T');
        assert_eq!(dni_letter(22), 'E');
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        let a = dataset(7);
        let b = dataset(7);

        let emails_a: Vec<&str> = a.usuarias.iter().map(|u| u.email.as_str()).collect();
        let emails_b: Vec<&str> = b.usuarias.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails_a, emails_b);
        assert_eq!(a.resenas.len(), b.resenas.len());
    }

    #[test]
    fn test_table_sizes() {
        let data = dataset(1);

        assert_eq!(data.usuarias.len(), 20);
        assert_eq!(data.dependientes.len(), 20);
        assert_eq!(data.cuidadores.len(), 20);
        assert_eq!(data.centros.len(), 5);
        assert_eq!(data.servicios.len(), 50);
        assert!(data.total_rows() >= 115);
    }

    #[test]
    fn test_no_records_means_no_services() {
        let mut empty = settings();
        empty.records = 0;

        let data = SeedDataset::generate(&empty, &mut StdRng::seed_from_u64(3));

        assert!(data.usuarias.is_empty());
        assert!(data.servicios.is_empty());
        assert!(data.transacciones.is_empty());
        assert_eq!(data.centros.len(), 5);
    }

    #[test]
    fn test_dnis_and_emails_are_unique() {
        let data = dataset(3);

        let mut dnis = HashSet::new();
        for dni in data.usuarias.iter().map(|u| &u.dni).chain(data.cuidadores.iter().map(|c| &c.dni)) {
            assert_eq!(dni.len(), 9);
            let number: u32 = dni[..8].parse().unwrap();
            assert_eq!(dni.chars().last(), Some(dni_letter(number)));
            assert!(dnis.insert(dni.clone()), "duplicate DNI {}", dni);
        }

        let emails: HashSet<&str> = data.usuarias.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails.len(), data.usuarias.len());
    }

    #[test]
    fn test_foreign_keys_point_at_generated_rows() {
        let data = dataset(11);
        let usuarias = data.usuarias.len() as i32;

        for s in &data.servicios {
            assert!((1..=usuarias).contains(&s.id_usuario));
            let dependiente = data.dependientes.iter().find(|d| d.id == s.id_dependiente).unwrap();
            assert_eq!(dependiente.id_usuario, s.id_usuario);
            if let Some(c) = s.id_cuidador {
                assert!((1..=data.cuidadores.len() as i32).contains(&c));
            }
            if let Some(c) = s.id_centro {
                assert!((1..=data.centros.len() as i32).contains(&c));
            }
        }
    }

    #[test]
    fn test_service_amounts_and_times() {
        let data = dataset(5);
        let reference = settings().reference;

        for s in &data.servicios {
            assert!(s.precio_base >= Decimal::new(20_00, 2));
            assert!(s.precio_base <= Decimal::new(150_00, 2));
            assert!(s.subvencion >= Decimal::ZERO);
            assert_eq!(s.precio_final, s.precio_base - s.subvencion);
            assert!(s.fin > s.inicio);
            assert!(s.inicio <= reference);
            let hours = (s.fin - s.inicio).num_hours();
            assert!((1..=5).contains(&hours));
        }

        for u in &data.usuarias {
            assert!(u.renta_percapita >= Decimal::new(10_000_00, 2));
            assert!(u.renta_percapita <= Decimal::new(60_000_00, 2));
        }
    }

    #[test]
    fn test_transactions_and_reviews_follow_completed_services() {
        let data = dataset(9);

        let completed: Vec<&Servicio> = data
            .servicios
            .iter()
            .filter(|s| s.estado == EstadoServicio::Completado)
            .collect();
        assert_eq!(data.transacciones.len(), completed.len());

        let mut reviewed = HashSet::new();
        for r in &data.resenas {
            assert!((1..=5).contains(&r.puntuacion));
            let servicio = completed.iter().find(|s| s.id == r.id_servicio).unwrap();
            assert_eq!(servicio.id_usuario, r.id_usuario);
            assert!(reviewed.insert(r.id_servicio), "two reviews for one service");
        }

        for t in &data.transacciones {
            let servicio = completed.iter().find(|s| s.id == t.id_servicio).unwrap();
            assert_eq!(t.monto, servicio.precio_final);
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("O'Connor"), "oconnor");
        assert_eq!(slug("Mary Ann"), "maryann");
    }
}
