//! Streaming series catalog on the MongoDB Atlas cluster.
//!
//! Loads a synthetic catalog (some documents deliberately incomplete) and
//! exports four filtered views as JSON files.

use crate::error::Result;
use crate::pool::StoreConnector;
use crate::report::export::{document_to_json, write_json};
use bson::{doc, Document};
use fake::faker::lorem::en::Words;
use fake::Fake;
use futures::TryStreamExt;
use mongodb::Collection;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

pub const COLLECTION: &str = "series";

pub const COMPLETE_SERIES: usize = 50;
pub const INCOMPLETE_SERIES: usize = 10;

pub const PLATAFORMAS: [&str; 5] = ["Netflix", "HBO Max", "Disney+", "Amazon Prime", "Apple TV+"];
pub const GENEROS: [&str; 7] = ["Sci-Fi", "Drama", "Comedia", "Acción", "Terror", "Documental", "Thriller"];

/// Fields that may be missing from an incomplete series.
pub const OPTIONAL_FIELDS: [&str; 4] = ["puntuacion", "año_estreno", "temporadas", "genero"];

/// Generate a single complete series document.
pub fn generate_serie<R: Rng + ?Sized>(rng: &mut R) -> Document {
    let words: Vec<String> = Words(3..4).fake_with_rng(rng);
    let mut titulo = words.join(" ");
    if let Some(first) = titulo.get(0..1) {
        titulo = first.to_uppercase() + &titulo[1..];
    }

    let count = rng.gen_range(1..=3);
    let genero: Vec<&str> = GENEROS.choose_multiple(rng, count).copied().collect();
    let puntuacion = (rng.gen_range(5.0..=10.0_f64) * 10.0).round() / 10.0;

    doc! {
        "titulo": titulo,
        "plataforma": PLATAFORMAS[rng.gen_range(0..PLATAFORMAS.len())],
        "temporadas": rng.gen_range(1..=15),
        "genero": genero,
        "puntuacion": puntuacion,
        "finalizada": rng.gen_bool(0.5),
        "año_estreno": rng.gen_range(2000..=2024),
    }
}

/// Complete series first, then incomplete ones with one optional field removed each.
pub fn generate_catalog<R: Rng + ?Sized>(rng: &mut R, complete: usize, incomplete: usize) -> Vec<Document> {
    let mut catalog = Vec::with_capacity(complete + incomplete);

    for _ in 0..complete {
        catalog.push(generate_serie(rng));
    }

    for _ in 0..incomplete {
        let mut serie = generate_serie(rng);
        let field = OPTIONAL_FIELDS[rng.gen_range(0..OPTIONAL_FIELDS.len())];
        serie.remove(field);
        catalog.push(serie);
    }

    catalog
}

/// A named filter and the file its results are exported to.
pub struct SeriesQuery {
    pub file_name: &'static str,
    pub description: &'static str,
    pub filter: Document,
}

pub fn queries() -> Vec<SeriesQuery> {
    vec![
        SeriesQuery {
            file_name: "maratones.json",
            description: "Maratones largas",
            filter: doc! { "temporadas": { "$gt": 5 }, "puntuacion": { "$gt": 8.0 } },
        },
        SeriesQuery {
            file_name: "comedias_recientes.json",
            description: "Comedias recientes",
            // Matches inside the genero array
            filter: doc! { "genero": "Comedia", "año_estreno": { "$gte": 2020 } },
        },
        SeriesQuery {
            file_name: "series_finalizadas.json",
            description: "Series finalizadas",
            filter: doc! { "finalizada": true },
        },
        SeriesQuery {
            file_name: "netflix_top.json",
            description: "Top Netflix",
            filter: doc! { "plataforma": "Netflix", "puntuacion": { "$gte": 9.0 } },
        },
    ]
}

async fn export_query(collection: &Collection<Document>, query: &SeriesQuery, path: &Path) -> Result<usize> {
    let docs: Vec<Document> = collection.find(query.filter.clone()).await?.try_collect().await?;
    let values: Vec<Value> = docs.iter().map(document_to_json).collect();

    write_json(path, &values)?;
    info!("{}: {} records exported to '{}'", query.description, values.len(), path.display());
    Ok(values.len())
}

pub async fn run(connector: &StoreConnector) -> Result<Vec<PathBuf>> {
    let config = connector.config();
    let client = connector.mongo_atlas().await?;
    let collection = client
        .database(&config.atlas.database)
        .collection::<Document>(COLLECTION);

    collection.delete_many(doc! {}).await?;
    info!("Connected to Atlas, collection '{}' cleared", COLLECTION);

    let mut rng = match config.seed_rng {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!("Generating {} complete and {} incomplete series...", COMPLETE_SERIES, INCOMPLETE_SERIES);
    let catalog = generate_catalog(&mut rng, COMPLETE_SERIES, INCOMPLETE_SERIES);
    let result = collection.insert_many(catalog).await?;
    info!("{} documents inserted", result.inserted_ids.len());

    info!("--- Exporting ---");
    let mut written = Vec::new();
    for query in queries() {
        let path = config.output_path(query.file_name);
        export_query(&collection, &query, &path).await?;
        written.push(path);
    }

    client.shutdown().await;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_serie_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let serie = generate_serie(&mut rng);

            let temporadas = serie.get_i32("temporadas").unwrap();
            assert!((1..=15).contains(&temporadas));

            let puntuacion = serie.get_f64("puntuacion").unwrap();
            assert!((5.0..=10.0).contains(&puntuacion));
            assert_eq!((puntuacion * 10.0).round() / 10.0, puntuacion);

            let genero = serie.get_array("genero").unwrap();
            assert!((1..=3).contains(&genero.len()));

            let year = serie.get_i32("año_estreno").unwrap();
            assert!((2000..=2024).contains(&year));

            assert!(PLATAFORMAS.contains(&serie.get_str("plataforma").unwrap()));
            assert!(!serie.get_str("titulo").unwrap().contains('.'));
        }
    }

    #[test]
    fn test_catalog_has_incomplete_tail() {
        let mut rng = StdRng::seed_from_u64(5);
        let catalog = generate_catalog(&mut rng, COMPLETE_SERIES, INCOMPLETE_SERIES);

        assert_eq!(catalog.len(), 60);
        for serie in &catalog[..COMPLETE_SERIES] {
            assert_eq!(serie.len(), 7);
        }
        for serie in &catalog[COMPLETE_SERIES..] {
            assert_eq!(serie.len(), 6);
            let missing = OPTIONAL_FIELDS.iter().filter(|f| !serie.contains_key(**f)).count();
            assert_eq!(missing, 1);
        }
    }

    #[test]
    fn test_queries_export_files() {
        let files: Vec<&str> = queries().iter().map(|q| q.file_name).collect();
        assert_eq!(
            files,
            vec!["maratones.json", "comedias_recientes.json", "series_finalizadas.json", "netflix_top.json"]
        );
    }
}
