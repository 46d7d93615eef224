use crate::error::Result;
use bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write `value` as indented UTF-8 JSON, creating the parent directory if needed.
///
/// Non-ASCII characters are written as-is.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    fs::write(path, buffer)?;
    info!("JSON written to {}", path.display());
    Ok(())
}

/// ISO-8601 timestamp with microseconds, used in report metadata.
pub fn iso_timestamp(at: chrono::NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// BSON to plain JSON: ObjectIds become hex strings and dates RFC 3339 strings.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        Bson::Null => Value::Null,
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::Timestamp(ts) => serde_json::json!({ "t": ts.time, "i": ts.increment }),
        other => Value::String(other.to_string()),
    }
}

pub fn document_to_json(doc: &Document) -> Value {
    let map: Map<String, Value> = doc
        .iter()
        .map(|(key, value)| (key.clone(), bson_to_json(value)))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_keeps_accents_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json(&path, &json!({ "Barrio": "Nervión", "total": 2 })).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Nervión"));
        assert!(content.contains("\n    \"total\": 2"));

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["total"], 2);
    }

    #[test]
    fn test_bson_to_json() {
        let oid = bson::oid::ObjectId::new();
        let doc = bson::doc! {
            "_id": oid,
            "titulo": "Serie",
            "genero": ["Drama", "Comedia"],
            "puntuacion": 8.5,
            "temporadas": 3,
            "finalizada": true,
        };

        let value = document_to_json(&doc);

        assert_eq!(value["_id"], oid.to_hex());
        assert_eq!(value["genero"][1], "Comedia");
        assert_eq!(value["puntuacion"], 8.5);
        assert_eq!(value["temporadas"], 3);
        assert_eq!(value["finalizada"], true);
    }

    #[test]
    fn test_bson_to_json_other_variants() {
        let ts = Bson::Timestamp(bson::Timestamp { time: 7, increment: 2 });
        assert_eq!(bson_to_json(&ts), json!({ "t": 7, "i": 2 }));

        assert!(matches!(bson_to_json(&Bson::MaxKey), Value::String(_)));
        assert!(matches!(bson_to_json(&Bson::Symbol("abc".to_string())), Value::String(_)));
    }

    #[test]
    fn test_iso_timestamp() {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 6)
            .unwrap();
        assert_eq!(iso_timestamp(at), "2025-01-02T03:04:05.000006");
    }
}
