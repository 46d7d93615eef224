//! Decoding of RediSearch replies (RESP2 layout).

use crate::error::{LabError, Result};
use redis::Value;
use std::collections::HashMap;

/// One document of an `FT.SEARCH` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDoc {
    pub id: String,
    pub fields: HashMap<String, String>,
}

impl SearchDoc {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReply {
    pub total: i64,
    pub docs: Vec<SearchDoc>,
}

/// Render a scalar reply as text. Nested replies yield `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Double(n) => Some(n.to_string()),
        Value::Okay => Some("OK".to_string()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        other => value_to_string(other)?.parse().ok(),
    }
}

fn pairs(value: &Value) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Value::Array(items) = value {
        for pair in items.chunks(2) {
            if let [name, value] = pair {
                if let (Some(name), Some(value)) = (value_to_string(name), value_to_string(value)) {
                    map.insert(name, value);
                }
            }
        }
    }
    map
}

/// `[total, id, [field, value, ...], id, [...], ...]`; with NOCONTENT the field arrays are absent.
pub fn parse_search(value: &Value) -> Result<SearchReply> {
    let Value::Array(items) = value else {
        return Err(LabError::Redis(format!("unexpected FT.SEARCH reply: {:?}", value)));
    };

    let Some((first, rest)) = items.split_first() else {
        return Err(LabError::Redis("empty FT.SEARCH reply".to_string()));
    };
    let total = as_integer(first)
        .ok_or_else(|| LabError::Redis(format!("FT.SEARCH total is not a number: {:?}", first)))?;

    let mut docs = Vec::new();
    let mut iter = rest.iter().peekable();
    while let Some(id_value) = iter.next() {
        let Some(id) = value_to_string(id_value) else {
            continue;
        };
        let fields = if matches!(iter.peek(), Some(Value::Array(_))) {
            iter.next().map(pairs).unwrap_or_default()
        } else {
            HashMap::new()
        };
        docs.push(SearchDoc { id, fields });
    }

    Ok(SearchReply { total, docs })
}

/// `[count, [field, value, ...], ...]` into one map per group row.
pub fn parse_aggregate(value: &Value) -> Result<Vec<HashMap<String, String>>> {
    let Value::Array(items) = value else {
        return Err(LabError::Redis(format!("unexpected FT.AGGREGATE reply: {:?}", value)));
    };

    Ok(items.iter().skip(1).map(pairs).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_search_with_fields() {
        let reply = Value::Array(vec![
            Value::Int(2),
            bulk("datos_mysql:servicio:4"),
            Value::Array(vec![bulk("duracion"), bulk("300"), bulk("centro"), bulk("Domicilio")]),
            bulk("datos_mysql:servicio:9"),
            Value::Array(vec![bulk("duracion"), bulk("60")]),
        ]);

        let parsed = parse_search(&reply).unwrap();

        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.docs.len(), 2);
        assert_eq!(parsed.docs[0].id, "datos_mysql:servicio:4");
        assert_eq!(parsed.docs[0].field("centro"), Some("Domicilio"));
        assert_eq!(parsed.docs[1].field("duracion"), Some("60"));
    }

    #[test]
    fn test_parse_search_nocontent() {
        let reply = Value::Array(vec![Value::Int(3), bulk("servicio:1"), bulk("servicio:2")]);

        let parsed = parse_search(&reply).unwrap();

        assert_eq!(parsed.total, 3);
        assert_eq!(parsed.docs.len(), 2);
        assert!(parsed.docs[1].fields.is_empty());
    }

    #[test]
    fn test_parse_search_rejects_scalar() {
        assert!(parse_search(&Value::Nil).is_err());
        assert!(parse_search(&Value::Array(vec![])).is_err());
    }

    #[test]
    fn test_parse_aggregate() {
        let reply = Value::Array(vec![
            Value::Int(2),
            Value::Array(vec![
                bulk("centro"),
                bulk("Domicilio"),
                bulk("conteo"),
                bulk("12"),
                bulk("ingresos_totales"),
                bulk("804.5"),
            ]),
            Value::Array(vec![bulk("centro"), bulk("Sol"), bulk("conteo"), bulk("3")]),
        ]);

        let rows = parse_aggregate(&reply).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["centro"], "Domicilio");
        assert_eq!(rows[0]["ingresos_totales"], "804.5");
        assert_eq!(rows[1]["conteo"], "3");
    }
}
