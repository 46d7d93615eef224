//! Key and index names used in Redis.

pub const SERVICIOS_INDEX: &str = "idx:servicios";
pub const SERVICIO_PREFIX: &str = "servicio:";

pub const TIEMPOS_INDEX: &str = "idx:tiempos_servicio";
pub const TIEMPO_PREFIX: &str = "datos_mysql:servicio:";

pub const HISTORIAL_USUARIO_1: &str = "historial:usuario:1";

/// Glob over the nombre key of every cached usuario.
pub const USUARIO_NOMBRE_PATTERN: &str = "centro:usuario:*:nombre";

pub fn usuario_field(id: i32, field: &str) -> String {
    format!("centro:usuario:{}:{}", id, field)
}

pub fn servicio(id: i32) -> String {
    format!("{}{}", SERVICIO_PREFIX, id)
}

pub fn tiempo_servicio(id: i32) -> String {
    format!("{}{}", TIEMPO_PREFIX, id)
}

pub fn usuaria_sql(id: i32) -> String {
    format!("usuaria:sql:{}", id)
}

pub fn cuidador_sql(id: i32) -> String {
    format!("cuidador:sql:{}", id)
}

/// Last `:`-separated segment of a key, the source row id for every key family above.
pub fn trailing_id(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}

/// Escape a value for use inside a RediSearch tag filter `{...}`.
pub fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if !c.is_alphanumeric() && c != '_' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(usuario_field(3, "dni"), "centro:usuario:3:dni");
        assert_eq!(servicio(12), "servicio:12");
        assert_eq!(tiempo_servicio(7), "datos_mysql:servicio:7");
        assert_eq!(usuaria_sql(1), "usuaria:sql:1");
        assert_eq!(cuidador_sql(2), "cuidador:sql:2");
    }

    #[test]
    fn test_trailing_id() {
        assert_eq!(trailing_id("datos_mysql:servicio:42"), "42");
        assert_eq!(trailing_id("plain"), "plain");
    }

    #[test]
    fn test_escape_tag() {
        assert_eq!(escape_tag("Domicilio"), "Domicilio");
        assert_eq!(escape_tag("Centro de Día-Sol"), "Centro\\ de\\ Día\\-Sol");
    }
}
