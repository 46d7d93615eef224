//! Table definitions for the care center schema in both SQL dialects.
//!
//! The two scripts describe the same tables; MySQL uses `AUTO_INCREMENT` and
//! `DATETIME`, PostgreSQL uses `SERIAL` and `TIMESTAMP`. Statements are kept in
//! dependency order so they can be executed top to bottom.

use regex::Regex;
use std::sync::OnceLock;

/// Tables in creation order (parents first).
pub const TABLES: [&str; 7] = [
    "USUARIA",
    "DEPENDIENTE",
    "CUIDADOR",
    "CENTRO",
    "SERVICIO",
    "TRANSACCION",
    "RESENA",
];

/// Serial id column of each table, used to realign PostgreSQL sequences.
pub const ID_COLUMNS: [(&str, &str); 7] = [
    ("USUARIA", "IDUsuario"),
    ("DEPENDIENTE", "IDDependiente"),
    ("CUIDADOR", "IDCuidador"),
    ("CENTRO", "IDCentro"),
    ("SERVICIO", "IDServicio"),
    ("TRANSACCION", "IDTransaccion"),
    ("RESENA", "IDResena"),
];

pub const MYSQL_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS USUARIA (
    IDUsuario INT PRIMARY KEY AUTO_INCREMENT,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    DNI VARCHAR(20) UNIQUE NOT NULL,
    FechaNacimiento DATE,
    Barrio VARCHAR(100),
    RentaPercapita DECIMAL(10, 2),
    Telefono VARCHAR(20),
    Email VARCHAR(100) UNIQUE,
    Genero VARCHAR(50)
);

CREATE TABLE IF NOT EXISTS DEPENDIENTE (
    IDDependiente INT PRIMARY KEY AUTO_INCREMENT,
    IDUsuario INT NOT NULL,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    TipoDependencia VARCHAR(50),
    FechaNacimiento DATE,
    PerfilMedico TEXT,
    FOREIGN KEY (IDUsuario) REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS CUIDADOR (
    IDCuidador INT PRIMARY KEY AUTO_INCREMENT,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    DNI VARCHAR(20) UNIQUE NOT NULL,
    Telefono VARCHAR(20),
    Disponibilidad VARCHAR(255),
    Especialidad VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS CENTRO (
    IDCentro INT PRIMARY KEY AUTO_INCREMENT,
    NombreCentro VARCHAR(100) NOT NULL,
    Direccion VARCHAR(255),
    DescripcionCentro TEXT,
    CapacidadMaxima INT,
    CHECK (CapacidadMaxima > 0)
);

CREATE TABLE IF NOT EXISTS SERVICIO (
    IDServicio INT PRIMARY KEY AUTO_INCREMENT,
    IDUsuario INT NOT NULL,
    IDDependiente INT NOT NULL,
    IDCuidador INT,
    IDCentro INT,
    FechaHoraInicio DATETIME NOT NULL,
    FechaHoraFin DATETIME NOT NULL,
    PrecioBase DECIMAL(10, 2) NOT NULL,
    SubvencionAplicada DECIMAL(10, 2) DEFAULT 0.00,
    PrecioFinal DECIMAL(10, 2) NOT NULL,
    Estado VARCHAR(50),
    CHECK (FechaHoraFin >= FechaHoraInicio),
    FOREIGN KEY (IDUsuario) REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE,
    FOREIGN KEY (IDDependiente) REFERENCES DEPENDIENTE(IDDependiente) ON DELETE CASCADE,
    FOREIGN KEY (IDCuidador) REFERENCES CUIDADOR(IDCuidador),
    FOREIGN KEY (IDCentro) REFERENCES CENTRO(IDCentro)
);

CREATE TABLE IF NOT EXISTS TRANSACCION (
    IDTransaccion INT PRIMARY KEY AUTO_INCREMENT,
    IDServicio INT UNIQUE NOT NULL,
    FechaTransaccion DATETIME DEFAULT CURRENT_TIMESTAMP,
    Monto DECIMAL(10, 2) NOT NULL,
    EstadoPago VARCHAR(50),
    FOREIGN KEY (IDServicio) REFERENCES SERVICIO(IDServicio) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS RESENA (
    IDResena INT PRIMARY KEY AUTO_INCREMENT,
    IDServicio INT UNIQUE NOT NULL,
    IDUsuario INT NOT NULL,
    Puntuacion INT,
    Comentario TEXT,
    FechaResena DATETIME DEFAULT CURRENT_TIMESTAMP,
    CHECK (Puntuacion BETWEEN 1 AND 5),
    FOREIGN KEY (IDServicio) REFERENCES SERVICIO(IDServicio) ON DELETE CASCADE,
    FOREIGN KEY (IDUsuario) REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE
);
"#;

// CREATE DATABASE cannot run inside a transaction, it is issued separately.
pub const POSTGRES_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS USUARIA (
    IDUsuario SERIAL PRIMARY KEY,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    DNI VARCHAR(20) UNIQUE NOT NULL,
    FechaNacimiento DATE,
    Barrio VARCHAR(100),
    RentaPercapita NUMERIC(10, 2),
    Telefono VARCHAR(20),
    Email VARCHAR(100) UNIQUE,
    Genero VARCHAR(50)
);

CREATE TABLE IF NOT EXISTS DEPENDIENTE (
    IDDependiente SERIAL PRIMARY KEY,
    IDUsuario INT NOT NULL REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    TipoDependencia VARCHAR(50),
    FechaNacimiento DATE,
    PerfilMedico TEXT
);

CREATE TABLE IF NOT EXISTS CUIDADOR (
    IDCuidador SERIAL PRIMARY KEY,
    Nombre VARCHAR(100) NOT NULL,
    Apellido VARCHAR(100) NOT NULL,
    DNI VARCHAR(20) UNIQUE NOT NULL,
    Telefono VARCHAR(20),
    Disponibilidad VARCHAR(255),
    Especialidad VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS CENTRO (
    IDCentro SERIAL PRIMARY KEY,
    NombreCentro VARCHAR(100) NOT NULL,
    Direccion VARCHAR(255),
    DescripcionCentro TEXT,
    CapacidadMaxima INT CHECK (CapacidadMaxima > 0)
);

CREATE TABLE IF NOT EXISTS SERVICIO (
    IDServicio SERIAL PRIMARY KEY,
    IDUsuario INT NOT NULL REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE,
    IDDependiente INT NOT NULL REFERENCES DEPENDIENTE(IDDependiente) ON DELETE CASCADE,
    IDCuidador INT REFERENCES CUIDADOR(IDCuidador),
    IDCentro INT REFERENCES CENTRO(IDCentro),
    FechaHoraInicio TIMESTAMP NOT NULL,
    FechaHoraFin TIMESTAMP NOT NULL,
    PrecioBase NUMERIC(10, 2) NOT NULL,
    SubvencionAplicada NUMERIC(10, 2) DEFAULT 0.00,
    PrecioFinal NUMERIC(10, 2) NOT NULL,
    Estado VARCHAR(50),
    CHECK (FechaHoraFin >= FechaHoraInicio)
);

CREATE TABLE IF NOT EXISTS TRANSACCION (
    IDTransaccion SERIAL PRIMARY KEY,
    IDServicio INT UNIQUE NOT NULL REFERENCES SERVICIO(IDServicio) ON DELETE CASCADE,
    FechaTransaccion TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    Monto NUMERIC(10, 2) NOT NULL,
    EstadoPago VARCHAR(50)
);

CREATE TABLE IF NOT EXISTS RESENA (
    IDResena SERIAL PRIMARY KEY,
    IDServicio INT UNIQUE NOT NULL REFERENCES SERVICIO(IDServicio) ON DELETE CASCADE,
    IDUsuario INT NOT NULL REFERENCES USUARIA(IDUsuario) ON DELETE CASCADE,
    Puntuacion INT CHECK (Puntuacion BETWEEN 1 AND 5),
    Comentario TEXT,
    FechaResena TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Destination of the durations computed in Redis (MySQL only).
pub const REGISTRO_TIEMPO_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS REGISTRO_TIEMPO (
    IDRegistro INT PRIMARY KEY AUTO_INCREMENT,
    IDServicioOriginal INT UNIQUE,
    NombreUsuario VARCHAR(100),
    NombreCuidador VARCHAR(100),
    NombreCentro VARCHAR(100),
    DuracionMinutos INT,
    FechaCalculo DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

fn comment_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"--[^\n]*").expect("valid single-line comment pattern"),
            Regex::new(r"/\*[\s\S]*?\*/").expect("valid block comment pattern"),
        )
    })
}

/// Remove SQL comments
pub fn remove_comments(sql: &str) -> String {
    let (single_line_re, multi_line_re) = comment_patterns();
    let sql = single_line_re.replace_all(sql, "");
    multi_line_re.replace_all(&sql, "").to_string()
}

/// Split a script into individual statements, dropping comments and blanks.
///
/// The scripts in this module never contain `;` inside string literals, so a
/// plain split is enough.
pub fn split_statements(script: &str) -> Vec<String> {
    remove_comments(script)
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements() {
        let script = r#"
            -- leading comment
            CREATE TABLE a (id INT);
            /* block
               comment; with a semicolon */
            CREATE TABLE b (id INT);

            ;
        "#;

        let statements = split_statements(script);
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);
    }

    #[test]
    fn test_scripts_create_every_table_in_order() {
        for script in [MYSQL_TABLES_SQL, POSTGRES_TABLES_SQL] {
            let statements = split_statements(script);
            assert_eq!(statements.len(), TABLES.len());

            for (statement, table) in statements.iter().zip(TABLES.iter()) {
                let expected = format!("CREATE TABLE IF NOT EXISTS {} (", table);
                assert!(
                    statement.starts_with(&expected),
                    "expected {} first line, got: {}",
                    table,
                    statement.lines().next().unwrap_or("")
                );
            }
        }
    }

    #[test]
    fn test_dialects_differ_only_where_expected() {
        assert!(MYSQL_TABLES_SQL.contains("AUTO_INCREMENT"));
        assert!(!MYSQL_TABLES_SQL.contains("SERIAL"));
        assert!(POSTGRES_TABLES_SQL.contains("SERIAL PRIMARY KEY"));
        assert!(!POSTGRES_TABLES_SQL.contains("DATETIME"));
    }

    #[test]
    fn test_id_columns_cover_tables() {
        let tables: Vec<&str> = ID_COLUMNS.iter().map(|(t, _)| *t).collect();
        assert_eq!(tables, TABLES.to_vec());
    }
}
