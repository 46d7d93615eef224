use crate::error::Result;
use crate::pool::StoreConnector;
use crate::schema::{MySqlSchema, PostgresSchema};
use crate::seed::generator::SeedDataset;
use sqlx::Connection;
use tracing::{debug, info};

/// Replace the MySQL contents with `data`, all inserts in one transaction.
pub async fn populate_mysql(connector: &StoreConnector, db_name: &str, data: &SeedDataset) -> Result<usize> {
    let mut conn = connector.mysql(Some(db_name)).await?;

    MySqlSchema::new()
        .truncate_all(&mut conn, &["REGISTRO_TIEMPO"])
        .await?;

    let mut tx = conn.begin().await?;

    debug!("MySQL: inserting {} usuarias", data.usuarias.len());
    for u in &data.usuarias {
        sqlx::query(
            "INSERT INTO USUARIA (IDUsuario, Nombre, Apellido, DNI, FechaNacimiento, Barrio, RentaPercapita, Telefono, Email, Genero)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(u.id)
        .bind(&u.nombre)
        .bind(&u.apellido)
        .bind(&u.dni)
        .bind(u.fecha_nacimiento)
        .bind(&u.barrio)
        .bind(u.renta_percapita)
        .bind(&u.telefono)
        .bind(&u.email)
        .bind(&u.genero)
        .execute(&mut *tx)
        .await?;
    }

    for d in &data.dependientes {
        sqlx::query(
            "INSERT INTO DEPENDIENTE (IDDependiente, IDUsuario, Nombre, Apellido, TipoDependencia, FechaNacimiento, PerfilMedico)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(d.id)
        .bind(d.id_usuario)
        .bind(&d.nombre)
        .bind(&d.apellido)
        .bind(&d.tipo_dependencia)
        .bind(d.fecha_nacimiento)
        .bind(&d.perfil_medico)
        .execute(&mut *tx)
        .await?;
    }

    for c in &data.cuidadores {
        sqlx::query(
            "INSERT INTO CUIDADOR (IDCuidador, Nombre, Apellido, DNI, Telefono, Disponibilidad, Especialidad)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(c.id)
        .bind(&c.nombre)
        .bind(&c.apellido)
        .bind(&c.dni)
        .bind(&c.telefono)
        .bind(&c.disponibilidad)
        .bind(&c.especialidad)
        .execute(&mut *tx)
        .await?;
    }

    for c in &data.centros {
        sqlx::query(
            "INSERT INTO CENTRO (IDCentro, NombreCentro, Direccion, DescripcionCentro, CapacidadMaxima)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(c.id)
        .bind(&c.nombre)
        .bind(&c.direccion)
        .bind(&c.descripcion)
        .bind(c.capacidad_maxima)
        .execute(&mut *tx)
        .await?;
    }

    debug!("MySQL: inserting {} servicios", data.servicios.len());
    for s in &data.servicios {
        sqlx::query(
            "INSERT INTO SERVICIO (IDServicio, IDUsuario, IDDependiente, IDCuidador, IDCentro, FechaHoraInicio, FechaHoraFin, PrecioBase, SubvencionAplicada, PrecioFinal, Estado)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(s.id)
        .bind(s.id_usuario)
        .bind(s.id_dependiente)
        .bind(s.id_cuidador)
        .bind(s.id_centro)
        .bind(s.inicio)
        .bind(s.fin)
        .bind(s.precio_base)
        .bind(s.subvencion)
        .bind(s.precio_final)
        .bind(s.estado.as_str())
        .execute(&mut *tx)
        .await?;
    }

    for t in &data.transacciones {
        sqlx::query(
            "INSERT INTO TRANSACCION (IDTransaccion, IDServicio, FechaTransaccion, Monto, EstadoPago)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(t.id)
        .bind(t.id_servicio)
        .bind(t.fecha)
        .bind(t.monto)
        .bind(&t.estado_pago)
        .execute(&mut *tx)
        .await?;
    }

    for r in &data.resenas {
        sqlx::query(
            "INSERT INTO RESENA (IDResena, IDServicio, IDUsuario, Puntuacion, Comentario, FechaResena)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(r.id)
        .bind(r.id_servicio)
        .bind(r.id_usuario)
        .bind(r.puntuacion)
        .bind(&r.comentario)
        .bind(r.fecha)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    conn.close().await?;

    info!("MySQL: {} rows inserted", data.total_rows());
    Ok(data.total_rows())
}

/// Replace the PostgreSQL contents with `data`, then realign the serial sequences.
pub async fn populate_postgres(connector: &StoreConnector, db_name: &str, data: &SeedDataset) -> Result<usize> {
    let pool = connector.postgres(db_name).await?;
    let mut client = pool.get().await?;

    let schema = PostgresSchema::new();
    schema.truncate_all(&client).await?;

    let tx = client.transaction().await?;

    let stmt = tx
        .prepare(
            "INSERT INTO USUARIA (IDUsuario, Nombre, Apellido, DNI, FechaNacimiento, Barrio, RentaPercapita, Telefono, Email, Genero)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .await?;
    for u in &data.usuarias {
        tx.execute(
            &stmt,
            &[
                &u.id,
                &u.nombre,
                &u.apellido,
                &u.dni,
                &u.fecha_nacimiento,
                &u.barrio,
                &u.renta_percapita,
                &u.telefono,
                &u.email,
                &u.genero,
            ],
        )
        .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO DEPENDIENTE (IDDependiente, IDUsuario, Nombre, Apellido, TipoDependencia, FechaNacimiento, PerfilMedico)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .await?;
    for d in &data.dependientes {
        tx.execute(
            &stmt,
            &[
                &d.id,
                &d.id_usuario,
                &d.nombre,
                &d.apellido,
                &d.tipo_dependencia,
                &d.fecha_nacimiento,
                &d.perfil_medico,
            ],
        )
        .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO CUIDADOR (IDCuidador, Nombre, Apellido, DNI, Telefono, Disponibilidad, Especialidad)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .await?;
    for c in &data.cuidadores {
        tx.execute(
            &stmt,
            &[&c.id, &c.nombre, &c.apellido, &c.dni, &c.telefono, &c.disponibilidad, &c.especialidad],
        )
        .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO CENTRO (IDCentro, NombreCentro, Direccion, DescripcionCentro, CapacidadMaxima)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .await?;
    for c in &data.centros {
        tx.execute(
            &stmt,
            &[&c.id, &c.nombre, &c.direccion, &c.descripcion, &c.capacidad_maxima],
        )
        .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO SERVICIO (IDServicio, IDUsuario, IDDependiente, IDCuidador, IDCentro, FechaHoraInicio, FechaHoraFin, PrecioBase, SubvencionAplicada, PrecioFinal, Estado)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .await?;
    for s in &data.servicios {
        let estado = s.estado.as_str();
        tx.execute(
            &stmt,
            &[
                &s.id,
                &s.id_usuario,
                &s.id_dependiente,
                &s.id_cuidador,
                &s.id_centro,
                &s.inicio,
                &s.fin,
                &s.precio_base,
                &s.subvencion,
                &s.precio_final,
                &estado,
            ],
        )
        .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO TRANSACCION (IDTransaccion, IDServicio, FechaTransaccion, Monto, EstadoPago)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .await?;
    for t in &data.transacciones {
        tx.execute(&stmt, &[&t.id, &t.id_servicio, &t.fecha, &t.monto, &t.estado_pago])
            .await?;
    }

    let stmt = tx
        .prepare(
            "INSERT INTO RESENA (IDResena, IDServicio, IDUsuario, Puntuacion, Comentario, FechaResena)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .await?;
    for r in &data.resenas {
        tx.execute(
            &stmt,
            &[&r.id, &r.id_servicio, &r.id_usuario, &r.puntuacion, &r.comentario, &r.fecha],
        )
        .await?;
    }

    tx.commit().await?;
    schema.realign_sequences(&client).await?;

    info!("PostgreSQL: {} rows inserted", data.total_rows());
    Ok(data.total_rows())
}
