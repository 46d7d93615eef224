//! DynamoDB tables with and without secondary indexes, and a tour of the item API.

use crate::error::{LabError, Result};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    LocalSecondaryIndex, Projection, ProjectionType, ProvisionedThroughput, ScalarAttributeType,
    TableStatus,
};
use aws_sdk_dynamodb::Client;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const T_SIMPLE: &str = "CentroCuidado_Log_Simple";
pub const T_LSI: &str = "CentroCuidado_Pagos_LSI";
pub const T_GSI: &str = "CentroCuidado_Usuarios_GSI";

pub const LSI_MONTO: &str = "IndiceMonto";
pub const GSI_EMAIL: &str = "IndiceEmail";

const CAPACITY_UNITS: i64 = 5;
const ACTIVE_POLL_ATTEMPTS: u32 = 30;
const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub type Item = HashMap<String, AttributeValue>;

/// DynamoDB attribute to plain JSON. Numbers become f64, binary values null.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => item_to_json(map),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(String::as_str).map(number).collect()),
        _ => Value::Null,
    }
}

fn number(raw: &str) -> Value {
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Value {
    let map: Map<String, Value> = item
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();
    Value::Object(map)
}

fn items_to_json(items: &[Item]) -> Vec<Value> {
    items.iter().map(item_to_json).collect()
}

fn item(attributes: &[(&str, AttributeValue)]) -> Item {
    attributes
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn n(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn sdk_error<E>(operation: &str) -> impl FnOnce(E) -> LabError + '_
where
    E: std::error::Error + 'static,
{
    move |e| LabError::dynamo(operation, DisplayErrorContext(e))
}

fn key(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    Ok(KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()?)
}

fn attribute(name: &str, kind: ScalarAttributeType) -> Result<AttributeDefinition> {
    Ok(AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(kind)
        .build()?)
}

fn throughput() -> Result<ProvisionedThroughput> {
    Ok(ProvisionedThroughput::builder()
        .read_capacity_units(CAPACITY_UNITS)
        .write_capacity_units(CAPACITY_UNITS)
        .build()?)
}

fn project_all() -> Projection {
    Projection::builder().projection_type(ProjectionType::All).build()
}

async fn create_simple_table(client: &Client) -> Result<()> {
    client
        .create_table()
        .table_name(T_SIMPLE)
        .key_schema(key("LogID", KeyType::Hash)?)
        .attribute_definitions(attribute("LogID", ScalarAttributeType::S)?)
        .provisioned_throughput(throughput()?)
        .send()
        .await
        .map_err(sdk_error("create_table"))?;
    Ok(())
}

async fn create_lsi_table(client: &Client) -> Result<()> {
    let index = LocalSecondaryIndex::builder()
        .index_name(LSI_MONTO)
        .key_schema(key("UsuarioID", KeyType::Hash)?)
        .key_schema(key("Monto", KeyType::Range)?)
        .projection(project_all())
        .build()?;

    client
        .create_table()
        .table_name(T_LSI)
        .key_schema(key("UsuarioID", KeyType::Hash)?)
        .key_schema(key("FechaPago", KeyType::Range)?)
        .attribute_definitions(attribute("UsuarioID", ScalarAttributeType::S)?)
        .attribute_definitions(attribute("FechaPago", ScalarAttributeType::S)?)
        .attribute_definitions(attribute("Monto", ScalarAttributeType::N)?)
        .local_secondary_indexes(index)
        .provisioned_throughput(throughput()?)
        .send()
        .await
        .map_err(sdk_error("create_table"))?;
    Ok(())
}

async fn create_gsi_table(client: &Client) -> Result<()> {
    let index = GlobalSecondaryIndex::builder()
        .index_name(GSI_EMAIL)
        .key_schema(key("Email", KeyType::Hash)?)
        .projection(project_all())
        .provisioned_throughput(throughput()?)
        .build()?;

    client
        .create_table()
        .table_name(T_GSI)
        .key_schema(key("UsuarioID", KeyType::Hash)?)
        .attribute_definitions(attribute("UsuarioID", ScalarAttributeType::S)?)
        .attribute_definitions(attribute("Email", ScalarAttributeType::S)?)
        .global_secondary_indexes(index)
        .provisioned_throughput(throughput()?)
        .send()
        .await
        .map_err(sdk_error("create_table"))?;
    Ok(())
}

async fn wait_until_active(client: &Client, table: &str) -> Result<()> {
    for attempt in 1..=ACTIVE_POLL_ATTEMPTS {
        let output = client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(sdk_error("describe_table"))?;

        let status = output.table.and_then(|t| t.table_status);
        if status == Some(TableStatus::Active) {
            debug!("Table {} active after {} checks", table, attempt);
            return Ok(());
        }
        tokio::time::sleep(ACTIVE_POLL_INTERVAL).await;
    }

    Err(LabError::dynamo(
        "describe_table",
        format!("table {} not ACTIVE after {} checks", table, ACTIVE_POLL_ATTEMPTS),
    ))
}

/// Create the three tables that do not exist yet and wait for all of them to be ACTIVE.
pub async fn create_tables(client: &Client) -> Result<usize> {
    let existing = client
        .list_tables()
        .send()
        .await
        .map_err(sdk_error("list_tables"))?
        .table_names
        .unwrap_or_default();

    let mut created = 0;
    for table in [T_SIMPLE, T_LSI, T_GSI] {
        if existing.iter().any(|t| t == table) {
            debug!("Table {} already exists", table);
            continue;
        }
        info!("Creating {}...", table);
        match table {
            T_SIMPLE => create_simple_table(client).await?,
            T_LSI => create_lsi_table(client).await?,
            _ => create_gsi_table(client).await?,
        }
        created += 1;
    }

    info!("Waiting for the tables to be ACTIVE...");
    for table in [T_SIMPLE, T_LSI, T_GSI] {
        wait_until_active(client, table).await?;
    }

    Ok(created)
}

pub fn seed_items() -> Vec<(&'static str, Item)> {
    vec![
        (T_SIMPLE, item(&[("LogID", s("L1")), ("Mensaje", s("Inicio sesión")), ("Nivel", s("INFO"))])),
        (T_SIMPLE, item(&[("LogID", s("L2")), ("Mensaje", s("Error conexión")), ("Nivel", s("ERROR"))])),
        (T_SIMPLE, item(&[("LogID", s("L3")), ("Mensaje", s("Logout")), ("Nivel", s("INFO"))])),
        (
            T_LSI,
            item(&[("UsuarioID", s("U1")), ("FechaPago", s("2023-01-01")), ("Monto", n(100)), ("Concepto", s("Mensualidad"))]),
        ),
        (
            T_LSI,
            item(&[("UsuarioID", s("U1")), ("FechaPago", s("2023-02-01")), ("Monto", n(150)), ("Concepto", s("Extra"))]),
        ),
        (
            T_LSI,
            item(&[("UsuarioID", s("U2")), ("FechaPago", s("2023-01-05")), ("Monto", n(500)), ("Concepto", s("Anual"))]),
        ),
        (
            T_GSI,
            item(&[("UsuarioID", s("U100")), ("Email", s("ana@test.com")), ("Nombre", s("Ana")), ("Estado", s("Activo"))]),
        ),
        (
            T_GSI,
            item(&[("UsuarioID", s("U200")), ("Email", s("luis@test.com")), ("Nombre", s("Luis")), ("Estado", s("Inactivo"))]),
        ),
        (
            T_GSI,
            item(&[("UsuarioID", s("U300")), ("Email", s("maria@test.com")), ("Nombre", s("Maria")), ("Estado", s("Activo"))]),
        ),
    ]
}

async fn insert_items(client: &Client) -> Result<()> {
    for (table, item) in seed_items() {
        client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(sdk_error("put_item"))?;
    }
    info!("3 items inserted in each table");
    Ok(())
}

async fn basic_crud(client: &Client) -> Result<()> {
    let got = client
        .get_item()
        .table_name(T_SIMPLE)
        .key("LogID", s("L1"))
        .send()
        .await
        .map_err(sdk_error("get_item"))?;
    let l1 = got.item.as_ref().map(item_to_json).unwrap_or(Value::Null);
    info!("1. Get L1: {}", l1);

    client
        .update_item()
        .table_name(T_SIMPLE)
        .key("LogID", s("L1"))
        .update_expression("SET Mensaje = :m")
        .expression_attribute_values(":m", s("Inicio sesión (Actualizado)"))
        .send()
        .await
        .map_err(sdk_error("update_item"))?;
    info!("2. L1 updated");

    client
        .delete_item()
        .table_name(T_SIMPLE)
        .key("LogID", s("L3"))
        .send()
        .await
        .map_err(sdk_error("delete_item"))?;
    info!("3. L3 deleted");

    Ok(())
}

async fn scan_all(client: &Client) -> Result<Vec<Value>> {
    let output = client
        .scan()
        .table_name(T_SIMPLE)
        .send()
        .await
        .map_err(sdk_error("scan"))?;
    Ok(items_to_json(output.items()))
}

async fn scan_errors(client: &Client) -> Result<Vec<Value>> {
    let output = client
        .scan()
        .table_name(T_SIMPLE)
        .filter_expression("Nivel = :nivel")
        .expression_attribute_values(":nivel", s("ERROR"))
        .send()
        .await
        .map_err(sdk_error("scan"))?;
    Ok(items_to_json(output.items()))
}

async fn query_by_email(client: &Client, email: &str) -> Result<Vec<Value>> {
    let output = client
        .query()
        .table_name(T_GSI)
        .index_name(GSI_EMAIL)
        .key_condition_expression("Email = :email")
        .expression_attribute_values(":email", s(email))
        .send()
        .await
        .map_err(sdk_error("query"))?;
    Ok(items_to_json(output.items()))
}

/// Delete `usuario_id` only while its Estado is Inactivo. Returns whether the item was deleted.
async fn delete_if_inactive(client: &Client, usuario_id: &str) -> Result<bool> {
    let result = client
        .delete_item()
        .table_name(T_GSI)
        .key("UsuarioID", s(usuario_id))
        .condition_expression("Estado = :estado")
        .expression_attribute_values(":estado", s("Inactivo"))
        .send()
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(e) => {
            let blocked = e
                .as_service_error()
                .map(|se| se.is_conditional_check_failed_exception())
                .unwrap_or(false);
            if blocked {
                Ok(false)
            } else {
                Err(sdk_error("delete_item")(e))
            }
        }
    }
}

async fn query_payments_above(client: &Client, usuario_id: &str, monto: i64) -> Result<Vec<Value>> {
    let output = client
        .query()
        .table_name(T_LSI)
        .index_name(LSI_MONTO)
        .key_condition_expression("UsuarioID = :u AND Monto > :m")
        .expression_attribute_values(":u", s(usuario_id))
        .expression_attribute_values(":m", n(monto))
        .send()
        .await
        .map_err(sdk_error("query"))?;
    Ok(items_to_json(output.items()))
}

async fn partiql(client: &Client) -> Result<()> {
    let select = format!("SELECT * FROM \"{}\" WHERE Nivel = 'ERROR'", T_SIMPLE);
    let output = client
        .execute_statement()
        .statement(select)
        .send()
        .await
        .map_err(sdk_error("execute_statement"))?;
    info!("PartiQL select (Nivel = ERROR): {:?}", items_to_json(output.items()));

    let insert = format!(
        "INSERT INTO \"{}\" VALUE {{'LogID': 'L99', 'Mensaje': 'Creado con PartiQL', 'Nivel': 'WARN'}}",
        T_SIMPLE
    );
    client
        .execute_statement()
        .statement(insert)
        .send()
        .await
        .map_err(sdk_error("execute_statement"))?;
    info!("L99 inserted with PartiQL");

    Ok(())
}

/// Full DynamoDB walkthrough: tables, inserts, CRUD, scans, index queries,
/// conditional delete and PartiQL.
pub async fn run(client: &Client) -> Result<()> {
    info!("--- CREATING TABLES ---");
    let created = create_tables(client).await?;
    info!("{} tables created", created);

    info!("--- INSERTING ITEMS ---");
    insert_items(client).await?;

    info!("--- BASIC CRUD ---");
    basic_crud(client).await?;

    info!("--- SCAN ---");
    info!("Items in {}: {:?}", T_SIMPLE, scan_all(client).await?);

    info!("--- FILTERED SCAN AND GSI ---");
    info!("1. Scan Nivel = ERROR: {:?}", scan_errors(client).await?);
    info!("2. {} Email = luis@test.com: {:?}", GSI_EMAIL, query_by_email(client, "luis@test.com").await?);

    info!("--- CONDITIONAL DELETE ---");
    if delete_if_inactive(client, "U100").await? {
        warn!(" -> Ana was deleted although she is Activo");
    } else {
        info!(" -> Ana (Activo) blocked by the condition");
    }
    if delete_if_inactive(client, "U200").await? {
        info!(" -> Luis (Inactivo) deleted");
    } else {
        warn!(" -> Luis was not deleted");
    }

    info!("--- LSI QUERY ---");
    info!("U1 payments above 120: {:?}", query_payments_above(client, "U1", 120).await?);

    info!("--- PARTIQL ---");
    if let Err(e) = partiql(client).await {
        error!("PartiQL error: {}", e);
    }

    Ok(())
}

/// Items of the GSI table whose Estado is Activo.
pub async fn active_users(client: &Client) -> Result<Vec<Value>> {
    let output = client
        .scan()
        .table_name(T_GSI)
        .filter_expression("Estado = :estado")
        .expression_attribute_values(":estado", s("Activo"))
        .send()
        .await
        .map_err(sdk_error("scan"))?;
    Ok(items_to_json(output.items()))
}
