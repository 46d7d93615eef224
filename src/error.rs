use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Connection failed to {store}: {cause}")]
    ConnectionFailed { store: String, cause: String },

    #[error("Query failed in {store}: {cause}")]
    QueryFailed { store: String, cause: String },

    #[error("Invalid identifier: {name}")]
    InvalidIdentifier { name: String },

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("DynamoDB error in {operation}: {cause}")]
    Dynamo { operation: String, cause: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabError {
    pub fn config(message: impl Into<String>) -> Self {
        LabError::Config {
            message: message.into(),
        }
    }

    pub fn connection(store: &str, cause: impl ToString) -> Self {
        LabError::ConnectionFailed {
            store: store.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn query(store: &str, cause: impl ToString) -> Self {
        LabError::QueryFailed {
            store: store.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn dynamo(operation: &str, cause: impl ToString) -> Self {
        LabError::Dynamo {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl From<sqlx::Error> for LabError {
    fn from(err: sqlx::Error) -> Self {
        LabError::query("MySQL", err)
    }
}

impl From<tokio_postgres::Error> for LabError {
    fn from(err: tokio_postgres::Error) -> Self {
        LabError::query("PostgreSQL", err)
    }
}

impl From<deadpool_postgres::PoolError> for LabError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        LabError::connection("PostgreSQL", format!("Pool error: {}", err))
    }
}

impl From<mongodb::error::Error> for LabError {
    fn from(err: mongodb::error::Error) -> Self {
        LabError::query("MongoDB", err)
    }
}

impl From<redis::RedisError> for LabError {
    fn from(err: redis::RedisError) -> Self {
        LabError::Redis(err.to_string())
    }
}

impl From<aws_sdk_dynamodb::error::BuildError> for LabError {
    fn from(err: aws_sdk_dynamodb::error::BuildError) -> Self {
        LabError::dynamo("build request", err)
    }
}

pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_store() {
        let err = LabError::connection("MongoDB", "refused");
        assert_eq!(err.to_string(), "Connection failed to MongoDB: refused");

        let err = LabError::query("PostgreSQL", "relation does not exist");
        assert!(err.to_string().starts_with("Query failed in PostgreSQL"));

        let err = LabError::config("RDS_HOST is not set");
        assert_eq!(err.to_string(), "Configuration error: RDS_HOST is not set");
    }
}
