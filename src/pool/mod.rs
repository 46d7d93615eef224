mod manager;

pub use manager::{create_pool, is_valid_identifier, StoreConnector};
