//! JSON reports built from the primary stores.

pub mod analysis;
pub mod export;
pub mod high_income;

pub use export::write_json;
