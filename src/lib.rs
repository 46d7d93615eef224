//! Care center data lab
//!
//! Schema management, synthetic data and reports over MySQL, PostgreSQL and
//! MongoDB, plus Redis and AWS (RDS, DynamoDB) demos fed from the same data.

pub mod cache;
pub mod cloud;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod pool;
pub mod report;
pub mod schema;
pub mod seed;
pub mod series;
