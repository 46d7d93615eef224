//! Redis demos on top of the MySQL care center data.

pub mod durations;
pub mod keys;
pub mod reply;
mod source;
pub mod sync;
pub mod walkthrough;

pub use source::{fetch_servicios, ServicioRow};
