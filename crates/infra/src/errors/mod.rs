//! Infrastructure error mapping.

pub mod conversions;

pub use conversions::{status_error, InfraError};
