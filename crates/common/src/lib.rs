//! Common types, request validation, and errors shared across `node-serviced` crates.

pub mod error;
pub mod protocol;
pub mod validation;

pub use error::ServiceError;
pub use validation::{CoreVersion, Region, ValidationError};
