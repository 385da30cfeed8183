//! Data models for the Developer API.
//!
//! - [`primitives`] - `DatasetName`, `ApiVersion`, `Dialect`
//! - [`query`] - query parameters and filter predicates
//! - [`docs`] - dataset field documentation
//! - [`record`] - row records

pub mod primitives;
pub mod query;
pub mod docs;
pub mod record;

pub use primitives::*;
pub use query::*;
pub use docs::*;
pub use record::*;
