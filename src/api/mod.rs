//! API service modules for Developer API endpoints.

mod datasets;

pub use datasets::DatasetsService;
