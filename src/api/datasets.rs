//! Dataset service: row queries, counts, documentation and DDL.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::paginated::{record_count, PaginatedStreamBuilder};
use crate::client::{ApiRequest, ClientInner, PaginatedStream};
use crate::models::{DatasetName, Dialect, FieldDoc, Query, Row};
use crate::{Error, Result};

/// Service for dataset operations.
///
/// # Example
///
/// ```no_run
/// use enverus_rs::Query;
///
/// # async fn example(client: enverus_rs::DeveloperApiClient) -> enverus_rs::Result<()> {
/// let wells = client.datasets();
///
/// let query = Query::new()
///     .filter("updateddate", "ge(2021-05-01)")
///     .filter("StateProvince", "in(TX,LA,WY)");
/// let count = wells.count("wells", &query).await?;
///
/// let ddl = wells.ddl("wells", "pg").await?;
/// assert!(ddl.starts_with("CREATE TABLE wells"));
/// # Ok(())
/// # }
/// ```
pub struct DatasetsService {
    inner: Arc<ClientInner>,
}

impl DatasetsService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Stream every row of `dataset` matching `query`.
    ///
    /// Pages are fetched lazily as the stream is polled, each with the
    /// current token. Errors surface on the poll that triggered the failing
    /// request.
    pub fn query(&self, dataset: impl Into<DatasetName>, query: Query) -> PaginatedStream<Row> {
        self.query_as::<Row>(dataset, query)
    }

    /// Like [`query`](Self::query), decoding rows into `T`.
    pub fn query_as<T>(&self, dataset: impl Into<DatasetName>, query: Query) -> PaginatedStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut builder = PaginatedStreamBuilder::<T>::new(self.inner.clone(), dataset.into());
        if let Some(page_size) = query.page_size {
            builder = builder.page_size(page_size);
        }
        builder.build(query)
    }

    /// Count rows of `dataset` matching `query` without fetching them.
    ///
    /// The query's page size is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the service does not know `dataset`.
    pub async fn count(&self, dataset: impl Into<DatasetName>, query: &Query) -> Result<u64> {
        let dataset = dataset.into();
        dataset.validate()?;

        let request = ApiRequest {
            method: Method::HEAD,
            url: self.inner.dataset_url(&dataset),
            params: query.filter_params(),
            dataset,
        };

        let response = self.inner.execute(&request).await?;
        let count = record_count(&response.headers).ok_or_else(|| {
            Error::UnexpectedResponse(format!(
                "count for '{}' returned no record count header",
                request.dataset
            ))
        })?;

        debug!(dataset = %request.dataset, count, "counted rows");
        Ok(count)
    }

    /// Fetch the field documentation for `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the service does not know `dataset`.
    pub async fn docs(&self, dataset: impl Into<DatasetName>) -> Result<Vec<FieldDoc>> {
        let dataset = dataset.into();
        dataset.validate()?;

        let request = ApiRequest {
            method: Method::OPTIONS,
            url: self.inner.dataset_url(&dataset),
            params: vec![("docs".to_string(), "true".to_string())],
            dataset,
        };

        let response = self.inner.execute(&request).await?;
        let docs: Vec<FieldDoc> = serde_json::from_slice(&response.body)?;

        debug!(dataset = %request.dataset, fields = docs.len(), "fetched docs");
        Ok(docs)
    }

    /// Fetch a generated `CREATE TABLE` statement for `dataset`.
    ///
    /// `database` names the dialect (`"pg"` or `"mssql"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] for an unsupported dialect, before any
    /// request is made, and [`Error::Dataset`] for an unknown dataset.
    pub async fn ddl(&self, dataset: impl Into<DatasetName>, database: &str) -> Result<String> {
        let dialect: Dialect = database.parse()?;
        self.ddl_for(dataset, dialect).await
    }

    /// Fetch DDL for an already-parsed dialect.
    pub async fn ddl_for(&self, dataset: impl Into<DatasetName>, dialect: Dialect) -> Result<String> {
        let dataset = dataset.into();
        dataset.validate()?;

        let request = ApiRequest {
            method: Method::OPTIONS,
            url: self.inner.dataset_url(&dataset),
            params: vec![("ddl".to_string(), dialect.as_str().to_string())],
            dataset,
        };

        let response = self.inner.execute(&request).await?;
        let ddl = response.into_text()?;

        debug!(dataset = %request.dataset, %dialect, bytes = ddl.len(), "fetched ddl");
        Ok(ddl)
    }
}
