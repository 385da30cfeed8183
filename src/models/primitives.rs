//! Primitive types and newtypes for type-safe API interactions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A strongly-typed dataset (endpoint) name such as `"rigs"` or `"casings"`.
///
/// Whether a dataset exists is decided by the service; locally we only
/// reject names that cannot form a single path segment.
///
/// # Example
///
/// ```
/// use enverus_rs::DatasetName;
///
/// let dataset = DatasetName::new("rigs");
/// assert_eq!(dataset.as_str(), "rigs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetName(String);

impl DatasetName {
    /// Create a new dataset name.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the dataset name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the name can be used as a URL path segment.
    pub(crate) fn validate(&self) -> Result<()> {
        let name = self.0.trim();
        if name.is_empty() || name.contains('/') || name.contains('?') || name.contains('#') {
            return Err(Error::Dataset(self.0.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DatasetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for DatasetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DatasetName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&DatasetName> for DatasetName {
    fn from(s: &DatasetName) -> Self {
        s.clone()
    }
}

/// Generation of the Developer API, which also fixes the auth mode.
///
/// # Example
///
/// ```
/// use enverus_rs::ApiVersion;
///
/// println!("API URL: {}", ApiVersion::V3.default_base_url());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiVersion {
    /// Legacy Direct Access v2: API key plus OAuth client credentials.
    V2,
    /// Developer API v3: a single secret key.
    #[default]
    V3,
}

impl ApiVersion {
    /// Get the default base URL for REST requests.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiVersion::V2 => "https://di-api.drillinginfo.com/v2/direct-access",
            ApiVersion::V3 => "https://api.enverus.com/v3/direct-access",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V2 => write!(f, "v2"),
            ApiVersion::V3 => write!(f, "v3"),
        }
    }
}

/// Target database dialect for generated DDL.
///
/// # Example
///
/// ```
/// use enverus_rs::Dialect;
///
/// let dialect: Dialect = "pg".parse().unwrap();
/// assert_eq!(dialect, Dialect::Postgres);
/// assert!("oracle".parse::<Dialect>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL
    #[serde(rename = "pg")]
    Postgres,
    /// Microsoft SQL Server
    #[serde(rename = "mssql")]
    SqlServer,
}

impl Dialect {
    /// Identifier the service expects in the `ddl` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "pg",
            Dialect::SqlServer => "mssql",
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mssql" | "sqlserver" => Ok(Dialect::SqlServer),
            other => Err(Error::Query(format!(
                "unsupported DDL database '{}'; expected one of: pg, mssql",
                other
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
