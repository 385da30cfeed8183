//! Identity fields used to obtain bearer tokens.

use secrecy::{ExposeSecret, SecretString};

use crate::{ApiVersion, Error, Result};

/// Credentials for one client instance.
///
/// The API version decides which identity fields are mandatory:
/// v3 needs only the secret key, v2 needs the API key plus the OAuth
/// client id/secret pair. Missing fields are caught by [`validate`]
/// before any request is made.
///
/// [`validate`]: Credentials::validate
///
/// # Example
///
/// ```
/// use enverus_rs::Credentials;
///
/// let creds = Credentials::v3("my-secret-key").with_access_token("cached-token");
/// assert!(creds.validate().is_ok());
///
/// let missing = Credentials::v2("api-key", "", "client-secret");
/// assert!(missing.validate().is_err());
/// ```
#[derive(Clone)]
pub struct Credentials {
    pub(crate) version: ApiVersion,
    pub(crate) api_key: Option<SecretString>,
    pub(crate) client_id: Option<String>,
    pub(crate) client_secret: Option<SecretString>,
    pub(crate) access_token: Option<SecretString>,
}

impl Credentials {
    /// Build credentials from optional parts.
    ///
    /// `api_key` is the v3 secret key or the v2 API key. Empty strings count
    /// as missing.
    pub fn new(
        version: ApiVersion,
        api_key: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            version,
            api_key: non_empty(api_key).map(SecretString::from),
            client_id: non_empty(client_id),
            client_secret: non_empty(client_secret).map(SecretString::from),
            access_token: None,
        }
    }

    /// Developer API v3 credentials.
    pub fn v3(secret_key: impl Into<String>) -> Self {
        Self::new(ApiVersion::V3, Some(secret_key.into()), None, None)
    }

    /// Direct Access v2 credentials.
    pub fn v2(
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::new(
            ApiVersion::V2,
            Some(api_key.into()),
            Some(client_id.into()),
            Some(client_secret.into()),
        )
    }

    /// Seed the client with a previously issued token.
    ///
    /// The token is used as-is; if the server rejects it the client
    /// re-authenticates once with the identity fields.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = non_empty(Some(token.into())).map(SecretString::from);
        self
    }

    /// The API version these credentials are for.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Check that every identity field required by the version is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            Err(Error::Authentication(format!(
                "missing {} for {} credentials",
                field, self.version
            )))
        };

        match self.version {
            ApiVersion::V3 => {
                if self.api_key.is_none() {
                    return missing("secret_key");
                }
            }
            ApiVersion::V2 => {
                if self.api_key.is_none() {
                    return missing("api_key");
                }
                if self.client_id.is_none() {
                    return missing("client_id");
                }
                if self.client_secret.is_none() {
                    return missing("client_secret");
                }
            }
        }
        Ok(())
    }

    pub(crate) fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |present: bool| if present { "[REDACTED]" } else { "None" };
        f.debug_struct("Credentials")
            .field("version", &self.version)
            .field("api_key", &redact(self.api_key.is_some()))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(self.client_secret.is_some()))
            .field("access_token", &redact(self.access_token.is_some()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v3_requires_secret_key() {
        assert!(Credentials::v3("key").validate().is_ok());

        let err = Credentials::new(ApiVersion::V3, None, None, None)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m.contains("secret_key")));

        assert!(Credentials::v3("   ").validate().is_err());
    }

    #[test]
    fn test_v2_requires_all_fields() {
        assert!(Credentials::v2("key", "id", "secret").validate().is_ok());

        for (creds, field) in [
            (Credentials::v2("", "id", "secret"), "api_key"),
            (Credentials::v2("key", "", "secret"), "client_id"),
            (Credentials::v2("key", "id", ""), "client_secret"),
        ] {
            let err = creds.validate().unwrap_err();
            assert!(
                matches!(err, Error::Authentication(ref m) if m.contains(field)),
                "expected missing {field}, got {err}"
            );
        }
    }

    #[test]
    fn test_access_token_does_not_replace_identity() {
        let creds = Credentials::new(ApiVersion::V3, None, None, None).with_access_token("tok");
        assert!(creds.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::v2("api-key-value", "client-id", "client-secret-value")
            .with_access_token("token-value");
        let debug_str = format!("{:?}", creds);

        assert!(!debug_str.contains("api-key-value"));
        assert!(!debug_str.contains("client-secret-value"));
        assert!(!debug_str.contains("token-value"));
        assert!(debug_str.contains("client-id"));
    }
}
