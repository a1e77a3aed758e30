//! Bearer tokens for Google APIs.
//!
//! Document AI takes a short-lived OAuth access token. A fixed token works
//! until it expires; service-account and application-default credentials
//! mint and cache fresh tokens through `gcp_auth`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use perceptor_core::PerceptorError;

/// OAuth scope accepted by Document AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const SERVICE: &str = "google_auth";

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    fn name(&self) -> &str;

    /// A token valid for at least the next request.
    async fn access_token(&self) -> Result<String, PerceptorError>;
}

/// A token supplied verbatim, e.g. from `gcloud auth print-access-token`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    fn name(&self) -> &str {
        "static"
    }

    async fn access_token(&self) -> Result<String, PerceptorError> {
        Ok(self.0.clone())
    }
}

/// Refreshing tokens from Google credentials.
pub struct GoogleCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
    scopes: Vec<&'static str>,
}

impl GoogleCredentials {
    /// Service-account key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PerceptorError> {
        let path = path.as_ref();
        let account = gcp_auth::CustomServiceAccount::from_file(path).map_err(|e| {
            PerceptorError::Config(format!(
                "cannot read service account {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::with_provider(Arc::new(account)))
    }

    /// Application-default credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// the gcloud user login, or the metadata server.
    pub async fn discover() -> Result<Self, PerceptorError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| PerceptorError::Config(format!("no Google credentials found: {e}")))?;
        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(provider: Arc<dyn gcp_auth::TokenProvider>) -> Self {
        Self {
            provider,
            scopes: vec![CLOUD_PLATFORM_SCOPE],
        }
    }
}

#[async_trait]
impl AccessTokenSource for GoogleCredentials {
    fn name(&self) -> &str {
        "google_credentials"
    }

    async fn access_token(&self) -> Result<String, PerceptorError> {
        let token = self
            .provider
            .token(&self.scopes)
            .await
            .map_err(|e| PerceptorError::upstream(SERVICE, e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_is_returned_verbatim() {
        let source = StaticToken::new("ya29.fixed");
        assert_eq!(source.access_token().await.unwrap(), "ya29.fixed");
        assert_eq!(source.name(), "static");
    }

    #[test]
    fn test_missing_service_account_file_is_config_error() {
        let err = match GoogleCredentials::from_file("/nonexistent/sa.json") {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, PerceptorError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/sa.json"));
    }

    #[test]
    fn test_malformed_service_account_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{ not json").unwrap();
        assert!(matches!(
            GoogleCredentials::from_file(file.path()),
            Err(PerceptorError::Config(_))
        ));
    }
}
