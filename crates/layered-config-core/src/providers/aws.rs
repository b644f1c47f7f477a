//! AWS Providers
//!
//! - `AwsSecretsManagerStore`: `SecretStore` over AWS Secrets Manager
//! - `AwsConnector`: `StoreConnector` that assumes roles through STS and
//!   builds Secrets Manager clients
//!
//! # Example
//!
//! ```rust,ignore
//! use layered_config_core::providers::AwsConnector;
//!
//! let connector = AwsConnector::new().with_endpoint_url("http://localhost:4566");
//! let store = connector.connect(None, Some("us-east-1")).await?;
//! let secret = store.get_secret("prod/database/password").await?;
//! ```

use super::traits::{ProviderError, ProviderResult, SecretStore};
use crate::bootstrap::{RoleRequest, StaticCredentials, StoreConnector};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::config::Credentials;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const PROVIDER_NAME: &str = "layered-config";

/// Error codes that mean the caller's identity was rejected
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "ExpiredTokenException",
    "InvalidSignatureException",
];

/// AWS Secrets Manager backed store
///
/// Secrets are read and written through their `SecretString` payload. A
/// secret holding only binary data is reported as not found.
pub struct AwsSecretsManagerStore {
    client: Client,
}

impl AwsSecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from a loaded SDK configuration
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

impl fmt::Debug for AwsSecretsManagerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSecretsManagerStore")
            .field("region", &self.client.config().region())
            .finish()
    }
}

fn classify<E, R>(operation: &str, secret_id: &str, err: &SdkError<E, R>) -> ProviderError
where
    E: std::error::Error + ProvideErrorMetadata + 'static,
    R: fmt::Debug,
{
    let message = format!("{} {}: {}", operation, secret_id, DisplayErrorContext(err));
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ProviderError::ConnectionError(message),
        _ if err.code().is_some_and(|code| AUTH_ERROR_CODES.contains(&code)) => {
            ProviderError::AuthenticationFailed(message)
        }
        _ => ProviderError::Other(message),
    }
}

// Binary-only secrets carry no SecretString and count as absent.
fn string_payload(secret_id: &str, secret_string: Option<&str>) -> ProviderResult<String> {
    match secret_string {
        Some(value) => Ok(value.to_string()),
        None => {
            debug!(secret_id = secret_id, "Secret has no string payload, treating as absent");
            Err(ProviderError::not_found(secret_id))
        }
    }
}

#[async_trait::async_trait]
impl SecretStore for AwsSecretsManagerStore {
    fn name(&self) -> &str {
        "aws_secrets_manager"
    }

    async fn get_secret(&self, secret_id: &str) -> ProviderResult<String> {
        debug!(secret_id = secret_id, "Getting secret from AWS Secrets Manager");

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception());
                if missing {
                    ProviderError::not_found(secret_id)
                } else {
                    classify("GetSecretValue", secret_id, &e)
                }
            })?;

        string_payload(secret_id, response.secret_string())
    }

    async fn create_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()> {
        debug!(secret_id = secret_id, "Creating secret in AWS Secrets Manager");

        self.client
            .create_secret()
            .name(secret_id)
            .secret_string(value)
            .send()
            .await
            .map_err(|e| classify("CreateSecret", secret_id, &e))?;
        Ok(())
    }

    async fn update_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()> {
        debug!(secret_id = secret_id, "Putting secret value in AWS Secrets Manager");

        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(value)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception());
                if missing {
                    ProviderError::not_found(secret_id)
                } else {
                    classify("PutSecretValue", secret_id, &e)
                }
            })?;
        Ok(())
    }
}

/// Connector for the real AWS endpoints
#[derive(Debug, Clone, Default)]
pub struct AwsConnector {
    /// Override for both STS and Secrets Manager (e.g. LocalStack)
    endpoint_url: Option<String>,
}

impl AwsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send all requests to a custom endpoint
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    async fn load_config(
        &self,
        credentials: Option<&StaticCredentials>,
        region: Option<&str>,
    ) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        // Without explicit credentials the default chain (env, profile,
        // container and instance metadata) is used.
        if let Some(creds) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                PROVIDER_NAME,
            ));
        }
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url.clone());
        }

        loader.load().await
    }
}

#[async_trait::async_trait]
impl StoreConnector for AwsConnector {
    async fn assume_role(
        &self,
        base: &StaticCredentials,
        region: Option<&str>,
        role: &RoleRequest,
    ) -> ProviderResult<StaticCredentials> {
        let role_arn = role.role_arn.as_deref().ok_or_else(|| {
            ProviderError::ConfigurationError("AWS_ROLE_ARN is required to assume a role".to_string())
        })?;
        let session_name = role.session_name.as_deref().ok_or_else(|| {
            ProviderError::ConfigurationError(
                "AWS_ROLE_SESSION_NAME is required to assume a role".to_string(),
            )
        })?;

        let sdk_config = self.load_config(Some(base), region).await;
        let sts = aws_sdk_sts::Client::new(&sdk_config);

        debug!(role_arn = role_arn, session_name = session_name, "Calling STS AssumeRole");
        let output = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| {
                ProviderError::AuthenticationFailed(format!(
                    "AssumeRole {}: {}",
                    role_arn,
                    aws_sdk_sts::error::DisplayErrorContext(&e)
                ))
            })?;

        let creds = output.credentials().ok_or_else(|| {
            ProviderError::AuthenticationFailed(format!("AssumeRole {} returned no credentials", role_arn))
        })?;

        Ok(StaticCredentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_string()),
        ))
    }

    async fn connect(
        &self,
        credentials: Option<&StaticCredentials>,
        region: Option<&str>,
    ) -> ProviderResult<Arc<dyn SecretStore>> {
        let sdk_config = self.load_config(credentials, region).await;
        Ok(Arc::new(AwsSecretsManagerStore::from_sdk_config(&sdk_config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_only_secret_is_not_found() {
        let err = string_payload("certs/client", None).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("certs/client"));

        assert_eq!(string_payload("db/port", Some("5432")).unwrap(), "5432");
        assert_eq!(string_payload("db/empty", Some("")).unwrap(), "");
    }

    #[tokio::test]
    async fn test_assume_role_requires_role_arn() {
        let connector = AwsConnector::new();
        let base = StaticCredentials::new("AKIA", "secret", None);
        let role = RoleRequest {
            role_arn: None,
            session_name: Some("session".into()),
        };

        let err = connector.assume_role(&base, Some("us-east-1"), &role).await.unwrap_err();
        assert!(matches!(err, ProviderError::ConfigurationError(ref m) if m.contains("AWS_ROLE_ARN")));
    }

    #[tokio::test]
    async fn test_assume_role_requires_session_name() {
        let connector = AwsConnector::new();
        let base = StaticCredentials::new("AKIA", "secret", None);
        let role = RoleRequest {
            role_arn: Some("arn:aws:iam::123456789012:role/reader".into()),
            session_name: None,
        };

        let err = connector.assume_role(&base, None, &role).await.unwrap_err();
        assert!(matches!(err, ProviderError::ConfigurationError(ref m) if m.contains("AWS_ROLE_SESSION_NAME")));
    }

    #[tokio::test]
    async fn test_connect_with_explicit_credentials() {
        let connector = AwsConnector::new();
        let creds = StaticCredentials::new("AKIA", "secret", Some("token".into()));

        let store = connector.connect(Some(&creds), Some("eu-central-1")).await.unwrap();
        assert_eq!(store.name(), "aws_secrets_manager");
        assert!(format!("{:?}", store).contains("eu-central-1"));
    }

    // Requires AWS credentials and permissions; run with --ignored.
    #[tokio::test]
    #[ignore]
    async fn test_aws_operations() {
        let connector = AwsConnector::new();
        let store = connector.connect(None, Some("us-east-1")).await.unwrap();

        let id = "layered-config/test/roundtrip";
        match store.get_secret(id).await {
            Ok(_) => store.update_secret(id, "v2").await.unwrap(),
            Err(e) if e.is_not_found() => store.create_secret(id, "v1").await.unwrap(),
            Err(e) => panic!("unexpected error: {}", e),
        }
        assert!(store.get_secret(id).await.is_ok());
    }
}
