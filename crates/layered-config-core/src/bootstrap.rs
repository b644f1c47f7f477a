//! Secret store session bootstrap
//!
//! The remote store client is built lazily, on the first lookup or write
//! that needs it, and then reused for the lifetime of the engine. Building it
//! reads AWS credential variables (all namespaced by `aws_prefix`) from the
//! engine's environment store:
//!
//! | Variable                 | Use                                        |
//! |--------------------------|--------------------------------------------|
//! | `AWS_ACCESS_KEY_ID`      | static access key                          |
//! | `AWS_SECRET_ACCESS_KEY`  | static secret key                          |
//! | `AWS_SESSION_TOKEN`      | if set, static credentials are used as-is  |
//! | `AWS_REGION`             | region for STS and the store client        |
//! | `AWS_ROLE_ARN`           | role to assume when no session token       |
//! | `AWS_ROLE_SESSION_NAME`  | session name for the assumed role          |
//!
//! Without a session token but with both static keys, the keys are exchanged
//! for temporary role credentials first. With no usable keys the client falls
//! back to the ambient provider chain (instance profile, ECS task role, ...).
//!
//! Construction runs at most once, even when several tasks race for it.

use crate::error::{ConfigError, ConfigResult};
use crate::providers::{ProviderResult, SecretStore};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_ROLE_ARN: &str = "AWS_ROLE_ARN";
pub const AWS_ROLE_SESSION_NAME: &str = "AWS_ROLE_SESSION_NAME";

/// Explicit AWS credentials
///
/// Key material is wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl StaticCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Role to assume during bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRequest {
    pub role_arn: Option<String>,
    pub session_name: Option<String>,
}

/// The network side of bootstrap
///
/// Split out so the state machine can run against a stand-in in tests.
#[async_trait::async_trait]
pub trait StoreConnector: Send + Sync + fmt::Debug {
    /// Exchange long-lived credentials for temporary role credentials
    async fn assume_role(
        &self,
        base: &StaticCredentials,
        region: Option<&str>,
        role: &RoleRequest,
    ) -> ProviderResult<StaticCredentials>;

    /// Build a store client; `None` credentials means the ambient chain
    async fn connect(
        &self,
        credentials: Option<&StaticCredentials>,
        region: Option<&str>,
    ) -> ProviderResult<Arc<dyn SecretStore>>;
}

/// Credential variables as read from the environment
#[derive(Debug, Default)]
struct CredentialVars {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    region: Option<String>,
}

/// Lazily built, at-most-once remote store client
pub struct SessionBootstrap {
    env: Arc<dyn crate::providers::EnvironmentStore>,
    connector: Option<Arc<dyn StoreConnector>>,
    aws_prefix: String,
    session_required: bool,
    client: OnceCell<Arc<dyn SecretStore>>,
    role_exchanges: AtomicUsize,
}

impl fmt::Debug for SessionBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBootstrap")
            .field("env", &self.env.name())
            .field("connector", &self.connector)
            .field("aws_prefix", &self.aws_prefix)
            .field("session_required", &self.session_required)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl SessionBootstrap {
    /// Bootstrap that builds its client through `connector` on first use
    pub fn new(
        env: Arc<dyn crate::providers::EnvironmentStore>,
        connector: Arc<dyn StoreConnector>,
        aws_prefix: impl Into<String>,
        session_required: bool,
    ) -> Self {
        Self {
            env,
            connector: Some(connector),
            aws_prefix: aws_prefix.into(),
            session_required,
            client: OnceCell::new(),
            role_exchanges: AtomicUsize::new(0),
        }
    }

    /// Bootstrap around an already constructed client
    pub fn with_client(
        env: Arc<dyn crate::providers::EnvironmentStore>,
        client: Arc<dyn SecretStore>,
        aws_prefix: impl Into<String>,
    ) -> Self {
        Self {
            env,
            connector: None,
            aws_prefix: aws_prefix.into(),
            session_required: false,
            client: OnceCell::new_with(Some(client)),
            role_exchanges: AtomicUsize::new(0),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Number of role exchanges performed so far (0 or 1)
    pub fn role_exchanges(&self) -> usize {
        self.role_exchanges.load(Ordering::SeqCst)
    }

    /// The store client, building it on first call
    pub async fn client(&self) -> ConfigResult<Arc<dyn SecretStore>> {
        // TODO: detect expired assumed-role credentials and rebuild the client.
        let client = self.client.get_or_try_init(|| self.build()).await?;
        Ok(Arc::clone(client))
    }

    fn var(&self, name: &str) -> Option<String> {
        self.env.get(&format!("{}{}", self.aws_prefix, name))
    }

    fn read_vars(&self) -> CredentialVars {
        CredentialVars {
            access_key_id: self.var(AWS_ACCESS_KEY_ID),
            secret_access_key: self.var(AWS_SECRET_ACCESS_KEY),
            session_token: self.var(AWS_SESSION_TOKEN),
            region: self.var(AWS_REGION),
        }
    }

    async fn build(&self) -> ConfigResult<Arc<dyn SecretStore>> {
        let connector = self.connector.as_ref().ok_or_else(|| {
            ConfigError::Settings("no secret store connector configured".to_string())
        })?;

        let vars = self.read_vars();
        let region = vars.region.clone();

        let credentials = match (&vars.session_token, &vars.access_key_id, &vars.secret_access_key) {
            (None, Some(access_key_id), Some(secret_access_key)) => {
                let role = RoleRequest {
                    role_arn: self.var(AWS_ROLE_ARN),
                    session_name: self.var(AWS_ROLE_SESSION_NAME),
                };
                tracing::info!(
                    prefix = %self.aws_prefix,
                    role_arn = role.role_arn.as_deref().unwrap_or("-"),
                    "No session token, assuming role"
                );
                let base = StaticCredentials::new(access_key_id.as_str(), secret_access_key.as_str(), None);
                self.role_exchanges.fetch_add(1, Ordering::SeqCst);
                Some(connector.assume_role(&base, region.as_deref(), &role).await?)
            }
            (Some(token), Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials::new(
                access_key_id.as_str(),
                secret_access_key.as_str(),
                Some(token.clone()),
            )),
            _ => None,
        };

        if self.session_required {
            Self::require_session(credentials.as_ref(), &vars)?;
        }

        match &credentials {
            Some(creds) => tracing::info!(
                access_key_id = %creds.access_key_id,
                region = region.as_deref().unwrap_or("-"),
                "Building secret store client with explicit credentials"
            ),
            None => tracing::info!(
                region = region.as_deref().unwrap_or("-"),
                "Building secret store client from the ambient credential chain"
            ),
        }

        Ok(connector.connect(credentials.as_ref(), region.as_deref()).await?)
    }

    // Strict mode: every piece of the session must be present after the exchange.
    fn require_session(credentials: Option<&StaticCredentials>, vars: &CredentialVars) -> ConfigResult<()> {
        let access_key_id = credentials
            .map(|c| c.access_key_id.as_str())
            .or(vars.access_key_id.as_deref());
        let secret_access_key = credentials
            .map(|c| c.secret_access_key.as_str())
            .or(vars.secret_access_key.as_deref());
        let session_token = credentials
            .and_then(|c| c.session_token.as_deref())
            .or(vars.session_token.as_deref());

        let checks = [
            (AWS_ACCESS_KEY_ID, access_key_id.is_some()),
            (AWS_SECRET_ACCESS_KEY, secret_access_key.is_some()),
            (AWS_SESSION_TOKEN, session_token.is_some()),
            (AWS_REGION, vars.region.is_some()),
        ];
        match checks.iter().find(|(_, present)| !present) {
            Some((name, _)) => Err(ConfigError::MissingCredential(name.to_string())),
            None => Ok(()),
        }
    }
}
