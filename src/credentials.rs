//! Bearer token acquisition.
//!
//! The agents service authenticates with Microsoft Entra tokens. This module
//! does not implement any sign-in flow itself: it either takes a token from
//! the environment or borrows the session of a logged-in Azure CLI.

use std::{env, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

/// Scope requested for agent operations.
pub const AGENTS_SCOPE: &str = "https://ml.azure.com/.default";

/// Environment variable holding a ready-made bearer token.
pub const ACCESS_TOKEN_VAR: &str = "AZURE_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable `{0}` is not set")]
    MissingVariable(&'static str),
    #[error("failed to launch the Azure CLI: {0}")]
    CliLaunch(#[from] std::io::Error),
    #[error("the Azure CLI could not provide a token: {0}")]
    CliFailed(String),
    #[error("unexpected Azure CLI output: {0}")]
    CliOutput(#[from] serde_json::Error),
    #[error("no credential could provide a token: {}", .0.join("; "))]
    Unavailable(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token can still be sent. Tokens expiring within five minutes are stale.
    pub fn is_fresh(&self) -> bool {
        match self.expires_on {
            Some(expires_on) => expires_on - Duration::minutes(5) > Utc::now(),
            None => true,
        }
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError>;
}

/// A fixed token, for example one minted by a CI pipeline.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }

    pub fn from_env() -> Result<Self, CredentialError> {
        env::var(ACCESS_TOKEN_VAR)
            .map(Self::new)
            .map_err(|_| CredentialError::MissingVariable(ACCESS_TOKEN_VAR))
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Uses the account the Azure CLI is logged in with (`az login`).
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, `2025-01-31 17:04:05.000000`.
    expires_on: Option<String>,
    /// Unix seconds; only printed by newer CLI versions.
    #[serde(rename = "expires_on")]
    expires_on_unix: Option<i64>,
}

impl CliToken {
    fn into_access_token(self) -> AccessToken {
        let expires_on = self
            .expires_on_unix
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .or_else(|| {
                let local = self.expires_on.as_deref()?;
                let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f").ok()?;
                Local
                    .from_local_datetime(&naive)
                    .single()
                    .map(|time| time.with_timezone(&Utc))
            });

        AccessToken::new(self.access_token, expires_on)
    }
}

/// `https://ml.azure.com/.default` -> `https://ml.azure.com`
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scopes.first().copied().unwrap_or(AGENTS_SCOPE));

        #[cfg(windows)]
        let mut command = {
            let mut command = Command::new("cmd");
            command.args(["/C", "az"]);
            command
        };
        #[cfg(not(windows))]
        let mut command = Command::new("az");

        log::debug!("requesting token for {resource} from the Azure CLI");
        let output = command
            .args(["account", "get-access-token", "--output", "json"])
            .args(["--resource", resource])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CredentialError::CliFailed(stderr));
        }

        let token: CliToken = serde_json::from_slice(&output.stdout)?;
        Ok(token.into_access_token())
    }
}

/// Tries each credential in order and returns the first token obtained.
///
/// [`DefaultCredential::new`] checks [`ACCESS_TOKEN_VAR`] and then the Azure CLI.
#[derive(Clone)]
pub struct DefaultCredential {
    chain: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    pub fn new() -> Self {
        let mut chain: Vec<Arc<dyn TokenCredential>> = Vec::new();

        if let Ok(credential) = StaticTokenCredential::from_env() {
            chain.push(Arc::new(credential));
        }
        chain.push(Arc::new(AzureCliCredential));

        Self { chain }
    }

    pub fn with_chain(chain: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { chain }
    }
}

impl Default for DefaultCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefaultCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DefaultCredential({} sources)", self.chain.len())
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let mut failures = Vec::new();

        for credential in &self.chain {
            match credential.get_token(scopes).await {
                Ok(token) => return Ok(token),
                Err(error) => {
                    log::debug!("credential unavailable: {error}");
                    failures.push(error.to_string());
                }
            }
        }

        Err(CredentialError::Unavailable(failures))
    }
}
