//! Project connection strings, as copied from the project's overview page.

use std::{env, fmt, str::FromStr};

use thiserror::Error;

/// Environment variable holding the project connection string.
pub const CONNECTION_STRING_VAR: &str = "PROJECT_CONNECTION_STRING";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("environment variable `{0}` should be defined")]
    MissingVariable(&'static str),
    #[error("connection string should have 4 `;`-separated parts, found {0}")]
    Malformed(usize),
    #[error("connection string part `{0}` is empty")]
    EmptyPart(&'static str),
}

/// The four parts of `<HostName>;<AzureSubscriptionId>;<ResourceGroup>;<ProjectName>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConnection {
    pub host: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub project_name: String,
}

impl ProjectConnection {
    /// Reads [`CONNECTION_STRING_VAR`], loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConnectionError> {
        dotenvy::dotenv().ok();

        env::var(CONNECTION_STRING_VAR)
            .map_err(|_| ConnectionError::MissingVariable(CONNECTION_STRING_VAR))?
            .parse()
    }

    /// Base URL of the agents API for this project. Hosts without a scheme get `https://`.
    pub fn endpoint(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let base = if host.starts_with("https://") || host.starts_with("http://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        format!(
            "{base}/agents/v1.0/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.subscription_id, self.resource_group, self.project_name
        )
    }
}

impl FromStr for ProjectConnection {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(';').map(str::trim).collect();

        let &[host, subscription_id, resource_group, project_name] = parts.as_slice() else {
            return Err(ConnectionError::Malformed(parts.len()));
        };

        for (name, value) in [
            ("host", host),
            ("subscription", subscription_id),
            ("resource group", resource_group),
            ("project name", project_name),
        ] {
            if value.is_empty() {
                return Err(ConnectionError::EmptyPart(name));
            }
        }

        Ok(Self {
            host: host.to_string(),
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            project_name: project_name.to_string(),
        })
    }
}

impl fmt::Display for ProjectConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.host, self.subscription_id, self.resource_group, self.project_name
        )
    }
}
