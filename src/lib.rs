//! An unofficial async client for the Azure AI Foundry Agent Service.
//!
//! The client talks to hub-based projects addressed by a connection string of
//! the form `host;subscription;resource-group;project-name`:
//!
//! ```no_run
//! use foundry_agents::{client::AgentsClient, credentials::DefaultCredential};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), foundry_agents::AgentsError> {
//! let client = AgentsClient::from_connection_string(
//!     "eastus.api.azureml.ms;0000;my-rg;my-project",
//!     Arc::new(DefaultCredential::new()),
//! )?;
//! let thread = client.create_thread(Default::default()).await?;
//! println!("{}", thread.id);
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;

pub mod agents;
pub mod client;
pub mod compliance;
pub mod connection;
pub mod credentials;
pub mod openapi;

pub use agents::*;

/// An error returned by the service, or produced locally while talking to it.
#[derive(Deserialize, Debug, Clone)]
pub struct AgentsError {
    pub message: String,
    #[serde(rename = "type", default = "AgentsError::default_type")]
    pub error_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl AgentsError {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            message,
            error_type,
            param: None,
            code: None,
        }
    }

    fn default_type() -> String {
        "service_error".to_string()
    }
}

impl std::fmt::Display for AgentsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AgentsError {}

impl From<reqwest::Error> for AgentsError {
    fn from(value: reqwest::Error) -> Self {
        Self::new(value.to_string(), "reqwest".to_string())
    }
}

impl From<serde_json::Error> for AgentsError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(value.to_string(), "serde_json".to_string())
    }
}

impl From<credentials::CredentialError> for AgentsError {
    fn from(value: credentials::CredentialError) -> Self {
        Self::new(value.to_string(), "credential".to_string())
    }
}

impl From<connection::ConnectionError> for AgentsError {
    fn from(value: connection::ConnectionError) -> Self {
        Self::new(value.to_string(), "connection".to_string())
    }
}

pub type ApiResponseOrError<T> = Result<T, AgentsError>;
