use std::{sync::Arc, time::Duration};

use crate::{
    connection::ProjectConnection,
    credentials::{AccessToken, DefaultCredential, TokenCredential, AGENTS_SCOPE},
    AgentsError, ApiResponseOrError,
};
use reqwest::{header::AUTHORIZATION, Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AgentsClient {
    endpoint: String,
    api_version: String,
    poll_interval: Duration,
    credential: Arc<dyn TokenCredential>,
    token: Arc<Mutex<Option<AccessToken>>>,
    client: Client,
}

impl std::fmt::Debug for AgentsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AgentsClient({})", self.endpoint)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AgentsErrorWrapper {
    error: AgentsError,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeletionStatus {
    pub id: String,
    pub object: String,
    pub deleted: bool,
}

impl AgentsClient {
    /// Connects to the project in `PROJECT_CONNECTION_STRING` using [`DefaultCredential`].
    pub fn from_env() -> Result<Self, AgentsError> {
        let connection = ProjectConnection::from_env()?;
        Ok(Self::new(&connection, Arc::new(DefaultCredential::new())))
    }

    pub fn from_connection_string(
        connection_string: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, AgentsError> {
        let connection: ProjectConnection = connection_string.parse()?;
        Ok(Self::new(&connection, credential))
    }

    pub fn new(connection: &ProjectConnection, credential: Arc<dyn TokenCredential>) -> Self {
        Self::with_endpoint(connection.endpoint(), credential)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            credential,
            token: Arc::new(Mutex::new(None)),
            client: Client::new(),
        }
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// How long to wait between status checks while a run is in flight.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn current_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn bearer_token(&self) -> Result<String, AgentsError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.token.clone());
        }

        log::debug!("Acquiring token for {AGENTS_SCOPE}");
        let token = self.credential.get_token(&[AGENTS_SCOPE]).await?;
        let value = token.token.clone();
        *cached = Some(token);

        Ok(value)
    }

    async fn request_inner<S, R>(
        &self,
        method: Method,
        route: R,
        query: &[(&str, String)],
        body: Option<S>,
    ) -> Result<Response, AgentsError>
    where
        R: Into<String>,
        S: Serialize,
    {
        let url = format!("{}/{}", self.endpoint, route.into());
        log::debug!("Agents Request[{}] {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer_token().await?))
            .query(&[("api-version", self.api_version.as_str())])
            .query(query);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;

        log::debug!(
            "Agents Response[{}] {} {url}",
            method,
            response.status().as_str()
        );
        Ok(response)
    }

    pub async fn request<S, R, T>(
        &self,
        method: Method,
        route: R,
        query: &[(&str, String)],
        body: Option<S>,
    ) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        S: Serialize,
        T: DeserializeOwned,
    {
        let response = self.request_inner(method, route, query, body).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let result = response.text().await?;
        if let Ok(api_response) = serde_json::from_str::<AgentsErrorWrapper>(&result) {
            Err(api_response.error)
        } else {
            let mut error = AgentsError::new(result, "unknown".to_string());
            error.code = Some(status.as_str().to_string());
            Err(error)
        }
    }

    pub async fn get<R, T>(&self, route: R) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        T: DeserializeOwned,
    {
        self.request::<(), R, T>(Method::GET, route, &[], None).await
    }

    pub async fn post<S, R, T>(&self, route: R, body: S) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        S: Serialize,
        T: DeserializeOwned,
    {
        self.request(Method::POST, route, &[], Some(body)).await
    }

    pub async fn delete<R>(&self, route: R) -> ApiResponseOrError<DeletionStatus>
    where
        R: Into<String>,
    {
        self.request::<(), R, DeletionStatus>(Method::DELETE, route, &[], None)
            .await
    }

    /// Fetches every page of a list endpoint in ascending order, starting after `after`.
    pub async fn list<R, T>(&self, route: R, after: Option<String>) -> ApiResponseOrError<Vec<T>>
    where
        R: Into<String>,
        T: DeserializeOwned + std::fmt::Debug,
    {
        let route = route.into();
        let mut after = after;
        let mut data = Vec::new();

        loop {
            let mut query = vec![("order", "asc".to_string())];
            if let Some(after) = &after {
                query.push(("after", after.clone()));
            }

            let list: List<T> = self
                .request::<(), _, _>(Method::GET, route.as_str(), &query, None)
                .await?;
            data.extend(list.data);

            match list.last_id {
                Some(last_id) if list.has_more => after = Some(last_id),
                _ => break,
            }
        }

        Ok(data)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct List<T> {
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}
