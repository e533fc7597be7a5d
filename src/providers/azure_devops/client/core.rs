use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::config::AzureDevOpsSettings;
use crate::error::{PipescopeError, Result};
use crate::providers::azure_devops::types::{Collection, FetchFailure, Listing};

pub struct AzureDevOpsClient {
    client: Client,
    base_url: Url,
    organization: String,
    token: Token,
    api_version: String,
}

impl AzureDevOpsClient {
    pub fn new(settings: AzureDevOpsSettings) -> Result<Self> {
        if settings.base_url.cannot_be_a_base() {
            return Err(PipescopeError::Config(format!(
                "Invalid base URL: {}",
                settings.base_url
            )));
        }

        // Bounds each call, not the whole aggregation.
        let client = Client::builder()
            .user_agent(concat!("pipescope/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| PipescopeError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url,
            organization: settings.organization,
            token: settings.token,
            api_version: settings.api_version,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// PATs are sent as basic auth with an empty user name.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth("", Some(self.token.as_str()))
    }

    /// Builds `{base}/{organization}/{segments...}?api-version=...`.
    pub(super) fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);

        url.path_segments_mut()
            .map_err(|()| PipescopeError::Config(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push(&self.organization)
            .extend(segments);

        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);

        Ok(url)
    }

    async fn get_collection<T>(&self, url: Url) -> Result<Collection<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .auth_request(self.client.get(url.clone()))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            debug!("Error response from {}: {error_text}", url.path());
            return Err(PipescopeError::Api {
                status: status.as_u16(),
                context: url.path().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Runs one query and degrades to an empty listing on any failure.
    ///
    /// `what` names the resource for the warning, e.g. "pipelines for project Alpha".
    pub(super) async fn fetch_listing<T>(&self, url: Result<Url>, what: &str) -> Listing<T>
    where
        T: DeserializeOwned,
    {
        let result = match url {
            Ok(url) => self.get_collection(url).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(collection) => collection.into(),
            Err(e) => {
                let failure = FetchFailure::from(&e);
                warn!("Failed to fetch {what}: {failure}");
                Listing::degraded(failure)
            }
        }
    }
}

impl From<&PipescopeError> for FetchFailure {
    fn from(error: &PipescopeError) -> Self {
        match error {
            PipescopeError::Api { status, .. } => Self::Status(*status),
            PipescopeError::Network(e) if e.is_timeout() => Self::Timeout,
            PipescopeError::Network(e) if e.is_decode() => Self::Decode(e.to_string()),
            PipescopeError::Json(e) => Self::Decode(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}
