use chrono::{DateTime, Utc};
use serde::Deserialize;

// Wire names are spelled out per field.

/// Envelope shared by all Azure DevOps list endpoints.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(rename = "count", default)]
    pub count: u64,
    #[serde(rename = "value", default = "Vec::new")]
    pub value: Vec<T>,
}

/// An Azure DevOps project (team project).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AzureDevOpsProject {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "name")]
    pub name: String,
}

/// A pipeline definition within a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AzureDevOpsPipeline {
    #[serde(rename = "id")]
    pub id: u64,
    #[serde(rename = "name")]
    pub name: String,
    /// Folder path such as `\` or `\apps\web`; absent on some API versions
    #[serde(rename = "folder", default)]
    pub folder: String,
    /// REST resource URL, not the web page
    #[serde(rename = "url", default)]
    pub api_url: String,
}

/// A single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AzureDevOpsRun {
    #[serde(rename = "id")]
    pub id: u64,
    /// Lifecycle state, e.g. "inProgress", "completed"
    #[serde(rename = "state", default)]
    pub state: Option<String>,
    /// Terminal result, absent until the run completes
    #[serde(rename = "result", default)]
    pub result: Option<String>,
    #[serde(rename = "createdDate")]
    pub created_date: DateTime<Utc>,
}

/// Why a provider listing came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Status(u16),
    Timeout,
    Transport(String),
    Decode(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status code {status}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Decode(message) => write!(f, "undecodable response: {message}"),
        }
    }
}

/// Result of one client query.
///
/// `total_count` is the provider's `count` field. For run listings it is the
/// total number of runs and may exceed `items.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub failure: Option<FetchFailure>,
}

impl<T> Listing<T> {
    pub fn degraded(failure: FetchFailure) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            failure: Some(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

impl<T> From<Collection<T>> for Listing<T> {
    fn from(collection: Collection<T>) -> Self {
        Self {
            items: collection.value,
            total_count: collection.count,
            failure: None,
        }
    }
}
