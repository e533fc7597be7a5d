use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pipeline joined with the detail of its most recent run.
///
/// Serialized in camelCase. The report script binds against these exact
/// names, so renaming a field here means updating `report.html` too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    pub id: u64,
    pub name: String,
    pub folder: String,
    /// Web link to the pipeline analytics view.
    pub url: String,
    pub last_run_date: Option<DateTime<Utc>>,
    pub last_run_state: Option<String>,
    pub last_run_result: Option<String>,
    /// Total runs reported by the provider, not the number of runs fetched.
    pub number_of_runs: u64,
}

impl PipelineRecord {
    pub fn has_runs(&self) -> bool {
        self.last_run_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub project_name: String,
    /// Provider listing order.
    pub pipelines: Vec<PipelineRecord>,
    #[serde(default)]
    pub collapsed: bool,
}

impl ProjectRecord {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            pipelines: Vec::new(),
            collapsed: false,
        }
    }
}

/// Counters collected during one aggregation pass.
///
/// Pipelines without runs look identical in the output whatever the cause;
/// these counters keep the causes apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStats {
    pub projects: usize,
    pub pipelines: usize,
    pub pipeline_fetch_failures: usize,
    pub run_fetch_failures: usize,
    /// Run listing succeeded and reported zero runs.
    pub never_run: usize,
    /// Run listing reported a non-zero count but carried no run detail.
    pub count_without_detail: usize,
}

/// Output of the aggregator.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub projects: Vec<ProjectRecord>,
    pub stats: FetchStats,
}
