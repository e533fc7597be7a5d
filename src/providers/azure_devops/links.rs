use url::Url;

use crate::error::{PipescopeError, Result};

/// Analytics view shown when opening a pipeline from the report.
pub const PIPELINE_ANALYTICS_VIEW: &str =
    "ms.vss-pipelineanalytics-web.new-build-definition-pipeline-analytics-view-cardmetrics";

/// Builds the web URL of a pipeline's analytics page.
///
/// # Arguments
///
/// * `base_url` - Azure DevOps base URL (e.g., <https://dev.azure.com>)
/// * `organization` - Organization name
/// * `project` - Project name, percent-encoded as a path segment
/// * `pipeline_id` - Pipeline definition id
///
/// # Returns
///
/// URL such as
/// `https://dev.azure.com/contoso/Alpha/_build?definitionId=7&view=ms.vss-...`
///
/// # Errors
///
/// Returns an error if `base_url` is not an absolute URL that can carry a path.
pub fn pipeline_web_url(
    base_url: &Url,
    organization: &str,
    project: &str,
    pipeline_id: u64,
) -> Result<String> {
    let mut url = base_url.clone();
    url.set_query(None);

    url.path_segments_mut()
        .map_err(|()| PipescopeError::Config(format!("Base URL cannot be a base: {base_url}")))?
        .pop_if_empty()
        .push(organization)
        .push(project)
        .push("_build");

    url.query_pairs_mut()
        .append_pair("definitionId", &pipeline_id.to_string())
        .append_pair("view", PIPELINE_ANALYTICS_VIEW);

    Ok(url.into())
}
