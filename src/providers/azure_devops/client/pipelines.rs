use super::core::AzureDevOpsClient;
use crate::providers::azure_devops::types::{
    AzureDevOpsPipeline, AzureDevOpsProject, AzureDevOpsRun, Listing,
};

impl AzureDevOpsClient {
    /// Lists the organization's projects.
    pub async fn list_projects(&self) -> Listing<AzureDevOpsProject> {
        let url = self.api_url(&["_apis", "projects"]);
        self.fetch_listing(url, "projects").await
    }

    /// Lists the pipelines of one project, in provider order.
    pub async fn list_pipelines(&self, project: &str) -> Listing<AzureDevOpsPipeline> {
        let url = self.api_url(&[project, "_apis", "pipelines"]);
        self.fetch_listing(url, &format!("pipelines for project {project}"))
            .await
    }

    /// Lists the `top` most recent runs of a pipeline, newest first.
    ///
    /// The ordering is done by the provider. `total_count` on the returned
    /// listing is the provider's total number of runs, which can be larger
    /// than `top`.
    pub async fn list_latest_runs(
        &self,
        project: &str,
        pipeline_id: u64,
        top: usize,
    ) -> Listing<AzureDevOpsRun> {
        let pipeline_id_segment = pipeline_id.to_string();
        let url = self
            .api_url(&[project, "_apis", "pipelines", &pipeline_id_segment, "runs"])
            .map(|mut url| {
                url.query_pairs_mut()
                    .append_pair("$top", &top.to_string())
                    .append_pair("$orderby", "createdDate desc");
                url
            });

        self.fetch_listing(
            url,
            &format!("runs for pipeline {pipeline_id} in project {project}"),
        )
        .await
    }
}
