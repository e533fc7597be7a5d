use chrono::SubsecRound;
use log::{info, warn};

use crate::config::AzureDevOpsSettings;
use crate::error::Result;
use crate::records::{Aggregation, FetchStats, PipelineRecord, ProjectRecord};

use super::client::AzureDevOpsClient;
use super::links::pipeline_web_url;
use super::progress_bar::FetchProgress;
use super::types::{AzureDevOpsPipeline, AzureDevOpsProject, AzureDevOpsRun, Listing};

/// Only the newest run is embedded in a record.
const LATEST_RUN_COUNT: usize = 1;

/// Azure DevOps pipeline provider.
///
/// Walks every project of the organization, every pipeline of each project,
/// and the latest run of each pipeline, one request at a time.
pub struct AzureDevOpsProvider {
    pub client: AzureDevOpsClient,
}

impl AzureDevOpsProvider {
    /// Creates a provider for the organization named in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot carry a path.
    pub fn new(settings: AzureDevOpsSettings) -> Result<Self> {
        let client = AzureDevOpsClient::new(settings)?;

        Ok(Self { client })
    }

    pub fn organization(&self) -> &str {
        self.client.organization()
    }

    /// Fetches all projects with their pipelines and latest runs.
    ///
    /// Provider order is kept for projects and pipelines. A failed call only
    /// empties its own part of the result: a project whose pipelines cannot be
    /// listed is kept with no pipelines, and a pipeline whose runs cannot be
    /// listed is kept with no run detail and a run count of 0.
    ///
    /// # Arguments
    ///
    /// * `show_progress` - Draw a progress bar on stderr
    pub async fn fetch_all(&self, show_progress: bool) -> Aggregation {
        info!(
            "Starting pipeline collection for organization: {}",
            self.organization()
        );

        let progress = FetchProgress::start_phase_1(show_progress);

        let projects = self.client.list_projects().await;

        if projects.items.is_empty() {
            warn!("No projects found for organization: {}", self.organization());
        } else {
            info!("Retrieved {} projects", projects.items.len());
        }

        let progress = progress.finish_phase_1_start_phase_2(projects.items.len());

        let mut stats = FetchStats {
            projects: projects.items.len(),
            ..FetchStats::default()
        };
        let mut records = Vec::with_capacity(projects.items.len());

        for project in &projects.items {
            progress.project_started(&project.name);
            records.push(self.fetch_project(project, &mut stats).await);
            progress.project_finished();
        }

        progress.finish_phase_2(&stats);

        info!(
            "Collected {} pipelines ({} never run, {} run fetch failures, {} pipeline fetch failures)",
            stats.pipelines, stats.never_run, stats.run_fetch_failures, stats.pipeline_fetch_failures
        );

        Aggregation {
            projects: records,
            stats,
        }
    }

    async fn fetch_project(
        &self,
        project: &AzureDevOpsProject,
        stats: &mut FetchStats,
    ) -> ProjectRecord {
        info!("Fetching pipelines for project: {} ({})", project.name, project.id);

        let pipelines = self.client.list_pipelines(&project.name).await;
        if pipelines.is_degraded() {
            stats.pipeline_fetch_failures += 1;
        }

        let mut record = ProjectRecord::new(&project.name);

        for pipeline in pipelines.items {
            let runs = self
                .client
                .list_latest_runs(&project.name, pipeline.id, LATEST_RUN_COUNT)
                .await;

            record
                .pipelines
                .push(self.pipeline_record(&project.name, pipeline, runs, stats));
        }

        record
    }

    fn pipeline_record(
        &self,
        project: &str,
        pipeline: AzureDevOpsPipeline,
        runs: Listing<AzureDevOpsRun>,
        stats: &mut FetchStats,
    ) -> PipelineRecord {
        stats.pipelines += 1;

        match (&runs.failure, runs.items.first()) {
            (Some(_), _) => stats.run_fetch_failures += 1,
            (None, None) if runs.total_count > 0 => {
                warn!(
                    "Pipeline {} in project {project} reports {} runs but none were returned",
                    pipeline.id, runs.total_count
                );
                stats.count_without_detail += 1;
            }
            (None, None) => stats.never_run += 1,
            (None, Some(_)) => {}
        }

        let url = pipeline_web_url(
            self.client.base_url(),
            self.organization(),
            project,
            pipeline.id,
        )
        .unwrap_or_else(|e| {
            warn!("Falling back to API URL for pipeline {}: {e}", pipeline.id);
            pipeline.api_url.clone()
        });

        // The provider's count can be missing while a run is returned.
        let number_of_runs = runs.total_count.max(runs.items.len() as u64);
        let latest = runs.items.into_iter().next();

        PipelineRecord {
            id: pipeline.id,
            name: pipeline.name,
            folder: pipeline.folder,
            url,
            // Millisecond precision, same as the report script's Date.
            last_run_date: latest.as_ref().map(|run| run.created_date.trunc_subsecs(3)),
            last_run_state: latest.as_ref().and_then(|run| run.state.clone()),
            last_run_result: latest.and_then(|run| run.result),
            number_of_runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staleness::is_stale;
    use chrono::{Duration, TimeZone, Utc};
    use mockito::{Matcher, Mock, ServerGuard};

    fn provider_for(server: &ServerGuard) -> AzureDevOpsProvider {
        AzureDevOpsProvider::new(AzureDevOpsSettings::for_base_url(&server.url())).unwrap()
    }

    async fn mock_json(server: &mut ServerGuard, path: &str, status: usize, body: &str) -> Mock {
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn projects_body(names: &[&str]) -> String {
        let value: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!(r#"{{"id":"id-{i}","name":"{name}"}}"#))
            .collect();
        format!(r#"{{"count":{},"value":[{}]}}"#, names.len(), value.join(","))
    }

    fn pipelines_body(pipelines: &[(u64, &str)]) -> String {
        let value: Vec<String> = pipelines
            .iter()
            .map(|(id, name)| {
                format!(r#"{{"id":{id},"name":"{name}","folder":"\\","url":"https://api/{id}"}}"#)
            })
            .collect();
        format!(r#"{{"count":{},"value":[{}]}}"#, pipelines.len(), value.join(","))
    }

    fn runs_body(count: u64, created: &str) -> String {
        format!(
            r#"{{"count":{count},"value":[{{"id":1,"state":"completed","result":"succeeded","createdDate":"{created}"}}]}}"#
        )
    }

    const EMPTY_RUNS: &str = r#"{"count":0,"value":[]}"#;

    #[tokio::test]
    async fn test_fetch_all_preserves_provider_order() {
        let mut server = mockito::Server::new_async().await;
        let _projects = mock_json(
            &mut server,
            "/contoso/_apis/projects",
            200,
            &projects_body(&["B", "A"]),
        )
        .await;
        let _b = mock_json(
            &mut server,
            "/contoso/B/_apis/pipelines",
            200,
            &pipelines_body(&[(9, "zeta"), (3, "alpha")]),
        )
        .await;
        let _a = mock_json(&mut server, "/contoso/A/_apis/pipelines", 200, &pipelines_body(&[]))
            .await;
        let _runs_9 =
            mock_json(&mut server, "/contoso/B/_apis/pipelines/9/runs", 200, EMPTY_RUNS).await;
        let _runs_3 =
            mock_json(&mut server, "/contoso/B/_apis/pipelines/3/runs", 200, EMPTY_RUNS).await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        let names: Vec<&str> = aggregation
            .projects
            .iter()
            .map(|p| p.project_name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "A"]);

        let pipeline_ids: Vec<u64> = aggregation.projects[0]
            .pipelines
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(pipeline_ids, vec![9, 3]);
    }

    #[tokio::test]
    async fn test_pipeline_fetch_failure_does_not_affect_later_projects() {
        let mut server = mockito::Server::new_async().await;
        let _projects = mock_json(
            &mut server,
            "/contoso/_apis/projects",
            200,
            &projects_body(&["X", "Y"]),
        )
        .await;
        let _x = mock_json(&mut server, "/contoso/X/_apis/pipelines", 500, "boom").await;
        let _y = mock_json(
            &mut server,
            "/contoso/Y/_apis/pipelines",
            200,
            &pipelines_body(&[(5, "build")]),
        )
        .await;
        let _runs = mock_json(
            &mut server,
            "/contoso/Y/_apis/pipelines/5/runs",
            200,
            &runs_body(4, "2024-03-01T08:30:00Z"),
        )
        .await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        assert_eq!(aggregation.projects.len(), 2);
        assert!(aggregation.projects[0].pipelines.is_empty());
        let y = &aggregation.projects[1];
        assert_eq!(y.project_name, "Y");
        assert_eq!(y.pipelines.len(), 1);
        assert_eq!(y.pipelines[0].number_of_runs, 4);
        assert_eq!(
            y.pipelines[0].last_run_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(aggregation.stats.pipeline_fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_run_count_uses_provider_total() {
        let mut server = mockito::Server::new_async().await;
        let _projects =
            mock_json(&mut server, "/contoso/_apis/projects", 200, &projects_body(&["Alpha"]))
                .await;
        let _pipelines = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines",
            200,
            &pipelines_body(&[(42, "deploy")]),
        )
        .await;
        let _runs = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines/42/runs",
            200,
            &runs_body(57, "2024-03-01T08:30:00.1234567Z"),
        )
        .await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        let pipeline = &aggregation.projects[0].pipelines[0];
        assert_eq!(pipeline.number_of_runs, 57);
        assert_eq!(pipeline.last_run_state.as_deref(), Some("completed"));
        assert_eq!(pipeline.last_run_result.as_deref(), Some("succeeded"));
        assert_eq!(
            pipeline.last_run_date,
            Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
                    + Duration::milliseconds(123)
            )
        );
        assert_eq!(
            pipeline.url,
            format!(
                "{}/contoso/Alpha/_build?definitionId=42&view=ms.vss-pipelineanalytics-web.new-build-definition-pipeline-analytics-view-cardmetrics",
                server.url()
            )
        );
    }

    #[tokio::test]
    async fn test_run_fetch_failure_keeps_pipeline_with_empty_run_fields() {
        let mut server = mockito::Server::new_async().await;
        let _projects =
            mock_json(&mut server, "/contoso/_apis/projects", 200, &projects_body(&["Alpha"]))
                .await;
        let _pipelines = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines",
            200,
            &pipelines_body(&[(1, "broken"), (2, "fine")]),
        )
        .await;
        let _runs_1 =
            mock_json(&mut server, "/contoso/Alpha/_apis/pipelines/1/runs", 404, "{}").await;
        let _runs_2 = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines/2/runs",
            200,
            &runs_body(2, "2024-03-01T08:30:00Z"),
        )
        .await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        let pipelines = &aggregation.projects[0].pipelines;
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].name, "broken");
        assert_eq!(pipelines[0].last_run_date, None);
        assert_eq!(pipelines[0].last_run_state, None);
        assert_eq!(pipelines[0].last_run_result, None);
        assert_eq!(pipelines[0].number_of_runs, 0);
        assert_eq!(pipelines[1].number_of_runs, 2);
        assert_eq!(aggregation.stats.run_fetch_failures, 1);
        assert_eq!(aggregation.stats.pipelines, 2);
    }

    #[tokio::test]
    async fn test_failure_causes_are_counted_separately() {
        let mut server = mockito::Server::new_async().await;
        let _projects =
            mock_json(&mut server, "/contoso/_apis/projects", 200, &projects_body(&["Alpha"]))
                .await;
        let _pipelines = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines",
            200,
            &pipelines_body(&[(1, "never"), (2, "detail-missing"), (3, "failing")]),
        )
        .await;
        let _runs_1 =
            mock_json(&mut server, "/contoso/Alpha/_apis/pipelines/1/runs", 200, EMPTY_RUNS)
                .await;
        let _runs_2 = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines/2/runs",
            200,
            r#"{"count":12,"value":[]}"#,
        )
        .await;
        let _runs_3 =
            mock_json(&mut server, "/contoso/Alpha/_apis/pipelines/3/runs", 503, "").await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        assert_eq!(
            aggregation.stats,
            FetchStats {
                projects: 1,
                pipelines: 3,
                pipeline_fetch_failures: 0,
                run_fetch_failures: 1,
                never_run: 1,
                count_without_detail: 1,
            }
        );
        let pipelines = &aggregation.projects[0].pipelines;
        assert_eq!(pipelines[1].number_of_runs, 12);
        assert!(pipelines[1].last_run_date.is_none());
    }

    #[tokio::test]
    async fn test_project_listing_failure_yields_empty_aggregation() {
        let mut server = mockito::Server::new_async().await;
        let _projects = mock_json(&mut server, "/contoso/_apis/projects", 403, "").await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        assert!(aggregation.projects.is_empty());
        assert_eq!(aggregation.stats, FetchStats::default());
    }

    #[tokio::test]
    async fn test_end_to_end_alpha_and_beta() {
        let mut server = mockito::Server::new_async().await;
        let ten_days_ago = (Utc::now() - Duration::days(10)).to_rfc3339();
        let _projects = mock_json(
            &mut server,
            "/contoso/_apis/projects",
            200,
            &projects_body(&["Alpha", "Beta"]),
        )
        .await;
        let _alpha = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines",
            200,
            &pipelines_body(&[(7, "web")]),
        )
        .await;
        let _beta =
            mock_json(&mut server, "/contoso/Beta/_apis/pipelines", 200, &pipelines_body(&[]))
                .await;
        let _runs = mock_json(
            &mut server,
            "/contoso/Alpha/_apis/pipelines/7/runs",
            200,
            &runs_body(3, &ten_days_ago),
        )
        .await;

        let aggregation = provider_for(&server).fetch_all(false).await;

        assert_eq!(aggregation.projects.len(), 2);
        let alpha = &aggregation.projects[0];
        assert_eq!(alpha.project_name, "Alpha");
        assert_eq!(alpha.pipelines.len(), 1);
        assert_eq!(alpha.pipelines[0].number_of_runs, 3);
        assert_eq!(alpha.pipelines[0].last_run_state.as_deref(), Some("completed"));
        assert_eq!(alpha.pipelines[0].last_run_result.as_deref(), Some("succeeded"));
        assert!(!is_stale(&alpha.pipelines[0], 30, Utc::now()));

        let beta = &aggregation.projects[1];
        assert_eq!(beta.project_name, "Beta");
        assert!(beta.pipelines.is_empty());
        assert!(!beta.collapsed);
    }
}
