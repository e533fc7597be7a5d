mod core;
mod pipelines;

pub use self::core::AzureDevOpsClient;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AzureDevOpsSettings;
    use crate::providers::azure_devops::types::FetchFailure;
    use mockito::Matcher;
    use std::io::Write;
    use std::time::Duration;

    fn client_for(server: &mockito::ServerGuard) -> AzureDevOpsClient {
        AzureDevOpsClient::new(AzureDevOpsSettings::for_base_url(&server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_list_projects_sends_basic_auth_and_api_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.0".into()))
            .match_header("authorization", "Basic OnBhdA==")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":2,"value":[{"id":"p-1","name":"Beta"},{"id":"p-2","name":"Alpha"}]}"#)
            .create_async()
            .await;

        let projects = client_for(&server).list_projects().await;

        mock.assert_async().await;
        assert!(!projects.is_degraded());
        let names: Vec<&str> = projects.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_list_projects_degrades_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Access denied")
            .create_async()
            .await;

        let projects = client_for(&server).list_projects().await;

        assert!(projects.items.is_empty());
        assert_eq!(projects.total_count, 0);
        assert_eq!(projects.failure, Some(FetchFailure::Status(401)));
    }

    #[tokio::test]
    async fn test_list_pipelines_degrades_on_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/Alpha/_apis/pipelines")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>sign in</html>")
            .create_async()
            .await;

        let pipelines = client_for(&server).list_pipelines("Alpha").await;

        assert!(pipelines.items.is_empty());
        assert!(matches!(pipelines.failure, Some(FetchFailure::Decode(_))));
    }

    #[tokio::test]
    async fn test_list_latest_runs_requests_newest_first_and_keeps_total() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/Alpha/_apis/pipelines/42/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), "7.0".into()),
                Matcher::UrlEncoded("$top".into(), "1".into()),
                Matcher::UrlEncoded("$orderby".into(), "createdDate desc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"count":57,"value":[{"id":900,"state":"completed","result":"succeeded","createdDate":"2024-03-01T08:30:00Z"}]}"#,
            )
            .create_async()
            .await;

        let runs = client_for(&server).list_latest_runs("Alpha", 42, 1).await;

        mock.assert_async().await;
        assert_eq!(runs.total_count, 57);
        assert_eq!(runs.items.len(), 1);
        assert_eq!(runs.items[0].id, 900);
    }

    #[tokio::test]
    async fn test_list_latest_runs_times_out() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/Alpha/_apis/pipelines/42/runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(Duration::from_millis(800));
                writer.write_all(br#"{"count":0,"value":[]}"#)
            })
            .create_async()
            .await;

        let mut settings = AzureDevOpsSettings::for_base_url(&server.url());
        settings.request_timeout = Duration::from_millis(100);
        let client = AzureDevOpsClient::new(settings).unwrap();

        let runs = client.list_latest_runs("Alpha", 42, 1).await;

        assert_eq!(runs.failure, Some(FetchFailure::Timeout));
        assert!(runs.items.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider_degrades_to_transport_failure() {
        let settings = AzureDevOpsSettings::for_base_url("http://127.0.0.1:1");
        let client = AzureDevOpsClient::new(settings).unwrap();

        let projects = client.list_projects().await;

        assert!(projects.items.is_empty());
        assert!(matches!(projects.failure, Some(FetchFailure::Transport(_))));
    }

    #[test]
    fn test_api_url_encodes_project_segment() {
        let settings = AzureDevOpsSettings::for_base_url("https://dev.azure.com");
        let client = AzureDevOpsClient::new(settings).unwrap();

        let url = client
            .api_url(&["Payments Platform", "_apis", "pipelines"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/Payments%20Platform/_apis/pipelines?api-version=7.0"
        );
    }
}
