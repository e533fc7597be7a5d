use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::PipescopeError;
use crate::staleness::DEFAULT_THRESHOLD_DAYS;

/// Configuration file structure for pipescope.
///
/// Every value can be left out; connection values can also come from the
/// command line or the environment, which take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Azure DevOps connection
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    /// Report generation
    #[serde(default)]
    pub report: ReportConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureDevOpsConfig {
    /// Organization name, e.g. `contoso` for `https://dev.azure.com/contoso`
    pub organization: Option<String>,

    /// Personal access token with Build (Read) and Project (Read) scopes
    pub token: Option<String>,

    /// Azure DevOps base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API version sent with every request
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Pipelines whose last run is older than this are stale
    #[serde(default = "default_stale_threshold_days")]
    pub stale_threshold_days: u32,

    /// Where the HTML report is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Open the HTML report with the platform's default handler
    #[serde(default = "default_true")]
    pub open_in_browser: bool,

    /// Report heading and page title
    #[serde(default = "default_title")]
    pub title: String,

    /// Name/folder substrings that get a "Hide" toggle in the report
    #[serde(default = "default_exclusion_tags")]
    pub exclusion_tags: Vec<String>,

    /// Default output format of the `report` command
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Address the `serve` command listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
    Csv,
    Summary,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            organization: None,
            token: None,
            base_url: default_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stale_threshold_days: default_stale_threshold_days(),
            output_path: default_output_path(),
            open_in_browser: true,
            title: default_title(),
            exclusion_tags: default_exclusion_tags(),
            format: OutputFormat::Html,
            pretty: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_api_version() -> String {
    "7.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_stale_threshold_days() -> u32 {
    DEFAULT_THRESHOLD_DAYS
}

fn default_output_path() -> PathBuf {
    PathBuf::from("AzureDevOpsReport.html")
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    "Azure DevOps Pipeline Report".to_string()
}

fn default_exclusion_tags() -> Vec<String> {
    vec!["archived".to_string(), "deprecated".to_string()]
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Validated connection settings; building one is the point where missing
/// configuration becomes fatal.
#[derive(Debug)]
pub struct AzureDevOpsSettings {
    pub base_url: Url,
    pub organization: String,
    pub token: Token,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl AzureDevOpsConfig {
    /// Overrides file values with values given on the command line or in the
    /// environment.
    pub fn apply_overrides(
        &mut self,
        organization: Option<&str>,
        token: Option<&str>,
        base_url: Option<&str>,
    ) {
        if let Some(organization) = organization {
            self.organization = Some(organization.to_string());
        }
        if let Some(token) = token {
            self.token = Some(token.to_string());
        }
        if let Some(base_url) = base_url {
            self.base_url = base_url.to_string();
        }
    }

    /// Validates the connection configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipescopeError::Config`] when the organization or token is
    /// missing or blank, the base URL is invalid, or the timeout is zero.
    pub fn resolve(&self) -> crate::error::Result<AzureDevOpsSettings> {
        let organization = self
            .organization
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .ok_or_else(|| {
                PipescopeError::Config(
                    "Missing Azure DevOps organization (use --organization, ADO_ORGANIZATION or azure-devops.organization)"
                        .to_string(),
                )
            })?;

        let token = self
            .token
            .as_deref()
            .map(Token::from)
            .filter(|token| !token.is_blank())
            .ok_or_else(|| {
                PipescopeError::Config(
                    "Missing Azure DevOps personal access token (use --token, ADO_PAT or azure-devops.token)"
                        .to_string(),
                )
            })?;

        let base_url = Url::parse(&self.base_url)
            .map_err(|e| PipescopeError::Config(format!("Invalid base URL {}: {e}", self.base_url)))?;

        if self.request_timeout_secs == 0 {
            return Err(PipescopeError::Config(
                "request-timeout-secs must be greater than zero".to_string(),
            ));
        }

        Ok(AzureDevOpsSettings {
            base_url,
            organization: organization.to_string(),
            token,
            api_version: self.api_version.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

#[cfg(test)]
impl AzureDevOpsSettings {
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            base_url: Url::parse(base_url).unwrap(),
            organization: "contoso".to_string(),
            token: Token::from("pat"),
            api_version: "7.0".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./pipescope.toml
    /// 3. ./pipescope.json
    /// 4. ./pipescope.yaml
    /// 5. ./pipescope.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "pipescope.toml",
            "pipescope.json",
            "pipescope.yaml",
            "pipescope.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
