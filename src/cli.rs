use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AzureDevOpsSettings, Config, OutputFormat};
use crate::output::{
    export_csv, export_json, open_in_browser, print_summary, render_html, RenderOptions,
};
use crate::providers::AzureDevOpsProvider;
use crate::server::{self, AppState};

#[derive(Parser)]
#[command(name = "pipescope")]
#[command(author, version, about = "Azure DevOps pipeline staleness report", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a pipescope.toml/.json/.yaml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Azure DevOps organization
    #[arg(long, global = true, env = "ADO_ORGANIZATION")]
    organization: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "ADO_PAT", hide_env_values = true)]
    token: Option<String>,

    /// Azure DevOps base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every pipeline and write a report
    Report {
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (HTML defaults to report.output-path, others to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not open the HTML report afterwards
        #[arg(long, default_value_t = false)]
        no_open: bool,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
    /// Serve reports over HTTP
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        bind: Option<String>,
    },
}

impl Cli {
    /// Loads configuration and applies command line overrides. Missing
    /// connection settings fail here, before any request is sent.
    fn load_config(&self) -> Result<(Config, AzureDevOpsSettings)> {
        let mut config = Config::load(self.config.as_deref())?;
        config.azure_devops.apply_overrides(
            self.organization.as_deref(),
            self.token.as_deref(),
            self.base_url.as_deref(),
        );

        let settings = config.azure_devops.resolve().map_err(|e| {
            error!("{e}");
            e
        })?;

        Ok((config, settings))
    }

    async fn execute_report(
        &self,
        format: Option<OutputFormat>,
        output: Option<&Path>,
        no_open: bool,
        pretty: bool,
    ) -> Result<()> {
        let (config, settings) = self.load_config()?;
        let report = config.report;
        let format = format.unwrap_or(report.format);

        let provider = AzureDevOpsProvider::new(settings)?;
        let show_progress = console::Term::stderr().is_term();
        let aggregation = provider.fetch_all(show_progress).await;
        let now = Utc::now();

        match format {
            OutputFormat::Html => {
                let options = RenderOptions {
                    title: report.title.clone(),
                    threshold_days: report.stale_threshold_days,
                    exclusion_tags: report.exclusion_tags.clone(),
                    generated_at: now,
                };
                let html = render_html(&aggregation.projects, &options)?;

                let path = output.unwrap_or(report.output_path.as_path());
                std::fs::write(path, html)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                info!("Report written to: {}", path.display());

                if report.open_in_browser && !no_open {
                    open_in_browser(path);
                }
            }
            OutputFormat::Json | OutputFormat::Csv => {
                let mut writer: Box<dyn Write> = match output {
                    Some(path) => Box::new(File::create(path).with_context(|| {
                        format!("Failed to create output file: {}", path.display())
                    })?),
                    None => Box::new(std::io::stdout().lock()),
                };

                if format == OutputFormat::Json {
                    export_json(&aggregation.projects, pretty || report.pretty, &mut writer)?;
                } else {
                    export_csv(
                        &aggregation.projects,
                        report.stale_threshold_days,
                        now,
                        &mut writer,
                    )?;
                }
                writer.flush()?;

                if let Some(path) = output {
                    info!("Report written to: {}", path.display());
                }
            }
            OutputFormat::Summary => {
                print_summary(
                    provider.organization(),
                    &aggregation,
                    report.stale_threshold_days,
                    now,
                );
            }
        }

        Ok(())
    }

    async fn execute_serve(&self, bind: Option<&str>) -> Result<()> {
        let (config, settings) = self.load_config()?;
        let bind = bind.unwrap_or(config.server.bind.as_str()).to_string();

        let provider = AzureDevOpsProvider::new(settings)?;
        let state = Arc::new(AppState {
            provider,
            report: config.report,
        });

        server::serve(state, &bind).await?;
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Report {
                format,
                output,
                no_open,
                pretty,
            } => {
                self.execute_report(*format, output.as_deref(), *no_open, *pretty)
                    .await
            }
            Commands::Serve { bind } => self.execute_serve(bind.as_deref()).await,
        }
    }
}
