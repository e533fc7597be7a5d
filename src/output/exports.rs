use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;

use crate::records::ProjectRecord;

/// Writes the aggregated projects as JSON, in the same camelCase shape the
/// HTML report embeds.
pub fn export_json(projects: &[ProjectRecord], pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(projects)?
    } else {
        serde_json::to_string(projects)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

/// Writes one CSV row per pipeline. Pipelines without runs leave the run
/// columns empty.
pub fn export_csv(
    projects: &[ProjectRecord],
    threshold_days: u32,
    now: DateTime<Utc>,
    output: &mut dyn Write,
) -> Result<()> {
    writeln!(
        output,
        "Project,Pipeline ID,Pipeline,Folder,Last Run Date,Last Run State,Last Run Result,Number of Runs,Stale,URL"
    )?;

    for project in projects {
        for pipeline in &project.pipelines {
            let last_run_date = pipeline
                .last_run_date
                .map(|date| date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
                .unwrap_or_default();
            writeln!(
                output,
                "{},{},{},{},{},{},{},{},{},{}",
                csv_field(&project.project_name),
                pipeline.id,
                csv_field(&pipeline.name),
                csv_field(&pipeline.folder),
                last_run_date,
                csv_field(pipeline.last_run_state.as_deref().unwrap_or("")),
                csv_field(pipeline.last_run_result.as_deref().unwrap_or("")),
                pipeline.number_of_runs,
                crate::staleness::is_stale(pipeline, threshold_days, now),
                csv_field(&pipeline.url),
            )?;
        }
    }

    Ok(())
}

/// Quotes a field when it contains a delimiter, a quote or a line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
