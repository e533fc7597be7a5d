use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color as TableColor};
use std::fmt::Write;

use crate::records::{Aggregation, PipelineRecord};
use crate::staleness::{days_since_last_run, is_stale};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{create_table, last_run_cell, result_cell, stale_count_cell};

const STALEST_LIMIT: usize = 10;

/// Prints a terminal summary of an aggregation to stdout.
///
/// Displays:
/// - Overview: organization, project and pipeline counts, fetch failures
/// - Projects: per-project pipeline, stale and never-run totals
/// - Stalest pipelines: the pipelines whose last run is oldest, never-run first
pub fn print_summary(
    organization: &str,
    aggregation: &Aggregation,
    threshold_days: u32,
    now: DateTime<Utc>,
) {
    println!(
        "{}",
        render_summary(organization, aggregation, threshold_days, now)
    );
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_summary(
    organization: &str,
    aggregation: &Aggregation,
    threshold_days: u32,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let stats = &aggregation.stats;

    let all_pipelines: Vec<(&str, &PipelineRecord)> = aggregation
        .projects
        .iter()
        .flat_map(|project| {
            project
                .pipelines
                .iter()
                .map(move |pipeline| (project.project_name.as_str(), pipeline))
        })
        .collect();
    let stale_total = all_pipelines
        .iter()
        .filter(|(_, pipeline)| is_stale(pipeline, threshold_days, now))
        .count();

    add_section_header(&mut output, "📊", "Overview");
    let stale_display = if stale_total == 0 {
        bright_green(stale_total)
    } else {
        bright_red(stale_total)
    };
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {} {}\n  {} {}",
        dim("Organization:"),
        cyan(organization),
        dim("Projects:"),
        bright_yellow(aggregation.projects.len()),
        dim("Pipelines:"),
        bright_yellow(all_pipelines.len()),
        dim("Stale pipelines:"),
        stale_display,
        dim(format!("(no run in {threshold_days} days)")),
        dim("Generated:"),
        dim(now.format("%Y-%m-%d %H:%M UTC")),
    );

    let failures = stats.pipeline_fetch_failures + stats.run_fetch_failures;
    if failures > 0 {
        let _ = writeln!(
            output,
            "  {} {} pipeline listings, {} run listings (see log for details)",
            dim("Fetch failures:"),
            bright_red(stats.pipeline_fetch_failures),
            bright_red(stats.run_fetch_failures),
        );
    }
    if stats.count_without_detail > 0 {
        let _ = writeln!(
            output,
            "  {} {}",
            dim("Run counts without run detail:"),
            bright_yellow(stats.count_without_detail),
        );
    }
    output.push('\n');

    if all_pipelines.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No pipeline data found."));
        return output;
    }

    add_section_header(&mut output, "📋", "Projects");
    let mut projects_table = create_table();
    projects_table.set_header(create_cyan_header(&[
        "Project",
        "Pipelines",
        "Stale",
        "Never Run",
        "Total Runs",
    ]));
    for project in &aggregation.projects {
        let stale = project
            .pipelines
            .iter()
            .filter(|pipeline| is_stale(pipeline, threshold_days, now))
            .count();
        let never_run = project
            .pipelines
            .iter()
            .filter(|pipeline| !pipeline.has_runs())
            .count();
        let total_runs: u64 = project
            .pipelines
            .iter()
            .map(|pipeline| pipeline.number_of_runs)
            .sum();

        projects_table.add_row(vec![
            Cell::new(&project.project_name),
            Cell::new(project.pipelines.len()),
            stale_count_cell(stale, project.pipelines.len()),
            Cell::new(never_run),
            Cell::new(total_runs),
        ]);
    }
    let _ = writeln!(output, "{projects_table}\n");

    let stalest = stalest_pipelines(&all_pipelines, threshold_days, now);
    if stalest.is_empty() {
        let _ = writeln!(
            output,
            "{}",
            bright_green(format!("Every pipeline ran within {threshold_days} days."))
        );
        return output;
    }

    add_section_header(
        &mut output,
        "🕸️",
        &format!("Top {STALEST_LIMIT} Stalest Pipelines"),
    );
    let mut stalest_table = create_table();
    stalest_table.set_header(create_cyan_header(&[
        "#", "Project", "Pipeline", "Last Run", "Result", "Runs", "URL",
    ]));
    for (idx, (project, pipeline)) in stalest.iter().take(STALEST_LIMIT).enumerate() {
        stalest_table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(project),
            Cell::new(&pipeline.name),
            last_run_cell(days_since_last_run(pipeline, now)),
            result_cell(pipeline.last_run_result.as_deref()),
            Cell::new(pipeline.number_of_runs),
            Cell::new(&pipeline.url),
        ]);
    }
    if stalest.len() > STALEST_LIMIT {
        let mut row = vec![Cell::new(format!(
            "... and {} more",
            stalest.len() - STALEST_LIMIT
        ))
        .fg(TableColor::DarkGrey)];
        row.extend(vec![Cell::new(""); 6]);
        stalest_table.add_row(row);
    }
    let _ = writeln!(output, "{stalest_table}");

    output
}

/// Stale pipelines ordered oldest first; pipelines that never ran lead.
fn stalest_pipelines<'a>(
    pipelines: &[(&'a str, &'a PipelineRecord)],
    threshold_days: u32,
    now: DateTime<Utc>,
) -> Vec<(&'a str, &'a PipelineRecord)> {
    let mut stale: Vec<(&str, &PipelineRecord)> = pipelines
        .iter()
        .copied()
        .filter(|(_, pipeline)| is_stale(pipeline, threshold_days, now))
        .collect();
    // `None < Some(_)`, so never-run pipelines sort ahead of the oldest run.
    stale.sort_by_key(|(_, pipeline)| pipeline.last_run_date);
    stale
}
