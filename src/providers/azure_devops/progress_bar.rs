use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::records::FetchStats;

/// Progress indication for the two-phase aggregation: listing projects,
/// then walking each project's pipelines and latest runs.
pub struct FetchProgress {
    pb: ProgressBar,
    visible: bool,
}

impl FetchProgress {
    /// Starts Phase 1. A hidden progress draws nothing (used by the server).
    pub fn start_phase_1(visible: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(draw_target(visible));
        pb.set_style(spinner_style());
        pb.set_message("Phase 1/2: Fetching projects...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb, visible }
    }

    /// Finish Phase 1 and start Phase 2 with one step per project
    pub fn finish_phase_1_start_phase_2(self, project_count: usize) -> Self {
        self.pb
            .finish_with_message(format!("✓ Phase 1/2: Fetched {project_count} projects"));

        let pb = ProgressBar::new(project_count as u64);
        pb.set_draw_target(draw_target(self.visible));
        pb.set_style(bar_style());
        pb.set_message("Phase 2/2: Fetching pipelines and latest runs...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            visible: self.visible,
        }
    }

    pub fn project_started(&self, project: &str) {
        self.pb.set_message(format!("Phase 2/2: {project}"));
    }

    pub fn project_finished(&self) {
        self.pb.inc(1);
    }

    pub fn finish_phase_2(self, stats: &FetchStats) {
        self.pb.finish_with_message(format!(
            "✓ Phase 2/2: Fetched {} pipelines across {} projects",
            stats.pipelines, stats.projects
        ));
    }
}

fn draw_target(visible: bool) -> ProgressDrawTarget {
    if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}
