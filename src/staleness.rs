use chrono::{DateTime, Utc};

use crate::records::PipelineRecord;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Default number of days after which a pipeline counts as stale.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 30;

/// Returns true when the pipeline has not run within `threshold_days` of `now`.
///
/// Pipelines without a recorded run are always stale. The comparison is
/// strict and done in whole milliseconds, matching the `isStale` function of
/// the HTML report, so a run exactly `threshold_days` old is not stale.
pub fn is_stale(pipeline: &PipelineRecord, threshold_days: u32, now: DateTime<Utc>) -> bool {
    match pipeline.last_run_date {
        None => true,
        Some(last_run) => {
            let elapsed = (now - last_run).num_milliseconds();
            elapsed > i64::from(threshold_days) * MILLIS_PER_DAY
        }
    }
}

/// Whole days since the last run, or `None` when the pipeline never ran.
pub fn days_since_last_run(pipeline: &PipelineRecord, now: DateTime<Utc>) -> Option<i64> {
    pipeline
        .last_run_date
        .map(|last_run| (now - last_run).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn pipeline_last_run(last_run_date: Option<DateTime<Utc>>) -> PipelineRecord {
        PipelineRecord {
            id: 1,
            name: "build".to_string(),
            folder: String::new(),
            url: String::new(),
            last_run_date,
            last_run_state: last_run_date.map(|_| "completed".to_string()),
            last_run_result: last_run_date.map(|_| "succeeded".to_string()),
            number_of_runs: u64::from(last_run_date.is_some()),
        }
    }

    #[test]
    fn never_run_pipeline_is_stale_for_any_threshold() {
        let pipeline = pipeline_last_run(None);

        for threshold in [0, 1, 30, 365, u32::MAX] {
            assert!(is_stale(&pipeline, threshold, now()));
        }
    }

    #[test]
    fn run_exactly_at_threshold_is_not_stale() {
        let pipeline = pipeline_last_run(Some(now() - Duration::days(30)));

        assert!(!is_stale(&pipeline, 30, now()));
    }

    #[test]
    fn run_one_second_past_threshold_is_stale() {
        let pipeline =
            pipeline_last_run(Some(now() - Duration::days(30) - Duration::seconds(1)));

        assert!(is_stale(&pipeline, 30, now()));
    }

    #[test]
    fn recent_run_is_not_stale() {
        let pipeline = pipeline_last_run(Some(now() - Duration::days(10)));

        assert!(!is_stale(&pipeline, 30, now()));
    }

    #[test]
    fn zero_threshold_marks_any_past_run_stale() {
        let pipeline = pipeline_last_run(Some(now() - Duration::milliseconds(1)));

        assert!(is_stale(&pipeline, 0, now()));
        assert!(!is_stale(&pipeline_last_run(Some(now())), 0, now()));
    }

    #[test]
    fn future_run_is_not_stale() {
        let pipeline = pipeline_last_run(Some(now() + Duration::hours(2)));

        assert!(!is_stale(&pipeline, 0, now()));
    }

    #[test]
    fn days_since_last_run_truncates() {
        let pipeline = pipeline_last_run(Some(now() - Duration::hours(49)));

        assert_eq!(days_since_last_run(&pipeline, now()), Some(2));
        assert_eq!(days_since_last_run(&pipeline_last_run(None), now()), None);
    }
}
