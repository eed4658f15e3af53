use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::CourseCatalog;
use crate::error::Result;
use crate::services::{ProgressFn, SchedulerService, SearchRequest};
use super::types::{CandidateSchedule, EventRef, ScheduleRecord};

/// Resolves serialized schedules against the catalog
pub fn resolve_schedules(records: &[ScheduleRecord], catalog: &CourseCatalog) -> Result<Vec<CandidateSchedule>> {
    records
        .iter()
        .map(|record| {
            let events = record
                .events
                .iter()
                .map(|ev| EventRef::resolve(catalog.find_course(&ev.course)?, ev.group, ev.event))
                .collect::<Result<Vec<_>>>()?;
            Ok(CandidateSchedule::new(events, record.score, record.ratings.clone()))
        })
        .collect()
}

/// Replays schedules computed elsewhere and saved as JSON.
///
/// Schedules touching a course outside the request, leaving out a requested
/// course, or using a group the user turned off are dropped. When the
/// request carries rating weights the rest are re-scored and re-ranked,
/// otherwise the file order is kept.
pub struct JsonScheduleSource {
    path: PathBuf,
    catalog: Arc<CourseCatalog>,
}

impl JsonScheduleSource {
    pub fn new<P: Into<PathBuf>>(path: P, catalog: Arc<CourseCatalog>) -> Self {
        Self {
            path: path.into(),
            catalog,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn fits_request(schedule: &CandidateSchedule, request: &SearchRequest) -> bool {
    let within = schedule.events.iter().all(|ev| {
        let course = ev.course();
        request.courses.iter().any(|c| c.number == course.number)
            && !request
                .disallowed_groups
                .contains(&(course.number.clone(), ev.group().number))
    });
    within
        && request
            .courses
            .iter()
            .all(|c| schedule.events.iter().any(|ev| ev.course().number == c.number))
}

/// Weighted sum of the per-rater scores. Raters without a weight count once.
pub fn weighted_score(schedule: &CandidateSchedule, weights: &BTreeMap<String, f64>) -> f64 {
    schedule
        .ratings
        .iter()
        .map(|(rater, score)| score * weights.get(rater).copied().unwrap_or(1.0))
        .sum()
}

impl SchedulerService for JsonScheduleSource {
    fn search(&self, request: &SearchRequest, progress: ProgressFn<'_>) -> Result<Vec<CandidateSchedule>> {
        progress(0.0, "Reading candidate schedules");
        let text = std::fs::read_to_string(&self.path)?;
        let records: Vec<ScheduleRecord> = serde_json::from_str(&text)?;
        let schedules = resolve_schedules(&records, &self.catalog)?;

        let total = schedules.len().max(1) as f64;
        let mut accepted = Vec::new();
        for (i, schedule) in schedules.into_iter().enumerate() {
            progress(i as f64 / total, "Filtering schedules");
            if fits_request(&schedule, request) {
                accepted.push(schedule);
            }
        }

        if !request.rating_weights.is_empty() {
            for schedule in &mut accepted {
                schedule.score = weighted_score(schedule, &request.rating_weights);
            }
            // stable, so ties keep file order
            accepted.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        progress(1.0, "Search complete");

        tracing::info!(
            path = %self.path.display(),
            schedules = accepted.len(),
            weighted = !request.rating_weights.is_empty(),
            "Loaded candidate schedules"
        );
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::catalog;
    use crate::schedule::types::EventRefRecord;

    fn no_progress(_: f64, _: &str) {}

    fn record(courses: &[&str], score: f64) -> ScheduleRecord {
        rated(courses, score, vec![("free days".to_string(), score)])
    }

    fn rated(courses: &[&str], score: f64, ratings: Vec<(String, f64)>) -> ScheduleRecord {
        ScheduleRecord {
            events: courses
                .iter()
                .map(|c| EventRefRecord {
                    course: c.to_string(),
                    group: 10,
                    event: 0,
                })
                .collect(),
            score,
            ratings,
        }
    }

    fn source_with(records: &[ScheduleRecord]) -> (tempfile::NamedTempFile, Arc<CourseCatalog>, JsonScheduleSource) {
        let catalog = Arc::new(catalog());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_json::to_string(records).unwrap()).unwrap();
        let source = JsonScheduleSource::new(file.path(), Arc::clone(&catalog));
        (file, catalog, source)
    }

    fn request_for(catalog: &CourseCatalog, numbers: &[&str]) -> SearchRequest {
        SearchRequest {
            courses: numbers.iter().map(|n| catalog.find_course(n).unwrap()).collect(),
            ..SearchRequest::default()
        }
    }

    #[test]
    fn filters_by_selection_and_disallowed_groups() {
        let (_file, catalog, source) = source_with(&[
            record(&["104031", "234114"], 9.0),
            record(&["234114", "104031"], 8.0),
            record(&["104166", "104031", "234114"], 7.0),
        ]);
        let mut request = request_for(&catalog, &["104031", "234114"]);

        let found = source.search(&request, &no_progress).unwrap();
        let scores: Vec<f64> = found.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![9.0, 8.0]);

        request.disallowed_groups.insert(("234114".to_string(), 10));
        let found = source.search(&request, &no_progress).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn schedules_missing_a_selected_course_are_dropped() {
        let (_file, catalog, source) = source_with(&[
            record(&["104031"], 9.0),
            record(&["104031", "234114"], 8.0),
            record(&["234114"], 7.0),
        ]);
        let request = request_for(&catalog, &["104031", "234114"]);

        let found = source.search(&request, &no_progress).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].score, 8.0);
    }

    #[test]
    fn rating_weights_rescore_and_rerank() {
        let ratings = |free: f64, gaps: f64| vec![("free days".to_string(), free), ("no gaps".to_string(), gaps)];
        let (_file, catalog, source) = source_with(&[
            rated(&["104031"], 9.0, ratings(5.0, 1.0)),
            rated(&["104031"], 8.0, ratings(1.0, 4.0)),
        ]);
        let mut request = request_for(&catalog, &["104031"]);

        let found = source.search(&request, &no_progress).unwrap();
        assert_eq!(found.iter().map(|s| s.score).collect::<Vec<_>>(), vec![9.0, 8.0]);

        request.rating_weights.insert("free days".to_string(), 0.0);
        let found = source.search(&request, &no_progress).unwrap();
        // no gaps counts once, free days not at all
        assert_eq!(found.iter().map(|s| s.score).collect::<Vec<_>>(), vec![4.0, 1.0]);
    }

    #[test]
    fn unknown_courses_fail_resolution() {
        let catalog = catalog();
        let err = resolve_schedules(&[record(&["000000"], 1.0)], &catalog).unwrap_err();
        assert!(matches!(err, crate::error::PlannerError::UnknownCourseNumber { .. }));
    }
}
