//! Exam-date collision detection over the selected courses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::Course;

/// Result of a full collision pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Numbers of courses sharing an exam date with another selected course
    pub colliding: BTreeSet<String>,
    /// Course number -> numbers of the courses it shares an exam date with
    pub partners: BTreeMap<String, BTreeSet<String>>,
    pub any_collision: bool,
}

impl CollisionReport {
    pub fn is_colliding(&self, number: &str) -> bool {
        self.colliding.contains(number)
    }

    pub fn partners_of(&self, number: &str) -> impl Iterator<Item = &str> {
        self.partners.get(number).into_iter().flatten().map(String::as_str)
    }
}

pub struct CollisionDetector;

impl CollisionDetector {
    /// Recomputes collisions from scratch. A course is never compared with
    /// itself, so its two sittings falling on one date is not a collision.
    pub fn recompute(selection: &[Arc<Course>]) -> CollisionReport {
        let mut report = CollisionReport::default();

        for (i, course) in selection.iter().enumerate() {
            let mine: BTreeSet<NaiveDate> = course.exam_dates().collect();
            if mine.is_empty() {
                continue;
            }

            for (j, other) in selection.iter().enumerate() {
                if i == j {
                    continue;
                }
                if other.exam_dates().any(|d| mine.contains(&d)) {
                    report
                        .partners
                        .entry(course.number.clone())
                        .or_default()
                        .insert(other.number.clone());
                }
            }
        }

        report.colliding = report.partners.keys().cloned().collect();
        report.any_collision = !report.colliding.is_empty();
        if report.any_collision {
            tracing::info!(courses = ?report.colliding, "Selected courses have colliding exam dates");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::{course, date};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn shared_first_exam_marks_both_courses() {
        let a = course("A", "Course A", Some(date(2024, 7, 1)), None);
        let b = course("B", "Course B", Some(date(2024, 7, 1)), None);
        let report = CollisionDetector::recompute(&[a, b]);
        assert_eq!(
            report.colliding,
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
        assert!(report.any_collision);
    }

    #[test]
    fn empty_selection_has_no_collisions() {
        let report = CollisionDetector::recompute(&[]);
        assert!(report.colliding.is_empty());
        assert!(!report.any_collision);
    }

    #[test]
    fn first_and_second_sittings_are_compared() {
        let a = course("A", "Course A", Some(date(2024, 7, 1)), Some(date(2024, 7, 20)));
        let b = course("B", "Course B", None, Some(date(2024, 7, 20)));
        let c = course("C", "Course C", Some(date(2024, 7, 5)), None);
        let report = CollisionDetector::recompute(&[a, b, c]);
        assert_eq!(report.colliding, BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(report.partners_of("B").collect::<Vec<_>>(), vec!["A"]);
        assert!(!report.is_colliding("C"));
    }

    #[test]
    fn course_does_not_collide_with_itself() {
        let a = course("A", "Course A", Some(date(2024, 7, 1)), Some(date(2024, 7, 1)));
        let report = CollisionDetector::recompute(&[a]);
        assert!(!report.any_collision);
    }

    fn arb_exam() -> impl Strategy<Value = Option<NaiveDate>> {
        prop::option::of((1u32..=6).prop_map(|d| date(2024, 7, d)))
    }

    proptest! {
        #[test]
        fn prop_collisions_are_symmetric(exams in prop::collection::vec((arb_exam(), arb_exam()), 0..8)) {
            let selection: Vec<Arc<Course>> = exams
                .iter()
                .enumerate()
                .map(|(i, (first, second))| course(&i.to_string(), "C", *first, *second))
                .collect();
            let report = CollisionDetector::recompute(&selection);

            for (a, partners) in &report.partners {
                for b in partners {
                    prop_assert!(report.partners_of(b).any(|p| p == a));
                    prop_assert!(report.is_colliding(b));
                }
            }
            prop_assert_eq!(report.any_collision, !report.colliding.is_empty());
        }
    }
}
