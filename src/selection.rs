use std::sync::Arc;

use crate::catalog::{Course, CourseCatalog};
use crate::collision::{CollisionDetector, CollisionReport};
use crate::error::{PlannerError, Result};

/// Ordered, duplicate-free list of selected courses.
///
/// Courses can only enter through a catalog lookup, and every mutation
/// recomputes the exam collision report.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    courses: Vec<Arc<Course>>,
    collisions: CollisionReport,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn courses(&self) -> &[Arc<Course>] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn contains(&self, number: &str) -> bool {
        self.position(number).is_some()
    }

    /// Index of the course in selection order; used as its color index
    pub fn position(&self, number: &str) -> Option<usize> {
        self.courses.iter().position(|c| c.number == number)
    }

    pub fn numbers(&self) -> Vec<String> {
        self.courses.iter().map(|c| c.number.clone()).collect()
    }

    pub fn collisions(&self) -> &CollisionReport {
        &self.collisions
    }

    /// Adds a catalog course. Returns `Ok(false)` if it is already selected.
    pub fn add(&mut self, catalog: &CourseCatalog, number: &str) -> Result<bool> {
        let course = catalog.find_course(number)?;
        if self.contains(&course.number) {
            return Ok(false);
        }
        tracing::info!(course = %course, "Selected course");
        self.courses.push(course);
        self.recompute();
        Ok(true)
    }

    pub fn remove(&mut self, number: &str) -> Option<Arc<Course>> {
        let index = self.position(number)?;
        let course = self.courses.remove(index);
        tracing::info!(course = %course, "Dropped course");
        self.recompute();
        Some(course)
    }

    /// Returns false if there was nothing to clear
    pub fn clear(&mut self) -> bool {
        if self.courses.is_empty() {
            return false;
        }
        self.courses.clear();
        self.recompute();
        true
    }

    /// Replaces the selection with `numbers`, skipping numbers the catalog
    /// does not know. The skipped numbers come back as errors.
    pub fn restore<S: AsRef<str>>(&mut self, catalog: &CourseCatalog, numbers: &[S]) -> Vec<PlannerError> {
        self.courses.clear();
        let mut skipped = Vec::new();
        for number in numbers {
            let number = number.as_ref();
            match catalog.find_course(number) {
                Ok(course) if !self.contains(&course.number) => self.courses.push(course),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        course = number,
                        "A course in the saved selection no longer exists in the catalog"
                    );
                    skipped.push(err);
                }
            }
        }
        self.recompute();
        skipped
    }

    fn recompute(&mut self) {
        self.collisions = CollisionDetector::recompute(&self.courses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::catalog;

    #[test]
    fn add_is_duplicate_free_and_ordered() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        assert!(selection.add(&catalog, "234114").unwrap());
        assert!(selection.add(&catalog, "104031").unwrap());
        assert!(!selection.add(&catalog, "234114").unwrap());
        assert_eq!(selection.numbers(), vec!["234114", "104031"]);
        assert_eq!(selection.position("104031"), Some(1));
    }

    #[test]
    fn add_rejects_courses_outside_the_catalog() {
        let mut selection = SelectionSet::new();
        assert!(matches!(
            selection.add(&catalog(), "000000"),
            Err(PlannerError::UnknownCourseNumber { .. })
        ));
        assert!(selection.is_empty());
    }

    #[test]
    fn removal_recomputes_collisions() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        selection.add(&catalog, "104031").unwrap();
        selection.add(&catalog, "234114").unwrap();
        assert!(selection.collisions().any_collision);

        selection.remove("234114").unwrap();
        assert!(!selection.collisions().any_collision);
        assert!(selection.remove("234114").is_none());
    }

    #[test]
    fn clear_resets_collisions() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        assert!(!selection.clear());
        selection.add(&catalog, "104031").unwrap();
        selection.add(&catalog, "234114").unwrap();
        assert!(selection.clear());
        assert!(!selection.collisions().any_collision);
    }

    #[test]
    fn restore_skips_unknown_numbers() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        let skipped = selection.restore(&catalog, &["104031", "555555", "234114", "104031"]);
        assert_eq!(selection.numbers(), vec!["104031", "234114"]);
        assert_eq!(skipped.len(), 1);
        assert!(matches!(&skipped[0], PlannerError::UnknownCourseNumber { number } if number == "555555"));
        assert!(selection.collisions().is_colliding("104031"));
    }
}
