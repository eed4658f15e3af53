//! Visibility of catalog rows for the course search box.
//!
//! [`CatalogView`] is the only mutable projection over the read-only
//! catalog: one node per faculty and per course, each with a `visible`
//! flag, and a collision marker on course nodes.

use std::sync::Arc;

use regex::Regex;

use crate::catalog::{Course, CourseCatalog};
use crate::collision::CollisionReport;
use crate::services::NicknameService;

#[derive(Debug, Clone, PartialEq)]
pub struct CourseNode {
    pub course: Arc<Course>,
    pub visible: bool,
    pub colliding: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacultyNode {
    pub name: String,
    pub visible: bool,
    pub courses: Vec<CourseNode>,
}

/// How a query is matched against course rows
#[derive(Debug, Clone)]
pub enum QueryMatcher {
    /// Empty or malformed query
    MatchAll,
    /// Query starting with a digit: literal course-number prefix
    NumberPrefix(String),
    /// Any other query: pattern searched in the display name
    NamePattern(Regex),
}

impl QueryMatcher {
    pub fn parse(query: &str) -> Self {
        if query.is_empty() {
            return Self::MatchAll;
        }
        if query.starts_with(|c: char| c.is_ascii_digit()) {
            return Self::NumberPrefix(query.to_string());
        }
        match Regex::new(query) {
            Ok(pattern) => Self::NamePattern(pattern),
            Err(err) => {
                tracing::debug!(query, error = %err, "Malformed search pattern, showing every course");
                Self::MatchAll
            }
        }
    }

    /// Nicknames take precedence over the raw name when one exists
    pub fn matches(&self, course: &Course, nicknames: &dyn NicknameService) -> bool {
        match self {
            Self::MatchAll => true,
            Self::NumberPrefix(prefix) => course.number.starts_with(prefix.as_str()),
            Self::NamePattern(pattern) => match nicknames.beautify(&course.name) {
                Some(nick) => pattern.is_match(&nick),
                None => pattern.is_match(&course.name),
            },
        }
    }
}

/// Faculty/course nodes with derived visibility and collision flags
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    faculties: Vec<FacultyNode>,
    query: String,
}

impl CatalogView {
    /// Every node starts visible and not colliding
    pub fn new(catalog: &CourseCatalog) -> Self {
        let faculties = catalog
            .faculties()
            .iter()
            .map(|faculty| FacultyNode {
                name: faculty.name.clone(),
                visible: true,
                courses: faculty
                    .courses
                    .iter()
                    .map(|course| CourseNode {
                        course: Arc::clone(course),
                        visible: true,
                        colliding: false,
                    })
                    .collect(),
            })
            .collect();
        Self {
            faculties,
            query: String::new(),
        }
    }

    pub fn faculties(&self) -> &[FacultyNode] {
        &self.faculties
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn course_node(&self, number: &str) -> Option<&CourseNode> {
        self.faculties
            .iter()
            .flat_map(|f| f.courses.iter())
            .find(|n| n.course.number == number)
    }

    pub fn visible_courses(&self) -> impl Iterator<Item = &CourseNode> {
        self.faculties
            .iter()
            .flat_map(|f| f.courses.iter())
            .filter(|n| n.visible)
    }

    /// Recomputes every `visible` flag for `query`. A faculty is visible
    /// iff at least one of its courses is, except that an empty or
    /// malformed query shows every node, empty faculties included.
    pub fn set_query(&mut self, query: &str, nicknames: &dyn NicknameService) {
        let matcher = QueryMatcher::parse(query);
        let show_all = matches!(matcher, QueryMatcher::MatchAll);
        self.query = query.to_string();

        let mut shown = 0usize;
        for faculty in &mut self.faculties {
            if show_all {
                faculty.visible = true;
                for node in &mut faculty.courses {
                    node.visible = true;
                }
                shown += faculty.courses.len();
                continue;
            }
            faculty.visible = false;
            for node in &mut faculty.courses {
                node.visible = matcher.matches(&node.course, nicknames);
                faculty.visible |= node.visible;
                shown += usize::from(node.visible);
            }
        }
        tracing::debug!(query, shown, "Search complete");
    }

    /// Copies collision markers from the latest report
    pub fn apply_collisions(&mut self, report: &CollisionReport) {
        for node in self.faculties.iter_mut().flat_map(|f| f.courses.iter_mut()) {
            node.colliding = report.is_colliding(&node.course.number);
        }
    }
}
