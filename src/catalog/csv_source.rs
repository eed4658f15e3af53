use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::error::{PlannerError, Result};
use crate::services::{DataSource, ProgressFn};
use super::time_utils::{parse_date, parse_time_of_day};
use super::types::{Course, CourseCatalog, Event, Faculty, Group};

/// One CSV row describes one weekly event of a group. Groups without a
/// schedule leave `day`, `start` and `end` empty.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    faculty: String,
    course_number: String,
    course_name: String,
    #[serde(default)]
    lecturer_in_charge: String,
    #[serde(default)]
    academic_points: String,
    #[serde(default)]
    first_exam: String,
    #[serde(default)]
    second_exam: String,
    group_number: u32,
    #[serde(default)]
    group_type: String,
    #[serde(default)]
    group_lecturer: String,
    #[serde(default)]
    day: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    #[serde(default)]
    place: String,
}

struct FacultyBuilder {
    name: String,
    courses: Vec<Course>,
}

/// Returns the trimmed value, or None if it is empty
fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_optional_date(value: &str) -> Result<Option<chrono::NaiveDate>> {
    non_empty(value).map(|v| parse_date(&v)).transpose()
}

fn row_error(line: u64, err: PlannerError) -> PlannerError {
    PlannerError::CatalogRow {
        line,
        reason: err.to_string(),
    }
}

fn course_from_row(row: &CatalogRow, line: u64) -> Result<Course> {
    let academic_points = match non_empty(&row.academic_points) {
        Some(points) => Some(points.parse::<f32>().map_err(|_| PlannerError::CatalogRow {
            line,
            reason: format!("invalid academic points \"{}\"", points),
        })?),
        None => None,
    };

    Ok(Course {
        number: row.course_number.trim().to_string(),
        name: row.course_name.trim().to_string(),
        lecturer_in_charge: non_empty(&row.lecturer_in_charge),
        academic_points,
        first_exam: parse_optional_date(&row.first_exam).map_err(|e| row_error(line, e))?,
        second_exam: parse_optional_date(&row.second_exam).map_err(|e| row_error(line, e))?,
        groups: Vec::new(),
    })
}

fn event_from_row(row: &CatalogRow, line: u64) -> Result<Option<Event>> {
    let Some(day) = non_empty(&row.day) else {
        return Ok(None);
    };
    let day: u8 = day.parse().map_err(|_| PlannerError::CatalogRow {
        line,
        reason: format!("invalid day \"{}\"", day),
    })?;
    let start = parse_time_of_day(&row.start).map_err(|e| row_error(line, e))?;
    let end = parse_time_of_day(&row.end).map_err(|e| row_error(line, e))?;
    Event::new(day, start, end, non_empty(&row.place))
        .map(Some)
        .map_err(|e| row_error(line, e))
}

/// Reads a catalog from CSV text, keeping faculties, courses, groups and
/// events in the order they first appear.
pub fn read_catalog<R: Read>(input: R, progress: ProgressFn<'_>) -> Result<CourseCatalog> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let headers: StringRecord = reader.headers()?.clone();

    let mut faculties: Vec<FacultyBuilder> = Vec::new();
    let mut faculty_index: HashMap<String, usize> = HashMap::new();
    // course number -> (faculty index, course index)
    let mut course_index: HashMap<String, (usize, usize)> = HashMap::new();

    progress(0.0, "Reading course catalog");

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: CatalogRow = record.deserialize(Some(&headers))?;

        if row.course_number.trim().is_empty() {
            tracing::debug!(line, "Skipping catalog row without a course number");
            continue;
        }

        let fi = match faculty_index.get(row.faculty.trim()) {
            Some(&fi) => fi,
            None => {
                faculties.push(FacultyBuilder {
                    name: row.faculty.trim().to_string(),
                    courses: Vec::new(),
                });
                faculty_index.insert(row.faculty.trim().to_string(), faculties.len() - 1);
                faculties.len() - 1
            }
        };

        let number = row.course_number.trim().to_string();
        let (cfi, ci) = match course_index.get(&number) {
            Some(&pos) => pos,
            None => {
                let course = course_from_row(&row, line)?;
                faculties[fi].courses.push(course);
                let pos = (fi, faculties[fi].courses.len() - 1);
                course_index.insert(number, pos);
                pos
            }
        };
        let course = &mut faculties[cfi].courses[ci];

        let gi = match course.group_index(row.group_number) {
            Some(gi) => gi,
            None => {
                course.groups.push(Group {
                    number: row.group_number,
                    kind: row.group_type.trim().to_string(),
                    lecturer: non_empty(&row.group_lecturer),
                    events: Vec::new(),
                });
                course.groups.len() - 1
            }
        };

        if let Some(event) = event_from_row(&row, line)? {
            course.groups[gi].events.push(event);
        }
    }

    let total = faculties.len().max(1) as f64;
    let mut built = Vec::with_capacity(faculties.len());
    for (i, faculty) in faculties.into_iter().enumerate() {
        progress(i as f64 / total, "Populating available courses");
        built.push(Faculty {
            name: faculty.name,
            courses: faculty.courses.into_iter().map(Arc::new).collect(),
        });
    }
    progress(1.0, "Catalog loaded");

    let catalog = CourseCatalog::new(built);
    tracing::info!(
        faculties = catalog.faculties().len(),
        courses = catalog.course_count(),
        "Loaded course catalog"
    );
    Ok(catalog)
}

/// Loads a catalog from a CSV file
pub fn load_catalog<P: AsRef<Path>>(csv_path: P, progress: ProgressFn<'_>) -> Result<CourseCatalog> {
    let file = std::fs::File::open(csv_path)?;
    read_catalog(file, progress)
}

/// CSV-backed data source. The parsed catalog is kept after the first load;
/// `force_refresh` re-reads the file.
pub struct CsvCatalogSource {
    path: PathBuf,
    cache: Mutex<Option<CourseCatalog>>,
}

impl CsvCatalogSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvCatalogSource {
    fn load(&self, force_refresh: bool, progress: ProgressFn<'_>) -> Result<CourseCatalog> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !force_refresh {
            if let Some(catalog) = cache.as_ref() {
                tracing::debug!(path = %self.path.display(), "Using cached catalog");
                progress(1.0, "Catalog loaded");
                return Ok(catalog.clone());
            }
        }

        let catalog = load_catalog(&self.path, progress)?;
        *cache = Some(catalog.clone());
        Ok(catalog)
    }
}
