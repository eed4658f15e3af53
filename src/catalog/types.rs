use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use super::time_utils::{day_fraction, weekday_from_day};

/// A weekly meeting of a group. Always falls on a real weekday and ends
/// after it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventFields", into = "EventFields")]
pub struct Event {
    weekday: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    place: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct EventFields {
    /// 1 = Sunday ... 7 = Saturday
    day: u8,
    start: NaiveTime,
    end: NaiveTime,
    place: Option<String>,
}

impl Event {
    pub fn new(day: u8, start: NaiveTime, end: NaiveTime, place: Option<String>) -> Result<Self> {
        let weekday = weekday_from_day(day)?;
        if end <= start {
            return Err(PlannerError::InvalidEventTimes { start, end });
        }
        Ok(Self {
            weekday,
            start,
            end,
            place,
        })
    }

    /// 1 = Sunday ... 7 = Saturday
    pub fn day(&self) -> u8 {
        // num_days_from_sunday is 0..=6
        self.weekday.num_days_from_sunday() as u8 + 1
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }

    /// Start time as a fraction of the day
    pub fn start_fraction(&self) -> f64 {
        day_fraction(self.start)
    }

    /// End time as a fraction of the day
    pub fn end_fraction(&self) -> f64 {
        day_fraction(self.end)
    }
}

impl TryFrom<EventFields> for Event {
    type Error = PlannerError;

    fn try_from(fields: EventFields) -> Result<Self> {
        Self::new(fields.day, fields.start, fields.end, fields.place)
    }
}

impl From<Event> for EventFields {
    fn from(event: Event) -> Self {
        Self {
            day: event.day(),
            start: event.start,
            end: event.end,
            place: event.place,
        }
    }
}

/// A registration group of a course (lecture, tutorial, lab...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub number: u32,
    /// Type tag, e.g. "lecture" or "tutorial"
    pub kind: String,
    pub lecturer: Option<String>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub number: String,
    pub name: String,
    pub lecturer_in_charge: Option<String>,
    pub academic_points: Option<f32>,
    pub first_exam: Option<NaiveDate>,
    pub second_exam: Option<NaiveDate>,
    pub groups: Vec<Group>,
}

impl Course {
    /// Exam dates that are set, first sitting before second
    pub fn exam_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first_exam.iter().chain(self.second_exam.iter()).copied()
    }

    pub fn group_index(&self, number: u32) -> Option<usize> {
        self.groups.iter().position(|g| g.number == number)
    }

    pub fn group(&self, number: u32) -> Option<&Group> {
        self.groups.iter().find(|g| g.number == number)
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.number, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Faculty {
    pub name: String,
    pub courses: Vec<Arc<Course>>,
}

/// Read-only Faculty -> Course -> Group -> Event hierarchy
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    faculties: Vec<Faculty>,
    // course number -> (faculty index, course index)
    index: HashMap<String, (usize, usize)>,
}

impl CourseCatalog {
    /// Builds the catalog. If a course number appears twice, the first
    /// occurrence wins the lookup.
    pub fn new(faculties: Vec<Faculty>) -> Self {
        let mut index = HashMap::new();
        for (fi, faculty) in faculties.iter().enumerate() {
            for (ci, course) in faculty.courses.iter().enumerate() {
                index.entry(course.number.clone()).or_insert((fi, ci));
            }
        }
        Self { faculties, index }
    }

    pub fn faculties(&self) -> &[Faculty] {
        &self.faculties
    }

    pub fn courses(&self) -> impl Iterator<Item = &Arc<Course>> {
        self.faculties.iter().flat_map(|f| f.courses.iter())
    }

    pub fn course_count(&self) -> usize {
        self.faculties.iter().map(|f| f.courses.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.course_count() == 0
    }

    pub fn contains(&self, number: &str) -> bool {
        self.index.contains_key(number)
    }

    pub fn find_course(&self, number: &str) -> Result<Arc<Course>> {
        self.index
            .get(number)
            .map(|&(fi, ci)| Arc::clone(&self.faculties[fi].courses[ci]))
            .ok_or_else(|| PlannerError::UnknownCourseNumber {
                number: number.to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn course(number: &str, name: &str, first: Option<NaiveDate>, second: Option<NaiveDate>) -> Arc<Course> {
        Arc::new(Course {
            number: number.to_string(),
            name: name.to_string(),
            lecturer_in_charge: None,
            academic_points: Some(3.0),
            first_exam: first,
            second_exam: second,
            groups: vec![Group {
                number: 10,
                kind: "lecture".to_string(),
                lecturer: Some("Dr. Levi".to_string()),
                events: vec![Event::new(2, time(10, 30), time(12, 30), Some("Ullman 101".to_string())).unwrap()],
            }],
        })
    }

    pub fn catalog() -> CourseCatalog {
        CourseCatalog::new(vec![
            Faculty {
                name: "Mathematics".to_string(),
                courses: vec![
                    course("104031", "Calculus 1M", Some(date(2024, 7, 1)), Some(date(2024, 7, 28))),
                    course("104166", "Algebra A", Some(date(2024, 7, 8)), None),
                ],
            },
            Faculty {
                name: "Computer Science".to_string(),
                courses: vec![
                    course("234114", "Intro to CS 1", Some(date(2024, 7, 1)), None),
                    course("234218", "Data Structures 1", None, None),
                ],
            },
        ])
    }
}
