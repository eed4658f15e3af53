use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Course, Event, Group};
use crate::error::{PlannerError, Result};

/// Reference to one event of one group of a catalog course
#[derive(Debug, Clone)]
pub struct EventRef {
    course: Arc<Course>,
    group_index: usize,
    event_index: usize,
}

impl EventRef {
    /// Resolves `(group number, event index)` inside `course`
    pub fn resolve(course: Arc<Course>, group_number: u32, event_index: usize) -> Result<Self> {
        let group_index = course
            .group_index(group_number)
            .filter(|&gi| event_index < course.groups[gi].events.len())
            .ok_or_else(|| PlannerError::DanglingEventRef {
                course: course.number.clone(),
                group: group_number,
                event: event_index,
            })?;
        Ok(Self {
            course,
            group_index,
            event_index,
        })
    }

    pub fn course(&self) -> &Arc<Course> {
        &self.course
    }

    pub fn group(&self) -> &Group {
        &self.course.groups[self.group_index]
    }

    pub fn event(&self) -> &Event {
        &self.group().events[self.event_index]
    }

    pub fn event_index(&self) -> usize {
        self.event_index
    }
}

impl PartialEq for EventRef {
    fn eq(&self, other: &Self) -> bool {
        self.course.number == other.course.number
            && self.group_index == other.group_index
            && self.event_index == other.event_index
    }
}

/// One full weekly timetable produced by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSchedule {
    pub events: Vec<EventRef>,
    pub score: f64,
    /// Rater name -> sub-score, in rater order
    pub ratings: Vec<(String, f64)>,
}

impl CandidateSchedule {
    pub fn new(events: Vec<EventRef>, score: f64, ratings: Vec<(String, f64)>) -> Self {
        Self { events, score, ratings }
    }

    /// True if any event of this schedule belongs to the given group
    pub fn uses_group(&self, course_number: &str, group_number: u32) -> bool {
        self.events
            .iter()
            .any(|ev| ev.course().number == course_number && ev.group().number == group_number)
    }
}

/// Serialized form of an event reference, as written by external schedulers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRefRecord {
    pub course: String,
    pub group: u32,
    #[serde(default)]
    pub event: usize,
}

/// Serialized form of a candidate schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub events: Vec<EventRefRecord>,
    pub score: f64,
    #[serde(default)]
    pub ratings: Vec<(String, f64)>,
}
