//! Error types for the planner core.

use chrono::NaiveTime;
use thiserror::Error;

use crate::tasks::TaskTarget;

/// Errors raised by the planner core and its bundled collaborators.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlannerError {
    /// The schedule cursor was read while no candidate schedules are loaded.
    #[error("No schedule is currently selected")]
    NoCurrentSchedule,

    /// Projection or export was requested without valid semester dates.
    #[error("Semester start and end dates must be set before projecting the calendar")]
    MissingSemesterBounds,

    /// A course number does not exist in the loaded catalog.
    #[error("There is no course with number \"{number}\" in the catalog")]
    UnknownCourseNumber {
        /// The number that failed to resolve.
        number: String,
    },

    /// A computation for the same target is still running.
    #[error("A {target} task is already running")]
    TaskBusy { target: TaskTarget },

    /// A background worker panicked before reporting a result.
    #[error("The {target} task stopped unexpectedly")]
    TaskPanicked { target: TaskTarget },

    #[error("Unknown time zone: {name}")]
    UnknownTimeZone { name: String },

    #[error("Invalid date \"{text}\", expected DD/MM/YY")]
    InvalidDate { text: String },

    #[error("Invalid time of day \"{text}\"")]
    InvalidTime { text: String },

    #[error("Invalid weekday {day}, expected 1 (Sunday) to 7 (Saturday)")]
    InvalidDay { day: u8 },

    #[error("Event ends at {end} but starts at {start}")]
    InvalidEventTimes {
        start: NaiveTime,
        end: NaiveTime,
    },

    /// A candidate schedule refers to a group or event the catalog lacks.
    #[error("Course {course} has no group {group} event {event}")]
    DanglingEventRef {
        course: String,
        group: u32,
        event: usize,
    },

    #[error("Catalog row {line}: {reason}")]
    CatalogRow { line: u64, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;
