//! Derived view state for a university course timetable planner.
//!
//! The crate keeps the state a planner front end derives from a read-only
//! course catalog: which catalog rows match the search box, which selected
//! courses have colliding exams, which candidate schedule is on screen, and
//! how that schedule maps onto real calendar dates. Loading data, searching
//! for schedules, drawing and file formats are collaborators behind the
//! traits in [`services`].

pub mod error;
pub mod services;
pub mod catalog;
pub mod schedule;
pub mod collision;
pub mod selection;
pub mod filter;
pub mod calendar;
pub mod tasks;
pub mod settings;
pub mod display;
pub mod state;

pub use error::{PlannerError, Result};
pub use catalog::{Course, CourseCatalog, CsvCatalogSource, Event, Faculty, Group, NicknameTable};
pub use schedule::{CandidateSchedule, CursorPosition, EventRef, JsonScheduleSource, ScheduleCursor};
pub use collision::{CollisionDetector, CollisionReport};
pub use selection::SelectionSet;
pub use filter::{CatalogView, CourseNode, FacultyNode, QueryMatcher};
pub use calendar::{CalendarProjector, DatedOccurrence, EventField, IcsExporter, RenderItem};
pub use tasks::{AsyncTaskQueue, Effect, TaskId, TaskTarget};
pub use settings::{PlannerConfig, Settings};
pub use state::{PlannerState, TaskOutput};
