//! Interfaces of the collaborators the planner core consumes.
//!
//! The core never loads data, searches for schedules, draws or writes files
//! itself. Long-running collaborators (`DataSource`, `SchedulerService`) run
//! inside an [`AsyncTaskQueue`](crate::tasks::AsyncTaskQueue) worker and
//! report progress as `(fraction, text)` pairs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::calendar::{DatedOccurrence, RenderItem};
use crate::catalog::{Course, CourseCatalog};
use crate::error::Result;
use crate::schedule::CandidateSchedule;

/// Progress callback: fraction in [0, 1] plus a status line
pub type ProgressFn<'a> = &'a (dyn Fn(f64, &str) + Send + Sync);

/// Supplies the course catalog.
pub trait DataSource: Send + Sync {
    fn load(&self, force_refresh: bool, progress: ProgressFn<'_>) -> Result<CourseCatalog>;
}

/// Everything a scheduler needs for one search.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub courses: Vec<Arc<Course>>,
    /// (course number, group number) pairs the user turned off
    pub disallowed_groups: BTreeSet<(String, u32)>,
    /// Rater name -> weight
    pub rating_weights: BTreeMap<String, f64>,
}

/// Produces ordered candidate schedules for a selection.
pub trait SchedulerService: Send + Sync {
    fn search(&self, request: &SearchRequest, progress: ProgressFn<'_>) -> Result<Vec<CandidateSchedule>>;
}

/// Display-name overrides for course names. `None` means no override.
pub trait NicknameService: Send + Sync {
    fn beautify(&self, name: &str) -> Option<String>;
}

/// No overrides at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNicknames;

impl NicknameService for NoNicknames {
    fn beautify(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Draws weekly timetable blocks.
pub trait Renderer {
    fn clear(&mut self);
    fn draw(&mut self, item: RenderItem);
}

/// Serializes dated occurrences into an external calendar format.
pub trait Exporter {
    fn export(&mut self, occurrences: &[DatedOccurrence]) -> Result<()>;
}
