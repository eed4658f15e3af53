//! The planner's single state object.
//!
//! `PlannerState` is created once and owned by the consumer that drains the
//! task queue. Workers never see it; their results come back as
//! [`Effect`]s and are applied here, so every derived flag (visibility,
//! collisions, cursor bounds) is recomputed from the current inputs on the
//! consumer side only.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::calendar::{CalendarProjector, DatedOccurrence, EventField, RenderItem};
use crate::catalog::{Course, CourseCatalog};
use crate::display;
use crate::error::{PlannerError, Result};
use crate::filter::CatalogView;
use crate::schedule::{CandidateSchedule, ScheduleCursor};
use crate::selection::SelectionSet;
use crate::services::{DataSource, Exporter, NicknameService, Renderer, SchedulerService, SearchRequest};
use crate::settings::{PlannerConfig, Settings};
use crate::tasks::{AsyncTaskQueue, Effect, TaskId, TaskTarget};

/// What background tasks hand back to the planner
#[derive(Debug)]
pub enum TaskOutput {
    Catalog(CourseCatalog),
    Schedules(Vec<CandidateSchedule>),
}

/// Latest progress of the task currently shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressIndicator {
    pub id: TaskId,
    pub target: TaskTarget,
    pub fraction: f64,
    pub text: String,
}

pub struct PlannerState {
    config: PlannerConfig,
    catalog: Arc<CourseCatalog>,
    view: CatalogView,
    selection: SelectionSet,
    schedules: Vec<CandidateSchedule>,
    cursor: ScheduleCursor,
    projector: CalendarProjector,
    semester_start: Option<NaiveDate>,
    semester_end: Option<NaiveDate>,
    disallowed_groups: BTreeSet<(String, u32)>,
    rating_weights: BTreeMap<String, f64>,
    progress: Option<ProgressIndicator>,
}

impl PlannerState {
    pub fn new(config: PlannerConfig, nicknames: Arc<dyn NicknameService>) -> Self {
        let projector = CalendarProjector::new(config.time_zone, nicknames).with_fields(config.shown_fields.clone());
        Self {
            config,
            catalog: Arc::new(CourseCatalog::default()),
            view: CatalogView::default(),
            selection: SelectionSet::new(),
            schedules: Vec::new(),
            cursor: ScheduleCursor::new(),
            projector,
            semester_start: None,
            semester_end: None,
            disallowed_groups: BTreeSet::new(),
            rating_weights: BTreeMap::new(),
            progress: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CourseCatalog> {
        &self.catalog
    }

    pub fn view(&self) -> &CatalogView {
        &self.view
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn schedules(&self) -> &[CandidateSchedule] {
        &self.schedules
    }

    pub fn cursor(&self) -> &ScheduleCursor {
        &self.cursor
    }

    /// Navigation goes straight to the cursor
    pub fn cursor_mut(&mut self) -> &mut ScheduleCursor {
        &mut self.cursor
    }

    pub fn projector(&self) -> &CalendarProjector {
        &self.projector
    }

    pub fn progress(&self) -> Option<&ProgressIndicator> {
        self.progress.as_ref()
    }

    /// Installs a freshly loaded catalog. The current query is re-applied
    /// and the selection is re-resolved against the new catalog; courses
    /// that vanished are dropped and reported.
    pub fn set_catalog(&mut self, catalog: CourseCatalog) -> Vec<PlannerError> {
        tracing::info!(courses = catalog.course_count(), "Catalog loaded");
        self.catalog = Arc::new(catalog);

        let query = self.view.query().to_string();
        self.view = CatalogView::new(&self.catalog);
        self.view.set_query(&query, self.projector.nicknames());

        let numbers = self.selection.numbers();
        let skipped = self.selection.restore(&self.catalog, &numbers);
        self.view.apply_collisions(self.selection.collisions());

        self.schedules.clear();
        self.cursor.set_total(0);
        skipped
    }

    pub fn set_query(&mut self, query: &str) {
        self.view.set_query(query, self.projector.nicknames());
    }

    pub fn add_course(&mut self, number: &str) -> Result<bool> {
        let added = self.selection.add(&self.catalog, number)?;
        if added {
            self.view.apply_collisions(self.selection.collisions());
        }
        Ok(added)
    }

    pub fn remove_course(&mut self, number: &str) -> Option<Arc<Course>> {
        let removed = self.selection.remove(number)?;
        self.disallowed_groups.retain(|(course, _)| course != number);
        self.view.apply_collisions(self.selection.collisions());
        Some(removed)
    }

    pub fn clear_courses(&mut self) -> bool {
        if !self.selection.clear() {
            return false;
        }
        self.disallowed_groups.clear();
        self.view.apply_collisions(self.selection.collisions());
        true
    }

    /// Replaces the selection; unknown numbers are skipped and returned
    pub fn restore_selection<S: AsRef<str>>(&mut self, numbers: &[S]) -> Vec<PlannerError> {
        let skipped = self.selection.restore(&self.catalog, numbers);
        self.view.apply_collisions(self.selection.collisions());
        skipped
    }

    /// Restores selection, semester dates and shown fields
    pub fn apply_settings(&mut self, settings: &Settings) -> Vec<PlannerError> {
        self.set_semester(settings.semester_start(), settings.semester_end());
        self.set_shown_fields(settings.shown_event_data.clone());
        self.config.show_full_week = settings.show_full_week;
        self.restore_selection(&settings.selected_courses)
    }

    /// Writes the persisted parts of the state back into `settings`
    pub fn store_settings(&self, settings: &mut Settings) {
        settings.selected_courses = self.selection.numbers();
        settings.set_semester(self.semester_start, self.semester_end);
        settings.shown_event_data = self.projector.fields().to_vec();
        settings.show_full_week = self.config.show_full_week;
    }

    pub fn set_semester(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.semester_start = start;
        self.semester_end = end;
    }

    pub fn semester_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.semester_start, self.semester_end)
    }

    pub fn set_shown_fields(&mut self, fields: Vec<EventField>) {
        self.config.shown_fields = fields.clone();
        self.projector.set_fields(fields);
    }

    /// Keeps the next search from using `group` of `course_number`.
    /// Returns false if it was already excluded.
    pub fn disallow_group(&mut self, course_number: &str, group: u32) -> Result<bool> {
        let course = self.catalog.find_course(course_number)?;
        if course.group(group).is_none() {
            return Err(PlannerError::DanglingEventRef {
                course: course.number.clone(),
                group,
                event: 0,
            });
        }
        let inserted = self.disallowed_groups.insert((course.number.clone(), group));
        if inserted {
            tracing::info!(course = %course, group, "Group excluded from search");
        }
        Ok(inserted)
    }

    pub fn allow_group(&mut self, course_number: &str, group: u32) -> bool {
        self.disallowed_groups.remove(&(course_number.to_string(), group))
    }

    pub fn set_rating_weight(&mut self, rater: &str, weight: f64) {
        self.rating_weights.insert(rater.to_string(), weight);
    }

    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            courses: self.selection.courses().to_vec(),
            disallowed_groups: self.disallowed_groups.clone(),
            rating_weights: self.rating_weights.clone(),
        }
    }

    /// Queues a catalog load on `queue`
    pub fn start_catalog_load(
        queue: &mut AsyncTaskQueue<TaskOutput>,
        source: Arc<dyn DataSource>,
        force_refresh: bool,
    ) -> Result<TaskId> {
        queue.spawn(TaskTarget::CatalogLoad, move |progress| {
            source.load(force_refresh, progress).map(TaskOutput::Catalog)
        })
    }

    /// Queues a search for the current selection and constraints
    pub fn start_search(
        &self,
        queue: &mut AsyncTaskQueue<TaskOutput>,
        scheduler: Arc<dyn SchedulerService>,
    ) -> Result<TaskId> {
        let request = self.search_request();
        queue.spawn(TaskTarget::ScheduleSearch, move |progress| {
            scheduler.search(&request, progress).map(TaskOutput::Schedules)
        })
    }

    /// New result list; the cursor restarts at the first schedule
    pub fn apply_search_results(&mut self, schedules: Vec<CandidateSchedule>) {
        tracing::info!(count = schedules.len(), "Schedules found");
        self.cursor.set_total(schedules.len());
        self.schedules = schedules;
    }

    /// Applies one queue effect. Final effects clear the progress indicator
    /// of their task; a failure is handed back to the caller. The returned
    /// list holds non-fatal warnings from a catalog reload.
    pub fn apply_effect(&mut self, effect: Effect<TaskOutput>) -> Result<Vec<PlannerError>> {
        if effect.is_final() && self.progress.as_ref().is_some_and(|p| p.id == effect.id()) {
            self.progress = None;
        }

        match effect {
            Effect::Progress {
                id,
                target,
                fraction,
                text,
            } => {
                self.progress = Some(ProgressIndicator {
                    id,
                    target,
                    fraction,
                    text,
                });
                Ok(Vec::new())
            }
            Effect::Completed { output, .. } => match output {
                TaskOutput::Catalog(catalog) => Ok(self.set_catalog(catalog)),
                TaskOutput::Schedules(schedules) => {
                    self.apply_search_results(schedules);
                    Ok(Vec::new())
                }
            },
            Effect::Failed { error, .. } => Err(error),
        }
    }

    pub fn current_schedule(&self) -> Result<&CandidateSchedule> {
        let index = self.cursor.current()?;
        self.schedules.get(index).ok_or(PlannerError::NoCurrentSchedule)
    }

    pub fn current_render_items(&self) -> Result<Vec<RenderItem>> {
        let schedule = self.current_schedule()?;
        Ok(self.projector.render_items(schedule, &self.selection))
    }

    pub fn render_current(&self, renderer: &mut dyn Renderer) -> Result<()> {
        let schedule = self.current_schedule()?;
        self.projector.render(schedule, &self.selection, renderer);
        Ok(())
    }

    /// Every group of one course, or only the groups of one type
    pub fn show_alternatives(&self, course_number: &str, group_kind: Option<&str>) -> Result<Vec<RenderItem>> {
        let course = self.catalog.find_course(course_number)?;
        Ok(self.projector.alternatives(&course, group_kind, &self.selection))
    }

    pub fn course_info(&self, course_number: Option<&str>) -> Result<String> {
        let course = course_number.map(|n| self.catalog.find_course(n)).transpose()?;
        Ok(display::course_info(course.as_deref(), self.selection.collisions()))
    }

    pub fn rating_details(&self) -> Result<String> {
        Ok(display::rating_details(self.current_schedule()?))
    }

    pub fn exam_schedule(&self) -> Vec<DatedOccurrence> {
        self.projector.exam_schedule(self.selection.courses())
    }

    /// Classes of the current schedule followed by the selected courses' exams
    pub fn dated_occurrences(&self) -> Result<Vec<DatedOccurrence>> {
        let schedule = self.current_schedule()?;
        let mut occurrences: Vec<DatedOccurrence> = self
            .projector
            .project(schedule, self.semester_start, self.semester_end)?
            .collect();
        occurrences.extend(self.projector.project_exams(self.selection.courses()));
        Ok(occurrences)
    }

    /// Returns the number of exported occurrences
    pub fn export(&self, exporter: &mut dyn Exporter) -> Result<usize> {
        let occurrences = self.dated_occurrences()?;
        exporter.export(&occurrences)?;
        Ok(occurrences.len())
    }
}
