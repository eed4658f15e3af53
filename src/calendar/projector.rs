//! Weekly events -> dated calendar occurrences.
//!
//! A candidate schedule only knows weekdays and times of day. Projection
//! anchors every event to its first date on or after the semester start
//! and attaches a weekly recurrence that runs until the semester end
//! (inclusive). Instants are built in a named time zone supplied by the
//! caller.

use std::sync::Arc;

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::catalog::Course;
use crate::error::{PlannerError, Result};
use crate::schedule::{CandidateSchedule, EventRef};
use crate::services::NicknameService;
use super::render::{text_for_event, EventField, DEFAULT_EVENT_FIELDS};

pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Asia::Jerusalem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamSitting {
    First,
    Second,
}

impl ExamSitting {
    pub fn label(self) -> &'static str {
        match self {
            ExamSitting::First => "Moed A",
            ExamSitting::Second => "Moed B",
        }
    }
}

/// Weekly repetition of an occurrence, `until` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyRecurrence {
    pub until: NaiveDate,
    pub week_start: Weekday,
}

impl WeeklyRecurrence {
    /// Every concrete date from `first` on, one week apart, up to `until`
    pub fn dates(&self, first: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let until = self.until;
        std::iter::successors(Some(first), |d| d.checked_add_signed(Duration::weeks(1)))
            .take_while(move |d| *d <= until)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OccurrenceTiming {
    Timed { start: DateTime<Tz>, end: DateTime<Tz> },
    AllDay(NaiveDate),
}

impl OccurrenceTiming {
    pub fn date(&self) -> NaiveDate {
        match self {
            OccurrenceTiming::Timed { start, .. } => start.date_naive(),
            OccurrenceTiming::AllDay(date) => *date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OccurrenceKind {
    Class(EventRef),
    Exam { course: Arc<Course>, sitting: ExamSitting },
}

/// One dated calendar entry, ready for rendering or export
#[derive(Debug, Clone, PartialEq)]
pub struct DatedOccurrence {
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub timing: OccurrenceTiming,
    pub recurrence: Option<WeeklyRecurrence>,
    pub kind: OccurrenceKind,
}

/// Days from `semester_start` to the first date falling on `event_day`
/// (1 = Sunday ... 7 = Saturday). Always in [0, 6].
pub fn first_occurrence_offset(semester_start: NaiveDate, event_day: u8) -> i64 {
    let start_weekday = i64::from(semester_start.weekday().num_days_from_sunday());
    let event_weekday = i64::from(event_day) - 1;
    (event_weekday - start_weekday).rem_euclid(7)
}

pub fn first_occurrence_date(semester_start: NaiveDate, event_day: u8) -> NaiveDate {
    semester_start + Duration::days(first_occurrence_offset(semester_start, event_day))
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward by an hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

pub struct CalendarProjector {
    time_zone: Tz,
    nicknames: Arc<dyn NicknameService>,
    fields: Vec<EventField>,
}

impl CalendarProjector {
    pub fn new(time_zone: Tz, nicknames: Arc<dyn NicknameService>) -> Self {
        Self {
            time_zone,
            nicknames,
            fields: DEFAULT_EVENT_FIELDS.to_vec(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<EventField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn fields(&self) -> &[EventField] {
        &self.fields
    }

    pub fn set_fields(&mut self, fields: Vec<EventField>) {
        self.fields = fields;
    }

    pub fn nicknames(&self) -> &dyn NicknameService {
        self.nicknames.as_ref()
    }

    /// Nickname if one exists, else the catalog name
    pub fn display_name(&self, course: &Course) -> String {
        self.nicknames
            .beautify(&course.name)
            .unwrap_or_else(|| course.name.clone())
    }

    /// Lazily projects every event of `schedule`. The returned iterator
    /// can be cloned to restart the projection.
    pub fn project<'a>(
        &'a self,
        schedule: &'a CandidateSchedule,
        semester_start: Option<NaiveDate>,
        semester_end: Option<NaiveDate>,
    ) -> Result<Occurrences<'a>> {
        let (Some(start), Some(end)) = (semester_start, semester_end) else {
            return Err(PlannerError::MissingSemesterBounds);
        };
        Ok(Occurrences {
            projector: self,
            events: schedule.events.iter(),
            semester_start: start,
            semester_end: end,
        })
    }

    /// One all-day occurrence per exam sitting of each selected course
    pub fn project_exams<'a>(&'a self, selection: &'a [Arc<Course>]) -> impl Iterator<Item = DatedOccurrence> + 'a {
        selection.iter().flat_map(move |course| {
            [
                (course.first_exam, ExamSitting::First),
                (course.second_exam, ExamSitting::Second),
            ]
            .into_iter()
            .filter_map(move |(date, sitting)| date.map(|d| self.exam_occurrence(course, d, sitting)))
        })
    }

    /// Exam occurrences ordered by date
    pub fn exam_schedule(&self, selection: &[Arc<Course>]) -> Vec<DatedOccurrence> {
        let mut exams: Vec<DatedOccurrence> = self.project_exams(selection).collect();
        exams.sort_by_key(|o| o.timing.date());
        exams
    }

    fn exam_occurrence(&self, course: &Arc<Course>, date: NaiveDate, sitting: ExamSitting) -> DatedOccurrence {
        DatedOccurrence {
            summary: format!("{} - {}", self.display_name(course), sitting.label()),
            description: format!("[{}] {}", course.number, course.name),
            location: None,
            timing: OccurrenceTiming::AllDay(date),
            recurrence: None,
            kind: OccurrenceKind::Exam {
                course: Arc::clone(course),
                sitting,
            },
        }
    }

    fn class_occurrence(&self, ev: &EventRef, semester_start: NaiveDate, semester_end: NaiveDate) -> DatedOccurrence {
        let event = ev.event();
        let date = first_occurrence_date(semester_start, event.day());
        DatedOccurrence {
            summary: self.display_name(ev.course()),
            description: text_for_event(ev, &self.fields, self.nicknames.as_ref()),
            location: event.place().map(str::to_string),
            timing: OccurrenceTiming::Timed {
                start: localize(self.time_zone, date.and_time(event.start())),
                end: localize(self.time_zone, date.and_time(event.end())),
            },
            recurrence: Some(WeeklyRecurrence {
                until: semester_end,
                week_start: event.weekday(),
            }),
            kind: OccurrenceKind::Class(ev.clone()),
        }
    }
}

/// Lazy projection of a schedule's events
#[derive(Clone)]
pub struct Occurrences<'a> {
    projector: &'a CalendarProjector,
    events: std::slice::Iter<'a, EventRef>,
    semester_start: NaiveDate,
    semester_end: NaiveDate,
}

impl Iterator for Occurrences<'_> {
    type Item = DatedOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        let ev = self.events.next()?;
        Some(
            self.projector
                .class_occurrence(ev, self.semester_start, self.semester_end),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl ExactSizeIterator for Occurrences<'_> {}
