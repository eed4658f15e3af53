pub mod projector;
pub mod render;
pub mod ics;

pub use projector::{
    first_occurrence_date, first_occurrence_offset, CalendarProjector, DatedOccurrence, ExamSitting, OccurrenceKind,
    OccurrenceTiming, Occurrences, WeeklyRecurrence, DEFAULT_TIME_ZONE,
};
pub use render::{hide_field, show_field, text_for_event, EventField, RenderItem, DEFAULT_EVENT_FIELDS};
pub use ics::IcsExporter;
