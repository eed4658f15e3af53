use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Course;
use crate::schedule::{CandidateSchedule, EventRef};
use crate::selection::SelectionSet;
use crate::services::{NicknameService, Renderer};
use super::projector::CalendarProjector;

/// Pieces of event data that can be shown inside a timetable block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    CourseName,
    CourseNumber,
    GroupNumber,
    Place,
    Lecturer,
}

impl EventField {
    /// Display order of the fields
    pub const ALL: [EventField; 5] = [
        EventField::CourseName,
        EventField::CourseNumber,
        EventField::GroupNumber,
        EventField::Place,
        EventField::Lecturer,
    ];
}

pub const DEFAULT_EVENT_FIELDS: [EventField; 3] = [EventField::CourseName, EventField::GroupNumber, EventField::Place];

/// Adds `field` to `fields`, keeping the canonical order of [`EventField::ALL`]
pub fn show_field(fields: &[EventField], field: EventField) -> Vec<EventField> {
    EventField::ALL
        .into_iter()
        .filter(|f| *f == field || fields.contains(f))
        .collect()
}

pub fn hide_field(fields: &[EventField], field: EventField) -> Vec<EventField> {
    fields.iter().copied().filter(|f| *f != field).collect()
}

/// Multi-line label for a timetable block; empty values are skipped
pub fn text_for_event(ev: &EventRef, fields: &[EventField], nicknames: &dyn NicknameService) -> String {
    let course = ev.course();
    let group = ev.group();
    fields
        .iter()
        .filter_map(|field| match field {
            EventField::CourseName => Some(nicknames.beautify(&course.name).unwrap_or_else(|| course.name.clone())),
            EventField::CourseNumber => Some(course.number.clone()),
            EventField::GroupNumber => Some(format!("Group {}", group.number)),
            EventField::Place => ev.event().place().map(str::to_string),
            EventField::Lecturer => group.lecturer.clone(),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// What a renderer needs to draw one block
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub text: String,
    /// 1 = Sunday ... 7 = Saturday
    pub day: u8,
    pub start_fraction: f64,
    pub length: f64,
    /// Position of the course in the selection, if selected
    pub color_index: Option<usize>,
    pub payload: EventRef,
    pub type_tag: String,
}

impl CalendarProjector {
    pub fn render_item(&self, ev: &EventRef, selection: &SelectionSet) -> RenderItem {
        let event = ev.event();
        RenderItem {
            text: text_for_event(ev, self.fields(), self.nicknames()),
            day: event.day(),
            start_fraction: event.start_fraction(),
            length: event.end_fraction() - event.start_fraction(),
            color_index: selection.position(&ev.course().number),
            payload: ev.clone(),
            type_tag: ev.group().kind.clone(),
        }
    }

    pub fn render_items(&self, schedule: &CandidateSchedule, selection: &SelectionSet) -> Vec<RenderItem> {
        schedule
            .events
            .iter()
            .map(|ev| self.render_item(ev, selection))
            .collect()
    }

    /// Blocks for every group of `course`, or only the groups of one type
    pub fn alternatives(&self, course: &Arc<Course>, group_kind: Option<&str>, selection: &SelectionSet) -> Vec<RenderItem> {
        let mut items = Vec::new();
        for group in course
            .groups
            .iter()
            .filter(|g| group_kind.map_or(true, |kind| g.kind == kind))
        {
            for event_index in 0..group.events.len() {
                if let Ok(ev) = EventRef::resolve(Arc::clone(course), group.number, event_index) {
                    items.push(self.render_item(&ev, selection));
                }
            }
        }
        items
    }

    /// Replaces the timetable with the blocks of `schedule`
    pub fn render(&self, schedule: &CandidateSchedule, selection: &SelectionSet, renderer: &mut dyn Renderer) {
        renderer.clear();
        for item in self.render_items(schedule, selection) {
            renderer.draw(item);
        }
    }
}
