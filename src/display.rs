use std::io::{self, Write};
use std::ops::RangeInclusive;

use crate::calendar::{DatedOccurrence, RenderItem};
use crate::catalog::time_utils::{day_name, format_date, format_time};
use crate::catalog::Course;
use crate::collision::CollisionReport;
use crate::filter::CatalogView;
use crate::schedule::CandidateSchedule;

pub const COLLISION_WARNING: &str = "WARNING: The courses marked with * have colliding test dates!";
pub const NO_EXAMS: &str = "No courses with tests are selected.";

/// Course name as shown in lists, starred when its exams collide
pub fn format_course_label(course: &Course, colliding: bool) -> String {
    if colliding {
        format!("*{}*", course.name)
    } else {
        course.name.clone()
    }
}

/// Text for the course details panel, headed by the collision warning
/// whenever any selected courses collide
pub fn course_info(course: Option<&Course>, collisions: &CollisionReport) -> String {
    let mut out = String::new();
    if collisions.any_collision {
        out.push_str(COLLISION_WARNING);
        out.push('\n');
    }
    let Some(course) = course else {
        return out;
    };

    out.push_str(&format!("{}\n", course));
    if let Some(lecturer) = &course.lecturer_in_charge {
        out.push_str(&format!("Lecturer in charge: {}\n", lecturer));
    }
    if let Some(points) = course.academic_points {
        out.push_str(&format!("Academic points: {}\n", points));
    }
    if let Some(date) = course.first_exam {
        out.push_str(&format!("Moed A: {}\n", format_date(date)));
    }
    if let Some(date) = course.second_exam {
        out.push_str(&format!("Moed B: {}\n", format_date(date)));
    }

    for group in &course.groups {
        out.push_str(&format!("\nGroup {} ({})\n", group.number, group.kind));
        if let Some(lecturer) = &group.lecturer {
            out.push_str(&format!("Lecturer: {}\n", lecturer));
        }
        for event in &group.events {
            out.push_str(&format!(
                "{}, {}-{}\n",
                day_name(event.day()),
                format_time(event.start()),
                format_time(event.end())
            ));
        }
        if group.lecturer.is_none() && group.events.is_empty() {
            out.push_str("* No data for this group *\n");
        }
    }
    out
}

pub fn rating_details(schedule: &CandidateSchedule) -> String {
    let mut out = String::from("Rating details for this schedule:\n");
    for (rater, score) in &schedule.ratings {
        out.push_str(&format!("\"{}\" rating: {:.2}\n", rater, score));
    }
    out.push_str(&format!("Overall score: {:.2}\n", schedule.score));
    out
}

/// One line per exam, in the order given
pub fn exam_schedule_text(exams: &[DatedOccurrence]) -> String {
    if exams.is_empty() {
        return format!("{}\n", NO_EXAMS);
    }
    exams
        .iter()
        .map(|exam| format!("{}  {}\n", format_date(exam.timing.date()), exam.summary))
        .collect()
}

/// Prints the weekly timetable, one block per line, grouped by day
pub fn write_week<W: Write>(
    out: &mut W,
    title: &str,
    items: &[RenderItem],
    days: RangeInclusive<u8>,
) -> io::Result<()> {
    writeln!(out, "=== {} ===", title)?;
    for day in days {
        let mut blocks: Vec<&RenderItem> = items.iter().filter(|i| i.day == day).collect();
        if blocks.is_empty() {
            continue;
        }
        blocks.sort_by(|a, b| a.start_fraction.total_cmp(&b.start_fraction));

        writeln!(out, "{}:", day_name(day))?;
        for block in blocks {
            let event = block.payload.event();
            let marker = block
                .color_index
                .map(|c| format!("#{}", c + 1))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "  {}-{} [{}] {} ({})",
                format_time(event.start()),
                format_time(event.end()),
                marker,
                block.text.replace('\n', " | "),
                block.type_tag
            )?;
        }
    }
    Ok(())
}

/// Visible faculties and courses of the search view
pub fn write_catalog_view<W: Write>(out: &mut W, view: &CatalogView) -> io::Result<()> {
    for faculty in view.faculties().iter().filter(|f| f.visible) {
        writeln!(out, "{}", faculty.name)?;
        for node in faculty.courses.iter().filter(|n| n.visible) {
            writeln!(
                out,
                "  {:>8}  {}",
                node.course.number,
                format_course_label(&node.course, node.colliding)
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarProjector, DEFAULT_TIME_ZONE};
    use crate::catalog::types::fixtures::{catalog, course, date};
    use crate::selection::SelectionSet;
    use crate::services::NoNicknames;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn course_info_lists_details_and_groups() {
        let c = course("104031", "Calculus 1M", Some(date(2024, 7, 1)), None);
        let text = course_info(Some(&c), &CollisionReport::default());
        assert_eq!(
            text,
            "[104031] Calculus 1M\n\
             Academic points: 3\n\
             Moed A: 01/07/24\n\
             \n\
             Group 10 (lecture)\n\
             Lecturer: Dr. Levi\n\
             Monday, 10:30-12:30\n"
        );
    }

    #[test]
    fn collision_banner_comes_first() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        selection.add(&catalog, "104031").unwrap();
        selection.add(&catalog, "234114").unwrap();

        let text = course_info(None, selection.collisions());
        assert_eq!(text, format!("{}\n", COLLISION_WARNING));

        let calculus = catalog.find_course("104031").unwrap();
        assert_eq!(format_course_label(&calculus, true), "*Calculus 1M*");
        assert_eq!(format_course_label(&calculus, false), "Calculus 1M");
    }

    #[test]
    fn rating_details_use_two_decimals() {
        let schedule = CandidateSchedule::new(
            vec![],
            7.5,
            vec![("Free days".to_string(), 3.0), ("No gaps".to_string(), 4.456)],
        );
        assert_eq!(
            rating_details(&schedule),
            "Rating details for this schedule:\n\
             \"Free days\" rating: 3.00\n\
             \"No gaps\" rating: 4.46\n\
             Overall score: 7.50\n"
        );
    }

    #[test]
    fn empty_exam_schedule_says_so() {
        assert_eq!(exam_schedule_text(&[]), format!("{}\n", NO_EXAMS));

        let projector = CalendarProjector::new(DEFAULT_TIME_ZONE, Arc::new(NoNicknames));
        let selection = vec![course("104166", "Algebra A", Some(date(2024, 7, 8)), None)];
        assert_eq!(
            exam_schedule_text(&projector.exam_schedule(&selection)),
            "08/07/24  Algebra A - Moed A\n"
        );
    }

    #[test]
    fn week_groups_blocks_by_day() {
        let catalog = catalog();
        let mut selection = SelectionSet::new();
        selection.add(&catalog, "104031").unwrap();
        let course = catalog.find_course("104031").unwrap();
        let projector = CalendarProjector::new(DEFAULT_TIME_ZONE, Arc::new(NoNicknames));
        let items = projector.alternatives(&course, None, &selection);

        let mut out = Vec::new();
        write_week(&mut out, "Schedule 1 of 1", &items, 1..=7).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "=== Schedule 1 of 1 ===\n\
             Monday:\n  10:30-12:30 [#1] Calculus 1M | Group 10 | Ullman 101 (lecture)\n"
        );
    }

    #[test]
    fn catalog_view_hides_invisible_rows() {
        let mut view = CatalogView::new(&catalog());
        view.set_query("234", &NoNicknames);
        let mut out = Vec::new();
        write_catalog_view(&mut out, &view).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Computer Science\n"));
        assert!(!text.contains("Mathematics"));
        assert!(text.contains("234218  Data Structures 1"));
    }
}
