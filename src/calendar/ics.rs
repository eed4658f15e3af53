//! iCalendar (RFC 5545) writer for projected occurrences.

use std::io::Write;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::catalog::time_utils::ical_weekday;
use crate::error::Result;
use crate::services::Exporter;
use super::projector::{localize, DatedOccurrence, OccurrenceTiming, WeeklyRecurrence};

const PROD_ID: &str = "-//course-planner//timetable export//EN";
const MAX_LINE_OCTETS: usize = 75;

/// Writes one VCALENDAR per `export` call
pub struct IcsExporter<W: Write> {
    writer: W,
    stamp: DateTime<Utc>,
}

impl<W: Write> IcsExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stamp: Utc::now(),
        }
    }

    /// Fixed DTSTAMP, mostly for reproducible output
    pub fn with_stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&mut self, content: &str) -> Result<()> {
        self.writer.write_all(fold_line(content).as_bytes())?;
        Ok(())
    }

    fn event(&mut self, index: usize, occurrence: &DatedOccurrence) -> Result<()> {
        self.line("BEGIN:VEVENT")?;
        self.line(&format!(
            "UID:{}-{}@course-planner",
            index,
            occurrence.timing.date().format("%Y%m%d")
        ))?;
        self.line(&format!("DTSTAMP:{}", format_utc(self.stamp)))?;
        self.line(&format!("SUMMARY:{}", escape_text(&occurrence.summary)))?;
        if !occurrence.description.is_empty() {
            self.line(&format!("DESCRIPTION:{}", escape_text(&occurrence.description)))?;
        }
        if let Some(location) = &occurrence.location {
            self.line(&format!("LOCATION:{}", escape_text(location)))?;
        }

        match &occurrence.timing {
            OccurrenceTiming::Timed { start, end } => {
                let tz = start.timezone();
                self.line(&format!("DTSTART;TZID={}:{}", tz.name(), start.format("%Y%m%dT%H%M%S")))?;
                self.line(&format!("DTEND;TZID={}:{}", tz.name(), end.format("%Y%m%dT%H%M%S")))?;
                if let Some(rule) = &occurrence.recurrence {
                    self.line(&recurrence_rule(rule, tz))?;
                }
            }
            OccurrenceTiming::AllDay(date) => {
                let next = *date + Duration::days(1);
                self.line(&format!("DTSTART;VALUE=DATE:{}", date.format("%Y%m%d")))?;
                self.line(&format!("DTEND;VALUE=DATE:{}", next.format("%Y%m%d")))?;
            }
        }
        self.line("END:VEVENT")
    }
}

impl<W: Write> Exporter for IcsExporter<W> {
    fn export(&mut self, occurrences: &[DatedOccurrence]) -> Result<()> {
        self.line("BEGIN:VCALENDAR")?;
        self.line("VERSION:2.0")?;
        self.line(&format!("PRODID:{}", PROD_ID))?;
        self.line("CALSCALE:GREGORIAN")?;
        for (index, occurrence) in occurrences.iter().enumerate() {
            self.event(index, occurrence)?;
        }
        self.line("END:VCALENDAR")?;
        self.writer.flush()?;
        tracing::info!(events = occurrences.len(), "Exported calendar");
        Ok(())
    }
}

/// UNTIL is the last second of the semester's final day in `tz`, in UTC
fn recurrence_rule(rule: &WeeklyRecurrence, tz: Tz) -> String {
    let last_moment = (rule.until + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::seconds(1);
    let until = localize(tz, last_moment).with_timezone(&Utc);
    format!(
        "RRULE:FREQ=WEEKLY;INTERVAL=1;WKST={};UNTIL={}",
        ical_weekday(rule.week_start),
        format_utc(until)
    )
}

fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Splits `content` into CRLF-terminated lines of at most 75 octets.
/// Continuation lines start with a single space and never split a char.
pub fn fold_line(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 8);
    let mut width = 0;
    for c in content.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarProjector, DEFAULT_TIME_ZONE};
    use crate::catalog::types::fixtures::{catalog, course, date};
    use crate::schedule::{CandidateSchedule, EventRef};
    use crate::services::NoNicknames;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn export(occurrences: &[DatedOccurrence]) -> String {
        let stamp = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let mut exporter = IcsExporter::new(Vec::new()).with_stamp(stamp);
        exporter.export(occurrences).unwrap();
        String::from_utf8(exporter.into_inner()).unwrap()
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn folds_long_lines_at_75_octets() {
        let folded = fold_line(&"x".repeat(160));
        let lines: Vec<&str> = folded.trim_end_matches("\r\n").split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 75);
        assert!(lines[1].starts_with(' '));
        assert!(lines.iter().all(|l| l.len() <= 75));
        let unfolded: String = lines.concat().replace(' ', "");
        assert_eq!(unfolded.len(), 160);
    }

    #[test]
    fn folding_keeps_multibyte_chars_whole() {
        let folded = fold_line(&"\u{5d0}".repeat(50));
        for line in folded.split("\r\n") {
            assert!(line.len() <= 75);
        }
        assert!(std::str::from_utf8(folded.as_bytes()).is_ok());
    }

    #[test]
    fn weekly_class_has_timezone_and_rule() {
        let catalog = catalog();
        let ev = EventRef::resolve(catalog.find_course("104031").unwrap(), 10, 0).unwrap();
        let schedule = CandidateSchedule::new(vec![ev], 1.0, vec![]);
        let projector = CalendarProjector::new(DEFAULT_TIME_ZONE, Arc::new(NoNicknames));
        let occurrences: Vec<_> = projector
            .project(&schedule, Some(date(2024, 10, 27)), Some(date(2025, 1, 24)))
            .unwrap()
            .collect();

        let text = export(&occurrences);
        assert!(text.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(text.ends_with("END:VCALENDAR\r\n"));
        assert!(text.contains("SUMMARY:Calculus 1M\r\n"));
        assert!(text.contains("DTSTART;TZID=Asia/Jerusalem:20241028T103000\r\n"));
        assert!(text.contains("DTEND;TZID=Asia/Jerusalem:20241028T123000\r\n"));
        // 2025-01-24 23:59:59 in Jerusalem (UTC+2)
        assert!(text.contains("RRULE:FREQ=WEEKLY;INTERVAL=1;WKST=MO;UNTIL=20250124T215959Z\r\n"));
        assert!(text.contains("LOCATION:Ullman 101\r\n"));
        assert!(text.contains("DTSTAMP:20241001T120000Z\r\n"));
    }

    #[test]
    fn exams_are_all_day_events() {
        let projector = CalendarProjector::new(DEFAULT_TIME_ZONE, Arc::new(NoNicknames));
        let selection = vec![course("104031", "Calculus 1M", Some(date(2024, 7, 28)), None)];
        let exams = projector.exam_schedule(&selection);

        let text = export(&exams);
        assert!(text.contains("SUMMARY:Calculus 1M - Moed A\r\n"));
        assert!(text.contains("DTSTART;VALUE=DATE:20240728\r\n"));
        assert!(text.contains("DTEND;VALUE=DATE:20240729\r\n"));
        assert!(!text.contains("RRULE"));
        assert_eq!(text.matches("BEGIN:VEVENT").count(), 1);
    }
}
