//! Persisted user settings and the runtime configuration built from them.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{EventField, DEFAULT_EVENT_FIELDS, DEFAULT_TIME_ZONE};
use crate::catalog::time_utils::{format_date, parse_date};
use crate::error::{PlannerError, Result};

/// What survives between runs. Dates are kept as `DD/MM/YY` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub selected_courses: Vec<String>,
    pub semester_start_date: Option<String>,
    pub semester_end_date: Option<String>,
    pub show_full_week: bool,
    pub shown_event_data: Vec<EventField>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_courses: Vec::new(),
            semester_start_date: None,
            semester_end_date: None,
            show_full_week: true,
            shown_event_data: DEFAULT_EVENT_FIELDS.to_vec(),
        }
    }
}

impl Settings {
    /// Reads `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// `None` when unset or not a valid date
    pub fn semester_start(&self) -> Option<NaiveDate> {
        stored_date(self.semester_start_date.as_deref())
    }

    pub fn semester_end(&self) -> Option<NaiveDate> {
        stored_date(self.semester_end_date.as_deref())
    }

    pub fn set_semester(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.semester_start_date = start.map(format_date);
        self.semester_end_date = end.map(format_date);
    }
}

fn stored_date(text: Option<&str>) -> Option<NaiveDate> {
    let text = text?;
    match parse_date(text) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring stored semester date");
            None
        }
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| PlannerError::UnknownTimeZone {
        name: name.to_string(),
    })
}

/// Built once at startup and handed to the planner state
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub time_zone: Tz,
    pub shown_fields: Vec<EventField>,
    pub show_full_week: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE,
            shown_fields: DEFAULT_EVENT_FIELDS.to_vec(),
            show_full_week: true,
        }
    }
}

impl PlannerConfig {
    pub fn from_settings(settings: &Settings, time_zone: Tz) -> Self {
        Self {
            time_zone,
            shown_fields: settings.shown_event_data.clone(),
            show_full_week: settings.show_full_week,
        }
    }

    /// Day numbers (1 = Sunday) shown in the weekly grid
    pub fn visible_days(&self) -> std::ops::RangeInclusive<u8> {
        if self.show_full_week {
            1..=7
        } else {
            1..=5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::date;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.show_full_week);
        assert_eq!(settings.semester_start(), None);
    }

    #[test]
    fn save_and_load_keep_dates_as_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.selected_courses = vec!["104031".to_string(), "234114".to_string()];
        settings.set_semester(Some(date(2024, 10, 27)), Some(date(2025, 1, 24)));
        settings.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"27/10/24\""));

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.semester_start(), Some(date(2024, 10, 27)));
        assert_eq!(loaded.semester_end(), Some(date(2025, 1, 24)));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"selected_courses": ["104031"], "semester_start_date": "not a date"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.selected_courses, vec!["104031"]);
        assert_eq!(settings.shown_event_data, DEFAULT_EVENT_FIELDS.to_vec());
        assert_eq!(settings.semester_start(), None);
    }

    #[test]
    fn time_zone_names_are_checked() {
        assert_eq!(parse_time_zone("Europe/London").unwrap(), chrono_tz::Europe::London);
        assert!(matches!(
            parse_time_zone("Mars/Olympus"),
            Err(PlannerError::UnknownTimeZone { .. })
        ));
    }

    #[test]
    fn short_week_hides_friday_and_saturday() {
        let mut settings = Settings::default();
        settings.show_full_week = false;
        let config = PlannerConfig::from_settings(&settings, DEFAULT_TIME_ZONE);
        assert_eq!(config.visible_days(), 1..=5);
        assert_eq!(PlannerConfig::default().visible_days(), 1..=7);
    }
}
