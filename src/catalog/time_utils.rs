use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};

use crate::error::{PlannerError, Result};

/// Textual date format used for persisted semester bounds
pub const DATE_FORMAT: &str = "%d/%m/%y";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parses a time of day given as "HH:MM" or in military form ("830", "1030")
pub fn parse_time_of_day(time_str: &str) -> Result<NaiveTime> {
    let clean = time_str.trim();
    let invalid = || PlannerError::InvalidTime {
        text: time_str.to_string(),
    };

    let (hours, minutes) = if let Some((h, m)) = clean.split_once(':') {
        let hours: u32 = h.parse().map_err(|_| invalid())?;
        let minutes: u32 = m.parse().map_err(|_| invalid())?;
        (hours, minutes)
    } else {
        if clean.is_empty() || clean.len() > 4 || !clean.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let military: u32 = clean.parse().map_err(|_| invalid())?;
        (military / 100, military % 100)
    };

    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Formats a time of day as HH:MM
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Fraction of the day elapsed at `time`, in [0, 1)
pub fn day_fraction(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

/// Maps a catalog day number (1 = Sunday ... 7 = Saturday) to a weekday
pub fn weekday_from_day(day: u8) -> Result<Weekday> {
    match day {
        1 => Ok(Weekday::Sun),
        2 => Ok(Weekday::Mon),
        3 => Ok(Weekday::Tue),
        4 => Ok(Weekday::Wed),
        5 => Ok(Weekday::Thu),
        6 => Ok(Weekday::Fri),
        7 => Ok(Weekday::Sat),
        _ => Err(PlannerError::InvalidDay { day }),
    }
}

pub fn day_name(day: u8) -> &'static str {
    match day {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => "Unknown day",
    }
}

/// Two-letter iCalendar weekday code
pub fn ical_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

/// Parses a DD/MM/YY date; ISO dates (YYYY-MM-DD) are accepted as well
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    let clean = date_str.trim();
    NaiveDate::parse_from_str(clean, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(clean, "%Y-%m-%d"))
        .map_err(|_| PlannerError::InvalidDate {
            text: date_str.to_string(),
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
