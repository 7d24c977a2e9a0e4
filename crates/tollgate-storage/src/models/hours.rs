//! Opening-hours rules.
//!
//! Rows are stored with plain text times and integer day patterns
//! ([`RegularHoursRow`], [`ExceptionHoursRow`]) and decoded into the domain
//! types with `TryFrom`, so a bad row surfaces as a validation error instead
//! of a panic or a silently skipped rule.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StorageError, StorageResult};

/// Days a regular rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPattern {
    Weekday(Weekday),
    /// Monday to Friday
    Workdays,
    Everyday,
}

impl DayPattern {
    /// Decode the stored form: 0-6 Monday-Sunday, 7 workdays, 8 every day.
    pub fn from_code(code: i64) -> StorageResult<Self> {
        match code {
            0..=6 => {
                let weekday = Weekday::try_from(code as u8)
                    .map_err(|e| StorageError::Validation(e.to_string()))?;
                Ok(DayPattern::Weekday(weekday))
            }
            7 => Ok(DayPattern::Workdays),
            8 => Ok(DayPattern::Everyday),
            other => Err(StorageError::Validation(format!(
                "invalid day pattern {other}"
            ))),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            DayPattern::Weekday(day) => i64::from(day.num_days_from_monday()),
            DayPattern::Workdays => 7,
            DayPattern::Everyday => 8,
        }
    }

    pub fn matches(&self, day: Weekday) -> bool {
        match self {
            DayPattern::Weekday(wanted) => *wanted == day,
            DayPattern::Workdays => day.num_days_from_monday() < 5,
            DayPattern::Everyday => true,
        }
    }
}

/// Whether an exception opens or closes the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Open,
    Closed,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Open => "open",
            Polarity::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Polarity::Open)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s {
            "open" => Ok(Polarity::Open),
            "closed" => Ok(Polarity::Closed),
            other => Err(StorageError::Validation(format!(
                "invalid exception type {other:?}"
            ))),
        }
    }
}

/// Parse a stored time of day.
///
/// Accepts `HH:MM` and `HH:MM:SS`; `24:00` is the last instant of the day.
///
/// ```
/// use chrono::NaiveTime;
/// use tollgate_storage::models::parse_time;
///
/// assert_eq!(parse_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
/// assert!(parse_time("24:00").unwrap() > NaiveTime::from_hms_opt(23, 59, 59).unwrap());
/// ```
pub fn parse_time(raw: &str) -> StorageResult<NaiveTime> {
    let raw = raw.trim();
    if raw == END_OF_DAY || raw == "24:00:00" {
        return end_of_day().ok_or_else(|| StorageError::Validation("invalid end of day".into()));
    }

    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| StorageError::Validation(format!("invalid time {raw:?}: {e}")))
}

const END_OF_DAY: &str = "24:00";

fn end_of_day() -> Option<NaiveTime> {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
}

/// Inverse of [`parse_time`]; the last instant of the day is stored as `24:00`.
pub(crate) fn format_time(time: NaiveTime) -> String {
    if Some(time) == end_of_day() {
        return END_OF_DAY.to_string();
    }
    time.format("%H:%M:%S").to_string()
}

/// Recurring opening window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularHours {
    pub id: i64,
    /// `None` applies to every device
    pub device: Option<String>,
    pub days: DayPattern,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl RegularHours {
    /// Whether `device` falls under this rule's scope.
    pub fn applies_to(&self, device: &str) -> bool {
        self.device.as_deref().is_none_or(|d| d == device)
    }

    /// Whether the rule's window contains `at`. Bounds are inclusive.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        self.days.matches(at.weekday()) && self.start <= time && time <= self.end
    }
}

/// Date specific override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHours {
    pub id: i64,
    /// `None` applies to every device
    pub device: Option<String>,
    pub date: NaiveDate,
    pub polarity: Polarity,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ExceptionHours {
    pub fn applies_to(&self, device: &str) -> bool {
        self.device.as_deref().is_none_or(|d| d == device)
    }

    /// Whether the exception covers `at`. Bounds are inclusive.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        self.date == at.date() && self.start <= time && time <= self.end
    }
}

/// Stored form of [`RegularHours`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegularHoursRow {
    pub id: i64,
    pub device: Option<String>,
    pub day_of_week: i64,
    pub time_start: String,
    pub time_end: String,
}

impl TryFrom<RegularHoursRow> for RegularHours {
    type Error = StorageError;

    fn try_from(row: RegularHoursRow) -> StorageResult<Self> {
        Ok(Self {
            id: row.id,
            device: row.device,
            days: DayPattern::from_code(row.day_of_week)?,
            start: parse_time(&row.time_start)?,
            end: parse_time(&row.time_end)?,
        })
    }
}

impl From<&RegularHours> for RegularHoursRow {
    fn from(rule: &RegularHours) -> Self {
        Self {
            id: rule.id,
            device: rule.device.clone(),
            day_of_week: rule.days.code(),
            time_start: format_time(rule.start),
            time_end: format_time(rule.end),
        }
    }
}

/// Stored form of [`ExceptionHours`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExceptionHoursRow {
    pub id: i64,
    pub device: Option<String>,
    pub exception_date: String,
    pub exception_type: String,
    pub time_start: String,
    pub time_end: String,
}

impl TryFrom<ExceptionHoursRow> for ExceptionHours {
    type Error = StorageError;

    fn try_from(row: ExceptionHoursRow) -> StorageResult<Self> {
        let date = NaiveDate::parse_from_str(row.exception_date.trim(), "%Y-%m-%d").map_err(|e| {
            StorageError::Validation(format!("invalid date {:?}: {e}", row.exception_date))
        })?;

        Ok(Self {
            id: row.id,
            device: row.device,
            date,
            polarity: row.exception_type.parse()?,
            start: parse_time(&row.time_start)?,
            end: parse_time(&row.time_end)?,
        })
    }
}

impl From<&ExceptionHours> for ExceptionHoursRow {
    fn from(rule: &ExceptionHours) -> Self {
        Self {
            id: rule.id,
            device: rule.device.clone(),
            exception_date: rule.date.format("%Y-%m-%d").to_string(),
            exception_type: rule.polarity.as_str().to_string(),
            time_start: format_time(rule.start),
            time_end: format_time(rule.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, 0)
            .unwrap()
    }

    #[rstest]
    #[case(0, Weekday::Mon, true)]
    #[case(2, Weekday::Wed, true)]
    #[case(2, Weekday::Thu, false)]
    #[case(6, Weekday::Sun, true)]
    #[case(7, Weekday::Fri, true)]
    #[case(7, Weekday::Sat, false)]
    #[case(8, Weekday::Sun, true)]
    fn test_day_pattern(#[case] code: i64, #[case] day: Weekday, #[case] expected: bool) {
        let pattern = DayPattern::from_code(code).unwrap();
        assert_eq!(pattern.matches(day), expected);
        assert_eq!(pattern.code(), code);
    }

    #[rstest]
    #[case(-1)]
    #[case(9)]
    fn test_day_pattern_invalid(#[case] code: i64) {
        assert!(DayPattern::from_code(code).is_err());
    }

    #[rstest]
    #[case("09:00", 9, 0, 0)]
    #[case("17:30:15", 17, 30, 15)]
    #[case(" 08:05 ", 8, 5, 0)]
    fn test_parse_time(#[case] raw: &str, #[case] h: u32, #[case] m: u32, #[case] s: u32) {
        assert_eq!(parse_time(raw).unwrap(), NaiveTime::from_hms_opt(h, m, s).unwrap());
    }

    #[rstest]
    #[case("25:00")]
    #[case("noon")]
    #[case("")]
    fn test_parse_time_invalid(#[case] raw: &str) {
        assert!(parse_time(raw).is_err());
    }

    #[rstest]
    #[case("00:00", "00:00:00")]
    #[case("17:30", "17:30:00")]
    #[case("23:59:59", "23:59:59")]
    #[case("24:00", "24:00")]
    fn test_format_time_round_trip(#[case] raw: &str, #[case] stored: &str) {
        let time = parse_time(raw).unwrap();
        assert_eq!(format_time(time), stored);
        assert_eq!(parse_time(stored).unwrap(), time);
    }

    #[test]
    fn test_regular_rule_window() {
        let rule = RegularHours {
            id: 1,
            device: None,
            days: DayPattern::Workdays,
            start: parse_time("09:00").unwrap(),
            end: parse_time("17:00").unwrap(),
        };

        // 2026-10-21 is a Wednesday, 2026-10-24 a Saturday
        assert!(rule.contains(at((2026, 10, 21), (9, 0))));
        assert!(rule.contains(at((2026, 10, 21), (17, 0))));
        assert!(!rule.contains(at((2026, 10, 21), (17, 1))));
        assert!(!rule.contains(at((2026, 10, 24), (10, 0))));
        assert!(rule.applies_to("anything"));
    }

    #[test]
    fn test_exception_scope_and_date() {
        let rule = ExceptionHours {
            id: 1,
            device: Some("gate1".into()),
            date: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
            polarity: Polarity::Closed,
            start: parse_time("12:00").unwrap(),
            end: parse_time("13:00").unwrap(),
        };

        assert!(rule.applies_to("gate1"));
        assert!(!rule.applies_to("gate2"));
        assert!(rule.contains(at((2026, 10, 21), (12, 30))));
        assert!(!rule.contains(at((2026, 10, 22), (12, 30))));
    }

    #[test]
    fn test_row_decoding() {
        let row = ExceptionHoursRow {
            id: 3,
            device: None,
            exception_date: "2026-12-24".into(),
            exception_type: "open".into(),
            time_start: "00:00".into(),
            time_end: "24:00".into(),
        };
        let rule = ExceptionHours::try_from(row).unwrap();
        assert_eq!(rule.polarity, Polarity::Open);
        assert!(rule.contains(at((2026, 12, 24), (23, 59))));

        let bad = RegularHoursRow {
            id: 1,
            device: None,
            day_of_week: 12,
            time_start: "09:00".into(),
            time_end: "17:00".into(),
        };
        assert!(matches!(
            RegularHours::try_from(bad),
            Err(StorageError::Validation(_))
        ));
    }
}
