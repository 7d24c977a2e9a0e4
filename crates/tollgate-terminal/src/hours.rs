//! Opening-hours engine.
//!
//! Regular rules say when the terminal normally operates; exception rules
//! override them for one date. An exception only flips a decision that
//! disagrees with it: an `open` exception opens a closed terminal, a
//! `closed` exception closes an open one. When several exceptions cover the
//! same moment the newest one counts.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, warn};
use tollgate_core::DeviceId;
use tollgate_storage::{
    ExceptionHours, HoursRepository, Polarity, RegularHours, SqliteHoursRepository, StorageResult,
};

/// Decide whether `device` may act at `at` (local time).
pub fn evaluate(
    regular: &[RegularHours],
    exceptions: &[ExceptionHours],
    device: &DeviceId,
    at: NaiveDateTime,
) -> bool {
    let regular_open = regular
        .iter()
        .any(|rule| rule.applies_to(device.as_str()) && rule.contains(at));

    let exception = exceptions
        .iter()
        .filter(|rule| rule.applies_to(device.as_str()) && rule.contains(at))
        .max_by_key(|rule| rule.id);

    match exception.map(|rule| (rule.id, rule.polarity)) {
        Some((id, Polarity::Open)) if !regular_open => {
            warn!(exception = id, "Exception hours match, forced opening hours");
            true
        }
        Some((id, Polarity::Closed)) if regular_open => {
            warn!(exception = id, "Exception hours match, forced closed hours");
            false
        }
        _ => regular_open,
    }
}

/// Opening hours of one device, backed by the store.
pub struct OpeningHours<R = SqliteHoursRepository> {
    repo: R,
    device: DeviceId,
}

impl<R: HoursRepository> OpeningHours<R> {
    pub fn new(repo: R, device: DeviceId) -> Self {
        Self { repo, device }
    }

    /// Whether the device is open right now.
    pub async fn check(&self) -> StorageResult<bool> {
        self.check_at(Local::now().naive_local()).await
    }

    pub async fn check_at(&self, at: NaiveDateTime) -> StorageResult<bool> {
        let regular = self.repo.regular_rules(&self.device).await?;
        let exceptions = self.repo.exceptions_on(&self.device, at.date()).await?;

        let open = evaluate(&regular, &exceptions, &self.device, at);
        debug!(device_id = %self.device, %at, open, "Opening hours checked");
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rstest::rstest;
    use tollgate_storage::models::parse_time;
    use tollgate_storage::{DayPattern, Database};

    fn time(raw: &str) -> NaiveTime {
        parse_time(raw).unwrap()
    }

    // 2026-10-21 is a Wednesday
    fn wednesday(at: &str) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 21).unwrap().and_time(time(at))
    }

    fn regular(id: i64, device: Option<&str>, days: DayPattern, start: &str, end: &str) -> RegularHours {
        RegularHours {
            id,
            device: device.map(str::to_string),
            days,
            start: time(start),
            end: time(end),
        }
    }

    fn exception(id: i64, polarity: Polarity, start: &str, end: &str) -> ExceptionHours {
        ExceptionHours {
            id,
            device: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
            polarity,
            start: time(start),
            end: time(end),
        }
    }

    fn gate() -> DeviceId {
        DeviceId::new("gate1").unwrap()
    }

    #[rstest]
    #[case("10:00", true)]
    #[case("12:30", false)]
    #[case("12:00", false)]
    #[case("13:00:01", true)]
    #[case("17:00", true)]
    #[case("17:00:01", false)]
    #[case("08:59", false)]
    fn test_lunch_break_on_workday(#[case] at: &str, #[case] expected: bool) {
        let rules = [regular(1, None, DayPattern::Workdays, "09:00", "17:00")];
        let exceptions = [exception(1, Polarity::Closed, "12:00", "13:00")];
        assert_eq!(evaluate(&rules, &exceptions, &gate(), wednesday(at)), expected);
    }

    #[test]
    fn test_open_exception_on_closed_day() {
        let rules = [regular(1, None, DayPattern::Weekday(chrono::Weekday::Sat), "09:00", "17:00")];
        let exceptions = [exception(1, Polarity::Open, "10:00", "11:00")];

        assert!(evaluate(&rules, &exceptions, &gate(), wednesday("10:30")));
        assert!(!evaluate(&rules, &exceptions, &gate(), wednesday("11:30")));
    }

    #[test]
    fn test_newest_exception_wins() {
        let rules = [regular(1, None, DayPattern::Everyday, "00:00", "24:00")];
        let exceptions = [
            exception(2, Polarity::Open, "12:00", "13:00"),
            exception(1, Polarity::Closed, "12:00", "13:00"),
        ];
        assert!(evaluate(&rules, &exceptions, &gate(), wednesday("12:30")));

        let exceptions = [
            exception(1, Polarity::Open, "12:00", "13:00"),
            exception(2, Polarity::Closed, "12:00", "13:00"),
        ];
        assert!(!evaluate(&rules, &exceptions, &gate(), wednesday("12:30")));
    }

    #[test]
    fn test_rules_of_other_devices_ignored() {
        let rules = [regular(1, Some("gate2"), DayPattern::Everyday, "00:00", "24:00")];
        assert!(!evaluate(&rules, &[], &gate(), wednesday("10:00")));

        let rules = [regular(1, Some("gate1"), DayPattern::Everyday, "00:00", "24:00")];
        assert!(evaluate(&rules, &[], &gate(), wednesday("23:59:59")));
    }

    #[test]
    fn test_no_rules_means_closed() {
        assert!(!evaluate(&[], &[], &gate(), wednesday("10:00")));
    }

    #[tokio::test]
    async fn test_check_at_reads_store() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteHoursRepository::new(db.pool().clone());
        repo.add_regular(&regular(0, None, DayPattern::Workdays, "09:00", "17:00"))
            .await
            .unwrap();
        repo.add_exception(&exception(0, Polarity::Closed, "12:00", "13:00"))
            .await
            .unwrap();

        let hours = OpeningHours::new(repo, gate());
        assert!(hours.check_at(wednesday("10:00")).await.unwrap());
        assert!(!hours.check_at(wednesday("12:30")).await.unwrap());

        // Sunday
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap().and_time(time("10:00"));
        assert!(!hours.check_at(sunday).await.unwrap());
    }
}
