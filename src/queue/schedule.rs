/// Appointment slot validation
///
/// A queue entry may carry a requested visit slot. The admissions office
/// takes visitors on a half-hour grid between 09:00 and 16:30, Monday
/// through Friday, bookable up to a configured number of days ahead.

use crate::error::{QueueError, QueueResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};

const OPENING_MINUTES: u32 = 9 * 60;
const LAST_SLOT_MINUTES: u32 = 16 * 60 + 30;

/// Validate an optional schedule slot
///
/// Both parts must be present or both absent.
pub fn validate_slot(
    date: Option<&str>,
    time: Option<&str>,
    horizon_days: i64,
) -> QueueResult<()> {
    match (date, time) {
        (None, None) => Ok(()),
        (Some(d), Some(t)) => validate_slot_parts(d, t, horizon_days),
        _ => Err(QueueError::Validation(
            "Schedule slot requires both date and time".to_string(),
        )),
    }
}

fn validate_slot_parts(date: &str, time: &str, horizon_days: i64) -> QueueResult<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        QueueError::Validation("Invalid slot date, expected YYYY-MM-DD".to_string())
    })?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| QueueError::Validation("Invalid slot time, expected HH:MM".to_string()))?;

    let today = Utc::now().date_naive();

    if date < today {
        return Err(QueueError::Validation("Slot date is in the past".to_string()));
    }

    if date > today + Duration::days(horizon_days) {
        return Err(QueueError::Validation(format!(
            "Slot date is more than {} days ahead",
            horizon_days
        )));
    }

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return Err(QueueError::Validation(
            "Slots are available Monday through Friday".to_string(),
        ));
    }

    let minutes = time.hour() * 60 + time.minute();

    if !(OPENING_MINUTES..=LAST_SLOT_MINUTES).contains(&minutes) {
        return Err(QueueError::Validation(
            "Slot time must be between 09:00 and 16:30".to_string(),
        ));
    }

    if time.minute() % 30 != 0 {
        return Err(QueueError::Validation(
            "Slot time must be on a half-hour boundary".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// First weekday at least `from_days` ahead of today
    fn next_weekday(from_days: i64) -> NaiveDate {
        let mut date = Utc::now().date_naive() + Duration::days(from_days);
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        date
    }

    fn next_saturday() -> NaiveDate {
        let mut date = Utc::now().date_naive() + Duration::days(1);
        while date.weekday() != Weekday::Sat {
            date += Duration::days(1);
        }
        date
    }

    #[test]
    fn test_valid_slot() {
        let date = next_weekday(1).format("%Y-%m-%d").to_string();

        validate_slot(Some(&date), Some("09:00"), 14).unwrap();
        validate_slot(Some(&date), Some("12:30"), 14).unwrap();
        validate_slot(Some(&date), Some("16:30"), 14).unwrap();
    }

    #[test]
    fn test_no_slot_is_valid() {
        validate_slot(None, None, 14).unwrap();
    }

    #[test]
    fn test_slot_requires_both_parts() {
        let date = next_weekday(1).format("%Y-%m-%d").to_string();

        assert!(validate_slot(Some(&date), None, 14).is_err());
        assert!(validate_slot(None, Some("09:00"), 14).is_err());
    }

    #[test]
    fn test_rejects_weekend() {
        let date = next_saturday().format("%Y-%m-%d").to_string();

        let result = validate_slot(Some(&date), Some("10:00"), 30);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_outside_hours() {
        let date = next_weekday(1).format("%Y-%m-%d").to_string();

        assert!(validate_slot(Some(&date), Some("08:30"), 14).is_err());
        assert!(validate_slot(Some(&date), Some("17:00"), 14).is_err());
    }

    #[test]
    fn test_rejects_off_grid_time() {
        let date = next_weekday(1).format("%Y-%m-%d").to_string();

        assert!(validate_slot(Some(&date), Some("09:15"), 14).is_err());
        assert!(validate_slot(Some(&date), Some("10:01"), 14).is_err());
    }

    #[test]
    fn test_rejects_past_and_far_future() {
        let yesterday = (Utc::now().date_naive() - Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        assert!(validate_slot(Some(&yesterday), Some("10:00"), 14).is_err());

        let far = next_weekday(20).format("%Y-%m-%d").to_string();
        assert!(validate_slot(Some(&far), Some("10:00"), 14).is_err());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(validate_slot(Some("2026-13-40"), Some("10:00"), 14).is_err());
        assert!(validate_slot(Some("tomorrow"), Some("10:00"), 14).is_err());

        let date = next_weekday(1).format("%Y-%m-%d").to_string();
        assert!(validate_slot(Some(&date), Some("25:00"), 14).is_err());
        assert!(validate_slot(Some(&date), Some("noon"), 14).is_err());
    }
}
