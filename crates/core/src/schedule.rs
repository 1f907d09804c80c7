use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use thiserror::Error;

/// Textual layout accepted for event dates, e.g. `2025-03-10 18:00`.
pub const DATETIME_LAYOUT: &str = "YYYY-MM-DD HH:MM";

/// Lead time between registration close and the event when no explicit
/// deadline is requested.
pub const DEFAULT_DEADLINE_LEAD_HOURS: i64 = 24;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid date-time `{input}` (expected `{DATETIME_LAYOUT}`)")]
    InvalidFormat { input: String },
}

/// Parses an event date in the fixed `YYYY-MM-DD HH:MM` layout.
///
/// Every field must be numeric with its exact width, month 01-12, day
/// 01-31, hour 00-23, minute 00-59. The day is not checked against the
/// month length; day 31 in a shorter month rolls over into the next
/// month.
pub fn parse_event_datetime(input: &str) -> Result<DateTime<Utc>, ScheduleError> {
    let fail = || ScheduleError::InvalidFormat { input: input.to_owned() };

    let trimmed = input.trim();
    let (date_part, time_part) = trimmed.split_once(' ').ok_or_else(fail)?;

    let mut date_fields = date_part.split('-');
    let year = fixed_width_field(date_fields.next(), 4).ok_or_else(fail)?;
    let month = fixed_width_field(date_fields.next(), 2).ok_or_else(fail)?;
    let day = fixed_width_field(date_fields.next(), 2).ok_or_else(fail)?;
    if date_fields.next().is_some() {
        return Err(fail());
    }

    let mut time_fields = time_part.split(':');
    let hour = fixed_width_field(time_fields.next(), 2).ok_or_else(fail)?;
    let minute = fixed_width_field(time_fields.next(), 2).ok_or_else(fail)?;
    if time_fields.next().is_some() {
        return Err(fail());
    }

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
        return Err(fail());
    }

    let month_start = NaiveDate::from_ymd_opt(year as i32, month, 1).ok_or_else(fail)?;
    let date = month_start.checked_add_days(Days::new(u64::from(day - 1))).ok_or_else(fail)?;
    let naive = date.and_hms_opt(hour, minute, 0).ok_or_else(fail)?;

    Ok(naive.and_utc())
}

/// Computes the registration deadline for an event.
///
/// The two creation modes are mutually exclusive: a finite explicit
/// minutes value (of any sign) counts from `now`; otherwise the deadline
/// defaults to 24 hours before the event.
pub fn compute_deadline(
    event_date: DateTime<Utc>,
    explicit_minutes: Option<f64>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match explicit_minutes {
        Some(minutes) if minutes.is_finite() => {
            now + Duration::milliseconds((minutes * 60_000.0) as i64)
        }
        _ => event_date - Duration::hours(DEFAULT_DEADLINE_LEAD_HOURS),
    }
}

fn fixed_width_field(field: Option<&str>, width: usize) -> Option<u32> {
    let field = field?;
    if field.len() != width || !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
