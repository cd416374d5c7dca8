// libs/booking-cell/src/services/time.rs
//
// Wall-clock arithmetic and timezone resolution for single-day slots.
// Bookings never span midnight, so an addition that would cross it is an
// error here rather than a silent wrap.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("adding {minutes} minutes to {time} crosses midnight")]
    CrossesMidnight { time: NaiveTime, minutes: i64 },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("local time {time} does not exist on {date} in {tz}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        tz: Tz,
    },
}

/// Wall-clock addition within a single day. `minutes` may be negative.
pub fn add_minutes(time: NaiveTime, minutes: i64) -> Result<NaiveTime, TimeError> {
    let seconds = time.num_seconds_from_midnight() as i64 + minutes * 60;
    if !(0..SECONDS_PER_DAY).contains(&seconds) {
        return Err(TimeError::CrossesMidnight { time, minutes });
    }
    NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, time.nanosecond())
        .ok_or(TimeError::CrossesMidnight { time, minutes })
}

/// Half-open interval overlap: touching intervals (a_end == b_start) do not
/// overlap.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

pub fn resolve_timezone(name: &str) -> Result<Tz, TimeError> {
    name.parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

/// Pin a wall-clock time on a date to an instant in the given zone. An
/// ambiguous local time (DST fold) resolves to the earlier instant; a
/// nonexistent one (DST gap) is an error.
pub fn localize(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Tz>, TimeError> {
    use chrono::offset::LocalResult;
    use chrono::TimeZone;

    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, _later) => Ok(earlier),
        LocalResult::None => Err(TimeError::NonexistentLocalTime { date, time, tz }),
    }
}
