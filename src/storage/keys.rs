use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone};

/// Store partition key for the ISO week a date falls into, in the form
/// `week_<year>_<two digit week>`. Weeks start on Monday and week 1 is the week
/// containing the year's first Thursday, so early January dates can key into
/// the previous year.
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("week_{}_{:02}", week.year(), week.week())
}

/// This is the standard way of converting a date to a string in tabtime.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Returns the instant a calendar day begins in the given timezone. Midnight
/// can fall into a dst gap, the day then starts at the first local time that
/// exists.
pub fn day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let mut local = date.and_time(NaiveTime::MIN);
    loop {
        if let Some(instant) = tz.from_local_datetime(&local).earliest() {
            return instant;
        }
        local += chrono::Duration::minutes(1);
    }
}
