use chrono::{Datelike, Days, NaiveDate};

/// Sunday that opens the calendar week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date - Days::new(offset)
}

/// Saturday that closes the calendar week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Days::new(6)
}
