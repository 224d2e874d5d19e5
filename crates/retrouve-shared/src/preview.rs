//! Human-readable timestamps for the inbox and the message feed.
//!
//! The inbox preview rule is part of the client contract:
//! - same calendar day   -> `HH:MM` (24-hour)
//! - previous calendar day -> the literal `Yesterday`
//! - anything older      -> `DD/M/YYYY` (day zero-padded, month not)
//!
//! Both helpers take an explicit `now` so tests can pin the clock.

use chrono::{DateTime, Datelike, Days, TimeZone, Timelike};

use crate::constants::YESTERDAY_LABEL;

/// Format a message timestamp for a chat-list preview.
pub fn format_preview_date<Tz: TimeZone>(ts: &DateTime<Tz>, now: &DateTime<Tz>) -> String {
    let ts_day = ts.date_naive();
    let today = now.date_naive();

    if ts_day == today {
        return format_time_of_day(ts);
    }

    if Some(ts_day) == today.checked_sub_days(Days::new(1)) {
        return YESTERDAY_LABEL.to_string();
    }

    format!("{:02}/{}/{}", ts.day(), ts.month(), ts.year())
}

/// `HH:MM` 24-hour time of day, as shown next to each feed item.
pub fn format_time_of_day<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    format!("{:02}:{:02}", ts.hour(), ts.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn same_day_shows_time() {
        let now = at(2024, 3, 5, 18, 30);
        let ts = at(2024, 3, 5, 14, 5);
        assert_eq!(format_preview_date(&ts, &now), "14:05");
    }

    #[test]
    fn previous_calendar_day_shows_yesterday() {
        // 24h + 1min ago, which lands on the previous calendar day.
        let now = at(2024, 3, 5, 10, 0);
        let ts = at(2024, 3, 4, 9, 59);
        assert_eq!(format_preview_date(&ts, &now), "Yesterday");
    }

    #[test]
    fn late_yesterday_is_still_yesterday() {
        // Only the calendar day matters, not a 24h window.
        let now = at(2024, 3, 5, 0, 10);
        let ts = at(2024, 3, 4, 23, 55);
        assert_eq!(format_preview_date(&ts, &now), "Yesterday");
    }

    #[test]
    fn older_shows_date_with_unpadded_month() {
        let now = at(2024, 3, 5, 12, 0);
        let ts = at(2024, 3, 2, 8, 15);
        assert_eq!(format_preview_date(&ts, &now), "02/3/2024");
    }

    #[test]
    fn older_across_year_boundary() {
        let now = at(2024, 1, 2, 12, 0);
        let ts = at(2023, 12, 25, 8, 15);
        assert_eq!(format_preview_date(&ts, &now), "25/12/2023");
    }

    #[test]
    fn time_of_day_is_zero_padded() {
        let ts = at(2024, 6, 1, 7, 3);
        assert_eq!(format_time_of_day(&ts), "07:03");
    }
}
