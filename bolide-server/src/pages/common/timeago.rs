//! Human readable timestamps for the inbox, deliberately coarse. Anything
//! older than a week is just "Long time ago".

use bolide_dependencies::chrono::{Datelike, NaiveDateTime, Timelike};

pub fn relative_time(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 5 {
        return "Few minutes ago".to_string();
    }
    if minutes < 60 {
        return format!("{} minutes ago", minutes);
    }
    if minutes < 60 * 24 {
        return format!("{} hours ago", minutes / 60);
    }
    // whole elapsed days, not calendar boundaries
    let days = (now - then).num_days();
    if days == 1 {
        return "Yesterday".to_string();
    }
    if days <= 7 {
        return format!("Last {}", then.format("%A"));
    }
    "Long time ago".to_string()
}

/// Sidebar clock, `3:42pm` style without a leading zero on the hour.
pub fn clock_line(now: NaiveDateTime) -> String {
    let (is_pm, hour) = now.hour12();
    format!(
        "{}:{:02}{}",
        hour,
        now.minute(),
        if is_pm { "pm" } else { "am" }
    )
}

/// Sidebar date, `Monday, August 25th` style.
pub fn date_line(now: NaiveDateTime) -> String {
    let day = now.day();
    format!(
        "{}, {} {}{}",
        now.format("%A"),
        now.format("%B"),
        day,
        ordinal_suffix(day)
    )
}

/// Start of the current day, for the "triaged today" tally.
pub fn midnight(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_hms_opt(0, 0, 0).expect("midnight exists")
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11 | 12 | 13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bolide_dependencies::chrono::{Duration, NaiveDate};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 9, 20)
            .unwrap()
            .and_hms_opt(15, 42, 0)
            .unwrap()
    }

    #[test]
    fn fresh_updates_say_just_now() {
        let now = base();
        assert_eq!(relative_time(now, now), "Just now");
        assert_eq!(relative_time(now - Duration::seconds(59), now), "Just now");
    }

    #[test]
    fn minute_buckets() {
        let now = base();
        assert_eq!(
            relative_time(now - Duration::minutes(1), now),
            "Few minutes ago"
        );
        assert_eq!(
            relative_time(now - Duration::minutes(4), now),
            "Few minutes ago"
        );
        assert_eq!(
            relative_time(now - Duration::minutes(5), now),
            "5 minutes ago"
        );
        assert_eq!(
            relative_time(now - Duration::minutes(59), now),
            "59 minutes ago"
        );
    }

    #[test]
    fn hour_buckets_floor_to_whole_hours() {
        let now = base();
        assert_eq!(relative_time(now - Duration::minutes(60), now), "1 hours ago");
        assert_eq!(
            relative_time(now - Duration::minutes(90), now),
            "1 hours ago"
        );
        assert_eq!(
            relative_time(now - Duration::minutes(60 * 23), now),
            "23 hours ago"
        );
    }

    #[test]
    fn yesterday_is_a_full_day_back() {
        let now = base();
        assert_eq!(relative_time(now - Duration::hours(24), now), "Yesterday");
        assert_eq!(relative_time(now - Duration::hours(47), now), "Yesterday");
    }

    #[test]
    fn recent_days_name_the_weekday() {
        let now = base();
        // 2023-09-17 was a Sunday
        assert_eq!(
            relative_time(now - Duration::days(3), now),
            "Last Sunday"
        );
        assert_eq!(
            relative_time(now - Duration::days(7), now),
            "Last Wednesday"
        );
    }

    #[test]
    fn everything_older_is_long_ago() {
        let now = base();
        assert_eq!(relative_time(now - Duration::days(8), now), "Long time ago");
        assert_eq!(
            relative_time(now - Duration::days(400), now),
            "Long time ago"
        );
    }

    #[test]
    fn clock_drops_the_leading_zero() {
        assert_eq!(clock_line(base()), "3:42pm");
        let morning = NaiveDate::from_ymd_opt(2023, 9, 20)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(clock_line(morning), "9:05am");
        let midnight = NaiveDate::from_ymd_opt(2023, 9, 20)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        assert_eq!(clock_line(midnight), "12:30am");
    }

    #[test]
    fn dates_carry_english_ordinals() {
        assert_eq!(date_line(base()), "Wednesday, September 20th");
        let first = NaiveDate::from_ymd_opt(2023, 9, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(date_line(first), "Friday, September 1st");
        let eleventh = NaiveDate::from_ymd_opt(2023, 9, 11)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(date_line(eleventh), "Monday, September 11th");
        let twenty_second = NaiveDate::from_ymd_opt(2023, 9, 22)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(date_line(twenty_second), "Friday, September 22nd");
    }

    #[test]
    fn midnight_truncates_the_clock() {
        let m = midnight(base());
        assert_eq!(m.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(m.date(), base().date());
    }
}
