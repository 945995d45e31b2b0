//! Human-readable labels for prayer times and dates.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::prayer::parse_clock;

/// `"17:54"` → `"5:54 PM"`. Input that is not a clock time is returned as is.
pub fn format_time_12h(time: &str) -> String {
    match parse_clock(time) {
        Ok(t) => format_naive_12h(t),
        Err(_) => time.to_string(),
    }
}

fn format_naive_12h(t: NaiveTime) -> String {
    let (is_pm, hour) = t.hour12();
    format!("{hour}:{:02} {}", t.minute(), if is_pm { "PM" } else { "AM" })
}

/// Short relative label for the time left before a prayer.
///
/// Under an hour rounds minutes up so that "1m" is shown until the very end.
pub fn starts_in_label(seconds_remaining: i64) -> String {
    if seconds_remaining <= 0 {
        return "Starting now".to_string();
    }
    if seconds_remaining < 3600 {
        let minutes = (seconds_remaining + 59) / 60;
        return format!("Starts in {minutes}m");
    }
    format!(
        "Starts in {}h {}m",
        seconds_remaining / 3600,
        (seconds_remaining % 3600) / 60
    )
}

/// `Wednesday, 18 February`
pub fn today_label(day: NaiveDate) -> String {
    day.format("%A, %-d %B").to_string()
}

const HIJRI_MONTHS: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi' al-Awwal",
    "Rabi' al-Thani",
    "Jumada al-Awwal",
    "Jumada al-Thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

/// Tabular Islamic date for `day` (day, month index 1..=12, year).
///
/// Arithmetic calendar; may differ by a day from sighting-based calendars.
pub fn hijri_date(day: NaiveDate) -> (i64, usize, i64) {
    // Julian day number; 0001-01-01 is day 1 from CE.
    let jd = i64::from(day.num_days_from_ce()) + 1_721_425;

    let l = jd - 1_948_440 + 10_632;
    let n = (l - 1).div_euclid(10_631);
    let l = l - 10_631 * n + 354;
    let j = (10_985 - l).div_euclid(5_316) * (50 * l).div_euclid(17_719)
        + l.div_euclid(5_670) * (43 * l).div_euclid(15_238);
    let l = l - (30 - j).div_euclid(15) * (17_719 * j).div_euclid(50)
        - j.div_euclid(16) * (15_238 * j).div_euclid(43)
        + 29;
    let month = (24 * l).div_euclid(709);
    let day_of_month = l - (709 * month).div_euclid(24);
    let year = 30 * n + j - 30;

    (day_of_month, month.clamp(1, 12) as usize, year)
}

/// `1 Ramadan 1447 AH`
pub fn hijri_label(day: NaiveDate) -> String {
    let (d, m, y) = hijri_date(day);
    format!("{d} {} {y} AH", HIJRI_MONTHS[m - 1])
}
