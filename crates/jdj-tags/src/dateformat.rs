//! Django-style date formatting.
//!
//! Implements the format characters of Django's `date` filter and `{% now %}`
//! tag (`Y`, `n`, `j`, `N`, `P`, ...) on top of chrono. A backslash escapes
//! the next character. Unknown characters are copied through.

use std::fmt::Write;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

/// Django's default `DATETIME_FORMAT`.
pub const DATETIME_FORMAT: &str = "N j, Y, P";

/// Django's default `DATE_FORMAT`.
pub const DATE_FORMAT: &str = "N j, Y";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Associated Press style abbreviations used by `N`.
const MONTHS_AP: [&str; 12] = [
    "Jan.", "Feb.", "March", "April", "May", "June", "July", "Aug.", "Sept.", "Oct.", "Nov.",
    "Dec.",
];

/// Formats `dt` according to a Django date format string.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use jdj_tags::dateformat::format;
///
/// let dt = FixedOffset::east_opt(-3 * 3600)
///     .unwrap()
///     .with_ymd_and_hms(2000, 10, 1, 11, 10, 12)
///     .unwrap();
/// assert_eq!(format(&dt, "N j, Y, P"), "Oct. 1, 2000, 11:10 a.m.");
/// assert_eq!(format(&dt, "Y-m-d H:i"), "2000-10-01 11:10");
/// ```
pub fn format(dt: &DateTime<FixedOffset>, format: &str) -> String {
    let mut result = String::new();
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        match ch {
            // Day
            'd' => push2(&mut result, dt.day()),
            'j' => push(&mut result, dt.day()),
            'D' => result.push_str(&dt.format("%a").to_string()),
            'l' => result.push_str(&dt.format("%A").to_string()),
            'w' => push(&mut result, dt.weekday().num_days_from_sunday()),
            'z' => push(&mut result, dt.ordinal()),
            'S' => result.push_str(ordinal_suffix(dt.day())),
            // Month
            'm' => push2(&mut result, dt.month()),
            'n' => push(&mut result, dt.month()),
            'F' => result.push_str(MONTHS[dt.month0() as usize]),
            'M' => result.push_str(&dt.format("%b").to_string()),
            'b' => result.push_str(&dt.format("%b").to_string().to_lowercase()),
            'N' => result.push_str(MONTHS_AP[dt.month0() as usize]),
            // Year
            'Y' => {
                let _ = write!(result, "{:04}", dt.year());
            }
            'y' => push2(&mut result, dt.year().rem_euclid(100).unsigned_abs()),
            'L' => result.push_str(if is_leap(dt.year()) { "True" } else { "False" }),
            // Time
            'H' => push2(&mut result, dt.hour()),
            'G' => push(&mut result, dt.hour()),
            'h' => push2(&mut result, hour12(dt.hour())),
            'g' => push(&mut result, hour12(dt.hour())),
            'i' => push2(&mut result, dt.minute()),
            's' => push2(&mut result, dt.second()),
            'u' => {
                let _ = write!(result, "{:06}", dt.nanosecond() / 1000);
            }
            'a' => result.push_str(if dt.hour() < 12 { "a.m." } else { "p.m." }),
            'A' => result.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            'f' => result.push_str(&short_time(dt)),
            'P' => result.push_str(&match (dt.hour(), dt.minute()) {
                (0, 0) => "midnight".to_string(),
                (12, 0) => "noon".to_string(),
                (h, _) => format!("{} {}", short_time(dt), if h < 12 { "a.m." } else { "p.m." }),
            }),
            // Time zone
            'O' => result.push_str(&dt.format("%z").to_string()),
            'Z' => push(&mut result, dt.offset().local_minus_utc()),
            // Full date/time
            'c' => result.push_str(&dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()),
            'r' => result.push_str(&dt.format("%a, %d %b %Y %H:%M:%S %z").to_string()),
            'U' => push(&mut result, dt.timestamp()),
            '\\' => {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

fn push(out: &mut String, value: impl std::fmt::Display) {
    let _ = write!(out, "{value}");
}

fn push2(out: &mut String, value: u32) {
    let _ = write!(out, "{value:02}");
}

const fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn short_time(dt: &DateTime<FixedOffset>) -> String {
    let hour = hour12(dt.hour());
    match dt.minute() {
        0 => hour.to_string(),
        minute => format!("{hour}:{minute:02}"),
    }
}

const fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

const fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 2, 3, h, m, 5)
            .unwrap()
    }

    #[test]
    fn test_numeric_parts() {
        assert_eq!(format(&at(9, 7), "Y-m-d H:i:s"), "2024-02-03 09:07:05");
        assert_eq!(format(&at(9, 7), "y n j G"), "24 2 3 9");
    }

    #[test]
    fn test_names() {
        assert_eq!(format(&at(9, 7), "F N M D l"), "February Feb. Feb Sat Saturday");
        assert_eq!(format(&at(9, 7), "jS"), "3rd");
    }

    #[test]
    fn test_twelve_hour_forms() {
        assert_eq!(format(&at(0, 0), "P"), "midnight");
        assert_eq!(format(&at(12, 0), "P"), "noon");
        assert_eq!(format(&at(15, 0), "P"), "3 p.m.");
        assert_eq!(format(&at(15, 30), "P"), "3:30 p.m.");
        assert_eq!(format(&at(0, 30), "g:i A"), "12:30 AM");
        assert_eq!(format(&at(9, 0), "f a"), "9 a.m.");
    }

    #[test]
    fn test_timezone_parts() {
        assert_eq!(format(&at(9, 7), "O Z"), "+0100 3600");
        assert_eq!(format(&at(9, 7), "c"), "2024-02-03T09:07:05+01:00");
    }

    #[test]
    fn test_escapes_and_literals() {
        assert_eq!(format(&at(9, 7), r"\Y\e\a\r: Y"), "Year: 2024");
        assert_eq!(format(&at(9, 7), "-/ ,"), "-/ ,");
    }

    #[test]
    fn test_default_datetime_format() {
        assert_eq!(format(&at(14, 10), DATETIME_FORMAT), "Feb. 3, 2024, 2:10 p.m.");
        assert_eq!(format(&at(14, 10), DATE_FORMAT), "Feb. 3, 2024");
    }

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(13), "th");
        assert!(is_leap(2000));
        assert!(!is_leap(1900));
    }
}
