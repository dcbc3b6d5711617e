//! Schedule grammar and eligibility.
//!
//! Grammar: `daily`, `weekly`, `weekly(<day>)`, `monthly`, `monthly(<day>)`,
//! `never`. Bare `weekly` means Sunday and bare `monthly` the 1st.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::ScheduleRule;

static CALL_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(weekly|monthly)\s*\(\s*([^)]*?)\s*\)$").unwrap());

/// Longest gap worth scanning day by day; any rule fires within it.
const MAX_SCAN_DAYS: i64 = 62;

/// Parse a schedule string. Returns `None` for anything outside the grammar.
pub fn parse_schedule(value: &str) -> Option<ScheduleRule> {
    let value = value.trim().to_lowercase();

    match value.as_str() {
        "" | "never" => return Some(ScheduleRule::Never),
        "daily" => return Some(ScheduleRule::Daily),
        "weekly" => return Some(ScheduleRule::Weekly(Weekday::Sun)),
        "monthly" => return Some(ScheduleRule::Monthly(1)),
        _ => {}
    }

    let caps = CALL_FORM.captures(&value)?;
    let arg = caps.get(2)?.as_str();
    match caps.get(1)?.as_str() {
        "weekly" => parse_weekday(arg).map(ScheduleRule::Weekly),
        "monthly" => arg
            .parse::<u32>()
            .ok()
            .filter(|day| (1..=31).contains(day))
            .map(ScheduleRule::Monthly),
        _ => None,
    }
}

fn parse_weekday(value: &str) -> Option<Weekday> {
    let day = match value {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Whether `date` is a day the rule fires on.
pub fn fires_on(rule: ScheduleRule, date: NaiveDate) -> bool {
    match rule {
        ScheduleRule::Daily => true,
        ScheduleRule::Never => false,
        ScheduleRule::Weekly(day) => date.weekday() == day,
        ScheduleRule::Monthly(day) => date.day() == day.min(days_in_month(date)),
    }
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Whether a collection is eligible for re-evaluation at `now`.
///
/// Eligible when the rule fires on some calendar day after the last run's day
/// up to and including today. Without a previous run, eligible when the rule
/// fires today.
pub fn is_due(rule: ScheduleRule, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();

    let Some(last_run) = last_run else {
        return fires_on(rule, today);
    };

    let last_day = last_run.date_naive();
    if last_day >= today {
        return false;
    }

    match rule {
        ScheduleRule::Never => false,
        ScheduleRule::Daily => true,
        _ => {
            if (today - last_day).num_days() > MAX_SCAN_DAYS {
                return true;
            }
            let mut day = last_day + Duration::days(1);
            while day <= today {
                if fires_on(rule, day) {
                    return true;
                }
                day += Duration::days(1);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_grammar() {
        assert_eq!(parse_schedule("daily"), Some(ScheduleRule::Daily));
        assert_eq!(parse_schedule(" Never "), Some(ScheduleRule::Never));
        assert_eq!(
            parse_schedule("weekly(sunday)"),
            Some(ScheduleRule::Weekly(Weekday::Sun))
        );
        assert_eq!(
            parse_schedule("Weekly( Friday )"),
            Some(ScheduleRule::Weekly(Weekday::Fri))
        );
        assert_eq!(parse_schedule("weekly"), Some(ScheduleRule::Weekly(Weekday::Sun)));
        assert_eq!(parse_schedule("monthly(15)"), Some(ScheduleRule::Monthly(15)));
        assert_eq!(parse_schedule("monthly"), Some(ScheduleRule::Monthly(1)));
    }

    #[test]
    fn test_parse_rejects_unknown_grammar() {
        assert_eq!(parse_schedule("hourly"), None);
        assert_eq!(parse_schedule("weekly(someday)"), None);
        assert_eq!(parse_schedule("monthly(0)"), None);
        assert_eq!(parse_schedule("monthly(32)"), None);
        assert_eq!(parse_schedule("monthly(first)"), None);
        assert_eq!(parse_schedule("daily(3)"), None);
    }

    #[test]
    fn test_weekly_sunday_not_due_before_sunday() {
        // 2024-06-03 is a Monday, 2024-06-08 the following Saturday.
        let rule = ScheduleRule::Weekly(Weekday::Sun);
        assert!(!is_due(rule, Some(at(2024, 6, 3)), at(2024, 6, 8)));
    }

    #[test]
    fn test_weekly_sunday_due_on_sunday() {
        let rule = ScheduleRule::Weekly(Weekday::Sun);
        assert!(is_due(rule, Some(at(2024, 6, 3)), at(2024, 6, 9)));
    }

    #[test]
    fn test_weekly_due_when_sunday_was_missed() {
        let rule = ScheduleRule::Weekly(Weekday::Sun);
        // Last run Monday 3rd, now Tuesday 11th: Sunday 9th was skipped.
        assert!(is_due(rule, Some(at(2024, 6, 3)), at(2024, 6, 11)));
    }

    #[test]
    fn test_daily_not_due_twice_same_day() {
        let now = at(2024, 6, 3);
        assert!(!is_due(ScheduleRule::Daily, Some(now), now));
        assert!(is_due(ScheduleRule::Daily, Some(now), at(2024, 6, 4)));
    }

    #[test]
    fn test_never_is_never_due() {
        assert!(!is_due(ScheduleRule::Never, None, at(2024, 6, 3)));
        assert!(!is_due(ScheduleRule::Never, Some(at(2020, 1, 1)), at(2024, 6, 3)));
    }

    #[test]
    fn test_first_run_uses_today() {
        let rule = ScheduleRule::Monthly(1);
        assert!(is_due(rule, None, at(2024, 6, 1)));
        assert!(!is_due(rule, None, at(2024, 6, 2)));
        assert!(is_due(ScheduleRule::Daily, None, at(2024, 6, 2)));
    }

    #[test]
    fn test_monthly_clamps_to_short_months() {
        let rule = ScheduleRule::Monthly(31);
        let feb_last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert!(fires_on(rule, feb_last));
        assert!(is_due(rule, Some(at(2024, 2, 20)), at(2024, 2, 29)));
        assert!(!is_due(rule, Some(at(2024, 2, 1)), at(2024, 2, 28)));
    }

    #[test]
    fn test_long_gap_is_due() {
        let rule = ScheduleRule::Monthly(15);
        assert!(is_due(rule, Some(at(2023, 1, 16)), at(2024, 6, 2)));
    }
}
