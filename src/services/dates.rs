//! Free-text date resolution for assistant queries.
//!
//! Accepts "today", "tomorrow", ISO dates, and day-first forms like "15/11"
//! or "15-11-2025" embedded in arbitrary text. Dates are resolved against
//! the cinema chain's local day, not the server's.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

pub fn resolve_query_date(input: Option<&str>, utc_offset_hours: i32) -> NaiveDate {
    resolve_at(input, utc_offset_hours, Utc::now())
}

fn local_today(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    now.with_timezone(&offset).date_naive()
}

fn resolve_at(input: Option<&str>, utc_offset_hours: i32, now: DateTime<Utc>) -> NaiveDate {
    let today = local_today(now, utc_offset_hours);

    let Some(raw) = input else { return today };
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return today;
    }

    if text.contains("today") {
        return today;
    }
    if text.contains("tomorrow") {
        return today + Duration::days(1);
    }

    // Pull the digit groups out of whatever surrounds them ("on 15/11 please").
    let groups: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();

    // Year-first: YYYY-MM-DD
    if groups.len() >= 3 && groups[0].len() == 4 {
        if let (Ok(y), Ok(m), Ok(d)) = (
            groups[0].parse::<i32>(),
            groups[1].parse::<u32>(),
            groups[2].parse::<u32>(),
        ) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return date;
            }
        }
    }

    // Day-first: DD-MM with an optional four-digit year
    if groups.len() >= 2 {
        let day = groups[0].parse::<u32>().ok();
        let month = groups[1].parse::<u32>().ok();
        let year = groups
            .get(2)
            .filter(|g| g.len() == 4)
            .and_then(|g| g.parse::<i32>().ok());

        if let (Some(d), Some(m)) = (day, month) {
            if let Some(date) = NaiveDate::from_ymd_opt(year.unwrap_or_else(|| today.year()), m, d)
            {
                // A past day-month with no explicit year means its next occurrence.
                if year.is_none() && date < today {
                    if let Some(next) = NaiveDate::from_ymd_opt(date.year() + 1, m, d) {
                        return next;
                    }
                }
                return date;
            }
        }
    }

    tracing::warn!("could not parse date string {:?}, falling back to today", raw);
    today
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const OFFSET: i32 = 7;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn missing_or_blank_input_means_today() {
        let now = at(2025, 11, 1, 5);
        assert_eq!(resolve_at(None, OFFSET, now), NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(
            resolve_at(Some("   "), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
    }

    #[test]
    fn today_respects_the_local_offset() {
        // 18:30 UTC is already the next day at UTC+7.
        let now = at(2025, 11, 1, 18);
        assert_eq!(
            resolve_at(Some("today"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()
        );
    }

    #[test]
    fn tomorrow_crosses_month_boundaries() {
        let now = at(2025, 11, 30, 5);
        assert_eq!(
            resolve_at(Some("tomorrow"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn iso_dates_parse_with_surrounding_text() {
        let now = at(2025, 11, 1, 5);
        assert_eq!(
            resolve_at(Some("on 2025-11-15 please"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()
        );
    }

    #[test]
    fn day_first_defaults_to_current_year() {
        let now = at(2025, 11, 1, 5);
        assert_eq!(
            resolve_at(Some("15/11"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()
        );
    }

    #[test]
    fn past_day_month_rolls_to_next_year() {
        let now = at(2025, 11, 20, 5);
        assert_eq!(
            resolve_at(Some("15-11"), OFFSET, now),
            NaiveDate::from_ymd_opt(2026, 11, 15).unwrap()
        );
    }

    #[test]
    fn explicit_year_is_never_rolled() {
        let now = at(2025, 11, 20, 5);
        assert_eq!(
            resolve_at(Some("15-11-2025"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()
        );
    }

    #[test]
    fn unparseable_input_falls_back_to_today() {
        let now = at(2025, 11, 1, 5);
        assert_eq!(
            resolve_at(Some("sometime soon"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
        // "10:00" looks like digits but is not a valid day-month
        assert_eq!(
            resolve_at(Some("10:00"), OFFSET, now),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
    }
}
