//! Business-hours evaluation.
//!
//! Rules are keyed by weekday name. English and Portuguese names are both
//! accepted, case-insensitively, with or without the `-feira` suffix.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};

use flowdesk_core::catalogue::{DayRule, ScheduleGroup};

/// Map a rule key to a weekday.
pub fn parse_day_name(name: &str) -> Option<Weekday> {
    let lower = name.trim().to_lowercase();
    let key = lower.strip_suffix("-feira").unwrap_or(&lower);
    let day = match key {
        "monday" | "mon" | "segunda" | "seg" => Weekday::Mon,
        "tuesday" | "tue" | "terça" | "terca" | "ter" => Weekday::Tue,
        "wednesday" | "wed" | "quarta" | "qua" => Weekday::Wed,
        "thursday" | "thu" | "quinta" | "qui" => Weekday::Thu,
        "friday" | "fri" | "sexta" | "sex" => Weekday::Fri,
        "saturday" | "sat" | "sábado" | "sabado" | "sab" => Weekday::Sat,
        "sunday" | "sun" | "domingo" | "dom" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Find the rule configured for `day`, if any.
pub fn rule_for(group: &ScheduleGroup, day: Weekday) -> Option<&DayRule> {
    group
        .rules
        .iter()
        .find(|(name, _)| parse_day_name(name) == Some(day))
        .map(|(_, rule)| rule)
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Whether the local time `now` falls inside an active window of `group`.
///
/// The clock is compared at minute precision and both ends are inclusive.
/// Missing rules, inactive days and unparseable times count as closed.
pub fn is_open(group: &ScheduleGroup, now: NaiveDateTime) -> bool {
    let Some(rule) = rule_for(group, now.weekday()) else {
        return false;
    };
    if !rule.active {
        return false;
    }
    let (Some(start), Some(end)) = (parse_clock(&rule.start), parse_clock(&rule.end)) else {
        return false;
    };
    let clock = now.time().with_second(0).and_then(|t| t.with_nanosecond(0));
    match clock {
        Some(clock) => clock >= start && clock <= end,
        None => false,
    }
}

/// Convert UTC to the desk's local clock.
pub fn local_time(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDateTime {
    now.naive_utc() + Duration::hours(i64::from(utc_offset_hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn group() -> ScheduleGroup {
        ScheduleGroup::new("s1", "Comercial")
            .with_rule("Monday", DayRule::open("08:00", "18:00"))
            .with_rule("Sunday", DayRule::closed())
    }

    // 2024-01-01 was a Monday, 2024-01-07 a Sunday.
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_inside_and_outside_window() {
        let g = group();
        assert!(is_open(&g, at(1, 9, 0)));
        assert!(!is_open(&g, at(1, 19, 0)));
        assert!(!is_open(&g, at(7, 9, 0)));
    }

    #[test]
    fn test_bounds_are_inclusive_at_minute_precision() {
        let g = group();
        assert!(is_open(&g, at(1, 8, 0)));
        assert!(is_open(&g, at(1, 18, 0)));
        let late = at(1, 18, 0) + Duration::seconds(59);
        assert!(is_open(&g, late));
        assert!(!is_open(&g, at(1, 18, 1)));
        assert!(!is_open(&g, at(1, 7, 59)));
    }

    #[test]
    fn test_missing_day_is_closed() {
        // Tuesday has no rule.
        assert!(!is_open(&group(), at(2, 10, 0)));
    }

    #[test]
    fn test_portuguese_day_names() {
        let g = ScheduleGroup::new("s2", "Suporte")
            .with_rule("Terça", DayRule::open("10:00", "12:00"))
            .with_rule("sábado", DayRule::open("09:00", "13:00"));
        assert!(is_open(&g, at(2, 11, 30)));
        assert!(is_open(&g, at(6, 9, 0)));
        assert_eq!(parse_day_name("Quarta-feira"), Some(Weekday::Wed));
        assert_eq!(parse_day_name("Feriado"), None);
    }

    #[test]
    fn test_bad_clock_is_closed() {
        let g = ScheduleGroup::new("s3", "Broken").with_rule("monday", DayRule::open("8h", "18:00"));
        assert!(!is_open(&g, at(1, 9, 0)));
    }

    #[test]
    fn test_local_time_offset() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 2, 1, 30, 0).unwrap();
        let local = local_time(utc, -3);
        assert_eq!(local, at(1, 22, 30));
    }
}
