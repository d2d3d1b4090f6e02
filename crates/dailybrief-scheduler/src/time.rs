use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

/// Compute the next fire instant for a daily HH:MM delivery time.
///
/// Builds the candidate at `hours:minutes:00.000` on `now`'s calendar date
/// in the reference zone `tz`. If that instant is strictly after `now` it is
/// returned; otherwise the same wall-clock time on the following date.
/// Exact equality with `now` counts as "already passed" so a fire landing
/// precisely on the boundary can never double-arm the same instant.
///
/// Pure — no clock reads, no side effects. `hours`/`minutes` are treated as
/// already validated (0–23 / 0–59); out-of-range input yields `None`, which
/// callers surface as a scheduling error rather than a panic.
pub fn next_fire_instant(
    hours: u8,
    minutes: u8,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&tz);
    let candidate_naive = local_now
        .date_naive()
        .and_hms_opt(u32::from(hours), u32::from(minutes), 0)?;
    // A fixed offset has no gaps or folds, so the projection is unambiguous.
    let candidate = tz
        .from_local_datetime(&candidate_naive)
        .single()?
        .with_timezone(&Utc);

    if candidate > now {
        Some(candidate)
    } else {
        // Today's window has passed — advance to tomorrow.
        Some(candidate + Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn utc0() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn before_delivery_time_schedules_today() {
        // 17:00, preference 18:00 → today at 18:00.
        let now = utc("2025-03-10T17:00:00Z");
        let next = next_fire_instant(18, 0, now, utc0()).unwrap();
        assert_eq!(next, utc("2025-03-10T18:00:00Z"));
    }

    #[test]
    fn after_delivery_time_schedules_tomorrow() {
        // 19:00, preference 18:00 → tomorrow at 18:00.
        let now = utc("2025-03-10T19:00:00Z");
        let next = next_fire_instant(18, 0, now, utc0()).unwrap();
        assert_eq!(next, utc("2025-03-11T18:00:00Z"));
    }

    #[test]
    fn exact_boundary_advances_a_day() {
        let now = utc("2025-03-10T18:00:00Z");
        let next = next_fire_instant(18, 0, now, utc0()).unwrap();
        assert_eq!(next, utc("2025-03-11T18:00:00Z"));
    }

    #[test]
    fn one_second_before_boundary_is_still_today() {
        let now = utc("2025-03-10T17:59:59Z");
        let next = next_fire_instant(18, 0, now, utc0()).unwrap();
        assert_eq!(next, utc("2025-03-10T18:00:00Z"));
    }

    #[test]
    fn one_second_after_boundary_is_tomorrow() {
        let now = utc("2025-03-10T18:00:01Z");
        let next = next_fire_instant(18, 0, now, utc0()).unwrap();
        assert_eq!(next, utc("2025-03-11T18:00:00Z"));
    }

    #[test]
    fn result_is_strictly_future_and_within_a_day() {
        let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
        for hours in [0u8, 6, 12, 18, 23] {
            for minutes in [0u8, 30, 59] {
                let now = utc("2025-06-15T13:47:21Z");
                let next = next_fire_instant(hours, minutes, now, tz).unwrap();
                assert!(next > now, "{hours}:{minutes} not in the future");
                assert!(
                    next - now <= Duration::days(1),
                    "{hours}:{minutes} more than 24h out"
                );
            }
        }
    }

    #[test]
    fn honours_the_reference_offset() {
        // 18:00 in UTC-5 is 23:00 UTC.
        let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
        let now = utc("2025-03-10T20:00:00Z"); // 15:00 local
        let next = next_fire_instant(18, 0, now, tz).unwrap();
        assert_eq!(next, utc("2025-03-10T23:00:00Z"));
    }

    #[test]
    fn offset_can_roll_the_calendar_date() {
        // 01:00 local in UTC+10 on 2025-03-11 is 15:00 UTC on 2025-03-10.
        let tz = FixedOffset::east_opt(10 * 3600).unwrap();
        let now = utc("2025-03-10T16:00:00Z"); // 02:00 local on the 11th
        let next = next_fire_instant(1, 0, now, tz).unwrap();
        assert_eq!(next, utc("2025-03-11T15:00:00Z"));
        assert_eq!(next.with_timezone(&tz).hour(), 1);
    }

    #[test]
    fn seconds_are_zeroed() {
        let now = utc("2025-03-10T09:15:43Z");
        let next = next_fire_instant(9, 30, now, utc0()).unwrap();
        assert_eq!(next.second(), 0);
        assert_eq!(next, utc("2025-03-10T09:30:00Z"));
    }

    #[test]
    fn out_of_range_input_is_none() {
        let now = utc("2025-03-10T09:15:43Z");
        assert!(next_fire_instant(24, 0, now, utc0()).is_none());
        assert!(next_fire_instant(12, 60, now, utc0()).is_none());
    }
}
