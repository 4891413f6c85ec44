//! Contest status transitions.
//!
//! A contest moves `upcoming -> active -> completed` and never backwards.
//! The stored status is only advanced by [`refresh`]-style callers; nothing
//! here reads the clock.

use chrono::{DateTime, Utc};

use crate::models::{Contest, ContestStatus};

/// Status implied by the contest window at `now`. Both bounds are inclusive
/// for `Active`.
pub fn derive_status(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ContestStatus {
    if now < start {
        ContestStatus::Upcoming
    } else if now <= end {
        ContestStatus::Active
    } else {
        ContestStatus::Completed
    }
}

/// One forward step, or `None` if no boundary has been crossed.
pub fn advance_status(
    status: ContestStatus,
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<ContestStatus> {
    match status {
        ContestStatus::Upcoming if now >= start => Some(ContestStatus::Active),
        ContestStatus::Active if now >= end => Some(ContestStatus::Completed),
        _ => None,
    }
}

/// Whether a refresh at `now` would change this contest's status.
pub fn is_due_for_refresh(contest: &Contest, now: DateTime<Utc>) -> bool {
    match contest.status {
        ContestStatus::Upcoming => contest.start_date <= now,
        ContestStatus::Active => contest.end_date <= now,
        ContestStatus::Completed => false,
    }
}

/// Advance `contest` as far as `now` allows. Returns the original status when
/// something changed.
///
/// Applies [`advance_status`] until it settles, so a contest whose refresh
/// was delayed past its end goes straight to `Completed`.
pub fn refresh(contest: &mut Contest, now: DateTime<Utc>) -> Option<ContestStatus> {
    let original = contest.status;

    while let Some(next) = advance_status(contest.status, now, contest.start_date, contest.end_date)
    {
        contest.status = next;
    }

    (contest.status != original).then_some(original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn contest_created_at(now: DateTime<Utc>) -> Contest {
        Contest::new(
            "Dreamscapes".into(),
            "Surreal landscapes".into(),
            "surreal".into(),
            t0(),
            t0() + Duration::hours(1),
            now,
        )
    }

    #[test]
    fn derive_status_respects_inclusive_window() {
        let start = t0();
        let end = t0() + Duration::hours(1);
        let cases = [
            (start - Duration::seconds(1), ContestStatus::Upcoming),
            (start, ContestStatus::Active),
            (start + Duration::minutes(30), ContestStatus::Active),
            (end, ContestStatus::Active),
            (end + Duration::seconds(1), ContestStatus::Completed),
        ];

        for (now, expected) in cases {
            assert_eq!(derive_status(now, start, end), expected, "at {now}");
        }
    }

    #[test]
    fn advance_moves_one_step_at_a_time() {
        let start = t0();
        let end = t0() + Duration::hours(1);
        let late = end + Duration::hours(1);

        assert_eq!(
            advance_status(ContestStatus::Upcoming, late, start, end),
            Some(ContestStatus::Active)
        );
        assert_eq!(
            advance_status(ContestStatus::Active, late, start, end),
            Some(ContestStatus::Completed)
        );
        assert_eq!(advance_status(ContestStatus::Completed, late, start, end), None);
        assert_eq!(
            advance_status(ContestStatus::Upcoming, start - Duration::seconds(1), start, end),
            None
        );
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut contest = contest_created_at(t0() - Duration::minutes(1));
        let now = t0() + Duration::minutes(1);

        assert_eq!(refresh(&mut contest, now), Some(ContestStatus::Upcoming));
        assert_eq!(contest.status, ContestStatus::Active);
        assert_eq!(refresh(&mut contest, now), None);
        assert_eq!(contest.status, ContestStatus::Active);
    }

    #[test]
    fn delayed_refresh_completes_upcoming_contest_in_one_call() {
        let mut contest = contest_created_at(t0() - Duration::minutes(1));
        let now = t0() + Duration::hours(3);

        assert!(is_due_for_refresh(&contest, now));
        assert_eq!(refresh(&mut contest, now), Some(ContestStatus::Upcoming));
        assert_eq!(contest.status, ContestStatus::Completed);
        assert!(!is_due_for_refresh(&contest, now));
    }

    #[test]
    fn status_never_regresses_for_non_decreasing_time() {
        let mut contest = contest_created_at(t0() - Duration::hours(1));
        let mut previous = contest.status;

        for minutes in [-30, -1, 0, 1, 59, 60, 61, 120, 120, 600] {
            refresh(&mut contest, t0() + Duration::minutes(minutes));
            assert!(
                rank(contest.status) >= rank(previous),
                "{previous} regressed to {}",
                contest.status
            );
            previous = contest.status;
        }
        assert_eq!(contest.status, ContestStatus::Completed);
    }

    #[test]
    fn refresh_never_reopens_completed_contest() {
        let mut contest = contest_created_at(t0() + Duration::hours(2));
        assert_eq!(contest.status, ContestStatus::Completed);

        assert_eq!(refresh(&mut contest, t0() - Duration::hours(5)), None);
        assert_eq!(contest.status, ContestStatus::Completed);
    }

    fn rank(status: ContestStatus) -> u8 {
        match status {
            ContestStatus::Upcoming => 0,
            ContestStatus::Active => 1,
            ContestStatus::Completed => 2,
        }
    }
}
