use std::cmp::Ordering;

use crate::models::{Contest, ContestStatus};

fn status_order(status: ContestStatus) -> u8 {
    match status {
        ContestStatus::Active => 0,
        ContestStatus::Upcoming => 1,
        ContestStatus::Completed => 2,
    }
}

/// Active before upcoming before completed. Open contests are ordered by
/// start date ascending, completed ones by end date descending.
pub fn listing_order(a: &Contest, b: &Contest) -> Ordering {
    status_order(a.status)
        .cmp(&status_order(b.status))
        .then_with(|| match a.status {
            ContestStatus::Completed => b.end_date.cmp(&a.end_date),
            _ => a.start_date.cmp(&b.start_date),
        })
}

pub fn sort_for_listing(contests: &mut [Contest]) {
    contests.sort_by(listing_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn contest(title: &str, start: i64, end: i64, now: i64) -> Contest {
        Contest::new(
            title.into(),
            String::new(),
            String::new(),
            at(start),
            at(end),
            at(now),
        )
    }

    #[test]
    fn groups_by_status_then_orders_by_dates() {
        let mut contests = vec![
            contest("old-completed", 0, 1, 100),
            contest("late-upcoming", 300, 400, 100),
            contest("recent-completed", 10, 20, 100),
            contest("active", 50, 200, 100),
            contest("soon-upcoming", 150, 160, 100),
        ];

        sort_for_listing(&mut contests);

        let titles: Vec<&str> = contests.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "active",
                "soon-upcoming",
                "late-upcoming",
                "recent-completed",
                "old-completed"
            ]
        );
    }
}
