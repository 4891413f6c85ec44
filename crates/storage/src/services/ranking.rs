use std::cmp::Ordering;

use crate::models::{Entry, Winner};

/// Number of winner slots awarded per contest.
pub const WINNER_SLOTS: usize = 3;

fn by_score_desc(a: &Entry, b: &Entry) -> Ordering {
    b.relevancy_score.total_cmp(&a.relevancy_score)
}

/// Entries ordered by relevancy score, highest first. Ties keep submission
/// order.
pub fn ranked_entries(entries: &[Entry]) -> Vec<&Entry> {
    let mut ranked: Vec<&Entry> = entries.iter().collect();
    ranked.sort_by(|a, b| by_score_desc(a, b));
    ranked
}

/// Snapshot the top entries as winners, ranked from 1.
pub fn rank_winners(entries: &[Entry]) -> Vec<Winner> {
    ranked_entries(entries)
        .into_iter()
        .take(WINNER_SLOTS)
        .zip(1..)
        .map(|(entry, rank)| Winner {
            rank,
            user_id: entry.user_id.clone(),
            username: entry.username.clone(),
            post_id: entry.post_id,
            relevancy_score: entry.relevancy_score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(user: &str, score: f64) -> Entry {
        let mut entry = Entry::new(user.into(), user.to_uppercase(), Uuid::new_v4(), Utc::now());
        entry.relevancy_score = score;
        entry
    }

    #[test]
    fn ties_keep_submission_order_and_only_top_three_win() {
        let entries = vec![
            entry("a", 7.0),
            entry("b", 9.0),
            entry("c", 9.0),
            entry("d", 3.0),
        ];

        let winners = rank_winners(&entries);

        let ranked: Vec<(u32, &str, f64)> = winners
            .iter()
            .map(|w| (w.rank, w.user_id.as_str(), w.relevancy_score))
            .collect();
        assert_eq!(ranked, vec![(1, "b", 9.0), (2, "c", 9.0), (3, "a", 7.0)]);
        assert_eq!(winners[0].post_id, entries[1].post_id);
        assert_eq!(winners[0].username, "B");
    }

    #[test]
    fn fewer_entries_than_slots() {
        let entries = vec![entry("solo", 8.0)];
        let winners = rank_winners(&entries);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].rank, 1);

        assert!(rank_winners(&[]).is_empty());
    }

    #[test]
    fn ranking_does_not_reorder_source() {
        let entries = vec![entry("low", 1.0), entry("high", 10.0)];
        let ranked = ranked_entries(&entries);

        assert_eq!(ranked[0].user_id, "high");
        assert_eq!(entries[0].user_id, "low");
    }
}
