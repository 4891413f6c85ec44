use std::time::Duration;

use chrono::Utc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::features::contests::services::ContestService;

/// Periodically advance contest statuses so they change even when nobody
/// calls the update-statuses endpoint.
pub fn spawn_status_refresher(service: ContestService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match service.refresh_statuses(Utc::now()).await {
                Ok(summary) if !summary.changes.is_empty() || summary.skipped > 0 => {
                    tracing::info!(
                        activated = summary.activated,
                        completed = summary.completed,
                        skipped = summary.skipped,
                        "Scheduled status refresh applied"
                    );
                }
                Ok(_) => tracing::debug!("Scheduled status refresh found nothing due"),
                Err(e) => tracing::error!("Scheduled status refresh failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use storage::{
        dto::contest::CreateContestRequest,
        models::ContestStatus,
        repository::{ContestStore, MemoryContestStore, MemoryPostDirectory},
    };

    use super::*;
    use crate::events::EventBus;

    #[tokio::test]
    async fn refresher_advances_due_contests() {
        let store = Arc::new(MemoryContestStore::new());
        let service = ContestService::new(
            store.clone(),
            Arc::new(MemoryPostDirectory::new()),
            EventBus::new(4),
        );

        let now = Utc::now();
        let contest = CreateContestRequest {
            title: "Dawn".into(),
            description: "First light".into(),
            theme: "sunrise".into(),
            start_date: now + ChronoDuration::milliseconds(50),
            end_date: now + ChronoDuration::hours(1),
        }
        .into_contest(now);
        store.create(&contest).await.unwrap();
        assert_eq!(contest.status, ContestStatus::Upcoming);

        let handle = spawn_status_refresher(service, Duration::from_millis(20));

        let mut status = ContestStatus::Upcoming;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            status = store.find_by_id(contest.id).await.unwrap().unwrap().status;
            if status == ContestStatus::Active {
                break;
            }
        }
        handle.abort();

        assert_eq!(status, ContestStatus::Active);
    }
}
