use serde::Serialize;
use storage::models::ContestStatus;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Notifications published by the contest service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ContestEvent {
    StatusChanged {
        contest_id: Uuid,
        title: String,
        from: ContestStatus,
        to: ContestStatus,
    },
    EntrySubmitted {
        contest_id: Uuid,
        entry_id: Uuid,
        user_id: String,
    },
    VoteCast {
        contest_id: Uuid,
        entry_id: Uuid,
        entry_owner: String,
        voter_id: String,
        new_score: f64,
    },
    WinnersAnnounced {
        contest_id: Uuid,
        winners: Vec<String>,
    },
}

impl ContestEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "statusChanged",
            Self::EntrySubmitted { .. } => "entrySubmitted",
            Self::VoteCast { .. } => "voteCast",
            Self::WinnersAnnounced { .. } => "winnersAnnounced",
        }
    }
}

/// Broadcast handle shared by everything that publishes or streams contest
/// events. Created once at startup; the channel closes when the last clone is
/// dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ContestEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ContestEvent) {
        // An error only means nobody is listening right now.
        if self.sender.send(event).is_err() {
            tracing::trace!("Contest event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContestEvent> {
        self.sender.subscribe()
    }
}
