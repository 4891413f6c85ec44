mod contest;
mod post;

pub use contest::{Contest, ContestStatus, Entry, Vote, Winner};
pub use post::PostSummary;
