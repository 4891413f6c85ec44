pub mod lifecycle;
pub mod listing;
pub mod ranking;
pub mod scoring;
