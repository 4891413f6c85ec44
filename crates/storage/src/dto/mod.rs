pub mod common;
pub mod contest;
