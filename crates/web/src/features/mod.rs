pub mod admin;
pub mod contests;
