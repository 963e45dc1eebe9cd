pub mod messages;
pub mod models;
