pub mod client;
pub mod models;
pub mod query;
pub mod sync;
