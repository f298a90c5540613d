pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod leagues;
pub mod row;
pub mod store;
