//! Topic bootstrap helpers shared by the services: the desired-topic model,
//! reconcilers for a self-managed Kafka cluster and for Upstash, settings
//! and the messaging handles.

pub mod config;
pub mod error;
pub mod kafka;
pub mod messaging;
pub mod topics;
pub mod upstash;

pub use error::{Result, SyncError};
