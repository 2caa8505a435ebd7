pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod repository;
pub mod services;

pub use error::{SyncError, SyncResult};
