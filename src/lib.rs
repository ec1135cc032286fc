pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::TriageConfig;

pub use api::{router, AppState};
pub use crate::core::{classification::ClassificationService, ingestion::TicketIngestionFlow};
pub use utils::error::{Result, TriageError};
