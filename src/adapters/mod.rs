// Adapters layer: concrete implementations of the domain ports (model artifact
// on disk, ticket tables in memory or in a hosted Supabase project).

pub mod artifact_file;
pub mod memory;
pub mod supabase;

use crate::config::toml_config::{ModelConfig, StoreBackend, StoreConfig};
use crate::core::{ArtifactLoader, TicketStore};
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use std::sync::Arc;
use std::time::Duration;

pub use artifact_file::FileArtifactLoader;
pub use memory::InMemoryTicketStore;
pub use supabase::SupabaseTicketStore;

pub fn build_artifact_loader(config: &ModelConfig) -> Arc<dyn ArtifactLoader> {
    let mut loader = FileArtifactLoader::new(&config.path);
    if let Some(fallback) = &config.fallback_path {
        loader = loader.with_fallback(fallback);
    }
    Arc::new(loader)
}

pub fn build_ticket_store(config: &StoreConfig) -> Result<Arc<dyn TicketStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory ticket store; tickets are lost on restart");
            Ok(Arc::new(InMemoryTicketStore::new()))
        }
        StoreBackend::Supabase => {
            let url = validate_required_field("store.url", &config.url)?;
            let key = validate_required_field("store.key", &config.key)?;
            tracing::info!("Using Supabase ticket store at {}", url);
            Ok(Arc::new(SupabaseTicketStore::new(
                url,
                key,
                Duration::from_secs(config.timeout_seconds),
            )?))
        }
    }
}
