use crate::adapters::{build_artifact_loader, build_ticket_store};
use crate::config::TriageConfig;
use crate::core::classification::ClassificationService;
use crate::core::ingestion::TicketIngestionFlow;
use crate::core::TicketStore;
use crate::utils::error::Result;
use std::sync::Arc;

pub type SharedFlow = TicketIngestionFlow<Arc<dyn TicketStore>>;

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<SharedFlow>,
}

impl AppState {
    pub fn new(flow: SharedFlow) -> Self {
        Self {
            flow: Arc::new(flow),
        }
    }

    /// Wire the classifier and ticket store described by `config`. The model
    /// is only loaded here when `model.preload` is set.
    pub async fn from_config(config: &TriageConfig) -> Result<Self> {
        let classifier = Arc::new(ClassificationService::new(build_artifact_loader(
            &config.model,
        )));
        let store = build_ticket_store(&config.store)?;

        if config.model.preload {
            classifier.preload().await?;
        }

        Ok(Self::new(TicketIngestionFlow::new(classifier, store)))
    }
}
