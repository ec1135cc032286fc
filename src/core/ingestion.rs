use crate::core::classification::ClassificationService;
use crate::domain::model::{HistoryPage, NewTicket, RequesterId, TicketRecord};
use crate::domain::ports::TicketStore;
use crate::utils::error::{Result, TriageError};
use crate::utils::validation::validate_non_empty_input;
use chrono::Utc;
use std::sync::Arc;

/// Store failures always surface as persistence errors, whatever the backend
/// reported.
fn as_persistence(err: TriageError) -> TriageError {
    match err {
        TriageError::Persistence { .. } => err,
        other => TriageError::persistence(other.to_string()),
    }
}

/// Classify-then-record flow for inbound tickets, plus history lookup.
pub struct TicketIngestionFlow<S: TicketStore> {
    classifier: Arc<ClassificationService>,
    store: S,
}

impl<S: TicketStore> TicketIngestionFlow<S> {
    pub fn new(classifier: Arc<ClassificationService>, store: S) -> Self {
        Self { classifier, store }
    }

    pub fn classifier(&self) -> &ClassificationService {
        &self.classifier
    }

    /// A ticket is only recorded once it has a label. Classification errors
    /// abort before any store call; store errors fail the whole submission.
    pub async fn submit(
        &self,
        requester_id: RequesterId,
        ticket_text: String,
    ) -> Result<TicketRecord> {
        validate_non_empty_input("user_id", requester_id.as_str())?;
        validate_non_empty_input("ticket_text", &ticket_text)?;

        let classification = self.classifier.classify(&ticket_text).await?;

        let ticket = NewTicket {
            requester_id,
            ticket_text,
            label: classification.label,
            confidence: classification.confidence,
            submitted_at: Utc::now(),
        };
        let (requester, label, confidence) = (
            ticket.requester_id.clone(),
            ticket.label.clone(),
            ticket.confidence,
        );

        match self.store.insert(ticket).await {
            Ok(record) => {
                tracing::info!(
                    "Recorded ticket {} for requester {} as {} ({:.3})",
                    record.ticket_id,
                    record.requester_id,
                    record.label,
                    record.confidence
                );
                Ok(record)
            }
            Err(e) => {
                tracing::error!(
                    "Discarding classification for requester {} ({} at {:.3}): ticket could not be persisted: {}",
                    requester,
                    label,
                    confidence,
                    e
                );
                Err(as_persistence(e))
            }
        }
    }

    /// Newest first. `page == None` returns the full history.
    pub async fn history(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>> {
        validate_non_empty_input("user_id", requester_id.as_str())?;

        let records = self
            .store
            .query(requester_id, page)
            .await
            .map_err(as_persistence)?;

        tracing::debug!(
            "Fetched {} history records for requester {}",
            records.len(),
            requester_id
        );
        Ok(records)
    }
}
