use crate::domain::model::{
    ClassificationResult, HistoryPage, LabelDistribution, NewTicket, RequesterId, TicketRecord,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A fitted text pipeline (vectorizer + classifier) queried at serve time.
pub trait DepartmentModel: Send + Sync {
    /// Closed set of labels the model can return.
    fn labels(&self) -> &[String];

    fn predict(&self, text: &str) -> String;

    fn predict_distribution(&self, text: &str) -> LabelDistribution;

    /// Label and confidence (the maximum posterior). Implementations that can
    /// score once should override this.
    fn classify(&self, text: &str) -> ClassificationResult {
        let label = self.predict(text);
        let confidence = self
            .predict_distribution(text)
            .values()
            .copied()
            .fold(0.0_f64, f64::max);
        ClassificationResult { label, confidence }
    }
}

/// Produces the model artifact. Called at most once per service instance.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DepartmentModel>>;

    /// Where the artifact comes from, for logs.
    fn describe(&self) -> String;
}

/// Append-only ticket persistence.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord>;

    /// Records for one requester, newest first.
    async fn query(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>>;
}

#[async_trait]
impl<T: TicketStore + ?Sized> TicketStore for Arc<T> {
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord> {
        (**self).insert(ticket).await
    }

    async fn query(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>> {
        (**self).query(requester_id, page).await
    }
}
