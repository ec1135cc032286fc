use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticket_triage::adapters::InMemoryTicketStore;
use ticket_triage::core::{ArtifactLoader, DepartmentModel, NewTicket, TicketRecord, TicketStore};
use ticket_triage::domain::model::{HistoryPage, LabelDistribution, RequesterId};
use ticket_triage::utils::error::ErrorCategory;
use ticket_triage::{ClassificationService, Result, TicketIngestionFlow, TriageError};

/// Always answers Billing with 0.92.
struct BillingModel {
    labels: Vec<String>,
}

impl DepartmentModel for BillingModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, _text: &str) -> String {
        "Billing".to_string()
    }

    fn predict_distribution(&self, _text: &str) -> LabelDistribution {
        [
            ("Billing".to_string(), 0.92),
            ("Technical".to_string(), 0.05),
            ("Account".to_string(), 0.03),
        ]
        .into_iter()
        .collect()
    }
}

struct BillingLoader;

#[async_trait]
impl ArtifactLoader for BillingLoader {
    async fn load(&self) -> Result<Arc<dyn DepartmentModel>> {
        Ok(Arc::new(BillingModel {
            labels: vec![
                "Billing".to_string(),
                "Technical".to_string(),
                "Account".to_string(),
            ],
        }))
    }

    fn describe(&self) -> String {
        "billing-stub".to_string()
    }
}

/// In-memory store that records how often it was called and can be told to
/// fail inserts.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryTicketStore,
    inserts: AtomicUsize,
    queries: AtomicUsize,
    fail_inserts: bool,
}

impl RecordingStore {
    fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst) + self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketStore for RecordingStore {
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(TriageError::persistence("503 Service Unavailable"));
        }
        self.inner.insert(ticket).await
    }

    async fn query(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(requester_id, page).await
    }
}

fn flow_with(store: Arc<RecordingStore>) -> TicketIngestionFlow<Arc<RecordingStore>> {
    let classifier = Arc::new(ClassificationService::new(Arc::new(BillingLoader)));
    TicketIngestionFlow::new(classifier, store)
}

#[tokio::test]
async fn test_submit_then_history_end_to_end() {
    let store = Arc::new(RecordingStore::default());
    let flow = flow_with(store.clone());

    let record = flow
        .submit(RequesterId::new("u1"), "My invoice is wrong".to_string())
        .await
        .unwrap();

    assert_eq!(record.requester_id.as_str(), "u1");
    assert_eq!(record.label, "Billing");
    assert!((record.confidence - 0.92).abs() < f64::EPSILON);
    assert!(record.ticket_id.0 > 0);

    let history = flow.history(&RequesterId::new("u1"), None).await.unwrap();
    assert_eq!(history.first(), Some(&record));
}

#[tokio::test]
async fn test_empty_text_never_reaches_store() {
    let store = Arc::new(RecordingStore::default());
    let flow = flow_with(store.clone());

    for text in ["", "    "] {
        let err = flow
            .submit(RequesterId::new("u1"), text.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_failed_insert_returns_persistence_error() {
    let store = Arc::new(RecordingStore::failing());
    let flow = flow_with(store.clone());

    let result = flow
        .submit(RequesterId::new("u1"), "My invoice is wrong".to_string())
        .await;

    match result {
        Err(TriageError::Persistence { .. }) => {}
        other => panic!("expected persistence error, got {:?}", other),
    }
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let store = Arc::new(RecordingStore::default());
    let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();

    // t2, t3, t1 insertion order; history must come back t3, t2, t1
    for (offset, text) in [(1, "second"), (2, "third"), (0, "first")] {
        store
            .insert(NewTicket {
                requester_id: RequesterId::new("u7"),
                ticket_text: text.to_string(),
                label: "Technical".to_string(),
                confidence: 0.6,
                submitted_at: t1 + Duration::minutes(offset),
            })
            .await
            .unwrap();
    }

    let flow = flow_with(store.clone());
    let history = flow.history(&RequesterId::new("u7"), None).await.unwrap();
    let texts: Vec<&str> = history.iter().map(|r| r.ticket_text.as_str()).collect();
    assert_eq!(texts, vec!["third", "second", "first"]);

    let page = flow
        .history(&RequesterId::new("u7"), Some(HistoryPage::new(2, 1)))
        .await
        .unwrap();
    let texts: Vec<&str> = page.iter().map(|r| r.ticket_text.as_str()).collect();
    assert_eq!(texts, vec!["second", "first"]);

    assert!(flow
        .history(&RequesterId::new("someone-else"), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_submissions_from_many_requesters_stay_separate() {
    let store = Arc::new(RecordingStore::default());
    let flow = Arc::new(flow_with(store.clone()));

    let mut handles = Vec::new();
    for i in 0..20 {
        let flow = Arc::clone(&flow);
        handles.push(tokio::spawn(async move {
            flow.submit(
                RequesterId::new(format!("user-{}", i % 4)),
                format!("ticket number {}", i),
            )
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for user in 0..4 {
        let history = flow
            .history(&RequesterId::new(format!("user-{}", user)), None)
            .await
            .unwrap();
        assert_eq!(history.len(), 5);
        assert!(history
            .iter()
            .all(|r| r.requester_id.as_str() == format!("user-{}", user)));
    }
}
