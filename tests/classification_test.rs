use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticket_triage::adapters::FileArtifactLoader;
use ticket_triage::core::{ArtifactLoader, DepartmentModel};
use ticket_triage::utils::error::ErrorCategory;
use ticket_triage::{ClassificationService, Result};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/ticket_classifier.json")
}

/// Wraps the real file loader and counts how often it is asked to load.
struct CountingFileLoader {
    inner: FileArtifactLoader,
    loads: AtomicUsize,
}

#[async_trait]
impl ArtifactLoader for CountingFileLoader {
    async fn load(&self) -> Result<Arc<dyn DepartmentModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.inner.load().await
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[tokio::test]
async fn test_fixture_artifact_routes_tickets_to_departments() {
    let service = ClassificationService::new(Arc::new(FileArtifactLoader::new(fixture_path())));

    let cases = [
        ("My invoice is wrong", "Billing"),
        ("I was charged twice for one payment", "Billing"),
        ("I can't reset my password", "Account"),
        ("Please delete my account", "Account"),
        ("The app keeps showing an error on login", "Technical"),
        ("hello there", "General"),
    ];

    for (text, expected) in cases {
        let result = service.classify(text).await.unwrap();
        assert_eq!(result.label, expected, "text: {}", text);
    }
}

#[tokio::test]
async fn test_label_and_confidence_are_internally_consistent() {
    let model = FileArtifactLoader::new(fixture_path()).load().await.unwrap();
    let service = ClassificationService::new(Arc::new(FileArtifactLoader::new(fixture_path())));
    let labels = service.label_set().await.unwrap();

    let texts = [
        "My invoice is wrong",
        "refund refund refund",
        "login error after update",
        "completely unrelated words here",
        "ÜBER wichtige Rechnung",
        "x",
    ];

    for text in texts {
        let result = service.classify(text).await.unwrap();
        let distribution = model.predict_distribution(text);
        let max = distribution.values().copied().fold(f64::MIN, f64::max);

        assert!(labels.contains(&result.label));
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!((result.confidence - max).abs() < 1e-12);
        assert!((distribution[&result.label] - max).abs() < 1e-12);
    }
}

#[tokio::test]
async fn test_classification_is_deterministic() {
    let service = ClassificationService::new(Arc::new(FileArtifactLoader::new(fixture_path())));

    let first = service.classify("I need a refund for my payment").await.unwrap();
    for _ in 0..10 {
        assert_eq!(
            service.classify("I need a refund for my payment").await.unwrap(),
            first
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_trigger_one_load() {
    let loader = Arc::new(CountingFileLoader {
        inner: FileArtifactLoader::new(fixture_path()),
        loads: AtomicUsize::new(0),
    });
    let service = Arc::new(ClassificationService::new(loader.clone()));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.classify("My invoice is wrong").await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().label, "Billing");
    }
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_artifact_fails_every_call() {
    let service = ClassificationService::new(Arc::new(FileArtifactLoader::new(
        "/definitely/not/here/ticket_classifier.json",
    )));

    for _ in 0..2 {
        let err = service.classify("My invoice is wrong").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Model);
    }
    assert!(!service.is_loaded());
}

#[tokio::test]
async fn test_fallback_artifact_rescues_missing_primary() {
    let loader = FileArtifactLoader::new("/definitely/not/here/ticket_classifier.json")
        .with_fallback(fixture_path());
    let service = ClassificationService::new(Arc::new(loader));

    let result = service.classify("My invoice is wrong").await.unwrap();
    assert_eq!(result.label, "Billing");
    assert!(service.is_loaded());
}
