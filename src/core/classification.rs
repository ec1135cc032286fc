use crate::domain::model::ClassificationResult;
use crate::domain::ports::{ArtifactLoader, DepartmentModel};
use crate::utils::error::{Result, TriageError};
use crate::utils::validation::validate_non_empty_input;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A failed load, kept so later callers see the same error without retrying.
#[derive(Debug, Clone)]
struct LoadFailure {
    path: String,
    message: String,
}

impl LoadFailure {
    fn from_error(source: String, err: TriageError) -> Self {
        match err {
            TriageError::ArtifactLoad { path, message } => Self { path, message },
            other => Self {
                path: source,
                message: other.to_string(),
            },
        }
    }

    fn to_error(&self) -> TriageError {
        TriageError::ArtifactLoad {
            path: self.path.clone(),
            message: self.message.clone(),
        }
    }
}

type LoadOutcome = std::result::Result<Arc<dyn DepartmentModel>, LoadFailure>;

/// Classifies ticket text with a lazily loaded, process-wide model.
///
/// The artifact is loaded through a one-time cell: concurrent first callers
/// wait on a single `ArtifactLoader::load`, and its outcome (model or error)
/// is final for the lifetime of the service.
pub struct ClassificationService {
    loader: Arc<dyn ArtifactLoader>,
    model: OnceCell<LoadOutcome>,
}

impl ClassificationService {
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    async fn model(&self) -> Result<Arc<dyn DepartmentModel>> {
        let outcome = self
            .model
            .get_or_init(|| async {
                let source = self.loader.describe();
                tracing::info!("Loading model artifact from {}", source);

                match self.loader.load().await {
                    Ok(model) => {
                        tracing::info!(
                            "Model artifact loaded ({} departments: {})",
                            model.labels().len(),
                            model.labels().join(", ")
                        );
                        Ok(model)
                    }
                    Err(e) => {
                        tracing::error!("Model artifact load failed: {}", e);
                        Err(LoadFailure::from_error(source, e))
                    }
                }
            })
            .await;

        match outcome {
            Ok(model) => Ok(Arc::clone(model)),
            Err(failure) => Err(failure.to_error()),
        }
    }

    pub async fn classify(&self, ticket_text: &str) -> Result<ClassificationResult> {
        validate_non_empty_input("ticket_text", ticket_text)?;

        let model = self.model().await?;
        let ClassificationResult { label, confidence } = model.classify(ticket_text);

        tracing::debug!(
            "Classified ticket ({} chars) as {} with confidence {:.3}",
            ticket_text.chars().count(),
            label,
            confidence
        );

        Ok(ClassificationResult { label, confidence })
    }

    /// Force the one-time load now instead of on the first request.
    pub async fn preload(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    pub async fn label_set(&self) -> Result<Vec<String>> {
        Ok(self.model().await?.labels().to_vec())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LabelDistribution;
    use crate::utils::error::ErrorCategory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedModel {
        labels: Vec<String>,
        distribution: LabelDistribution,
    }

    impl FixedModel {
        fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
                distribution: pairs.iter().map(|(l, p)| (l.to_string(), *p)).collect(),
            }
        }
    }

    impl DepartmentModel for FixedModel {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn predict(&self, _text: &str) -> String {
            self.distribution
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(label, _)| label.clone())
                .unwrap_or_default()
        }

        fn predict_distribution(&self, _text: &str) -> LabelDistribution {
            self.distribution.clone()
        }
    }

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtifactLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn DepartmentModel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // widen the race window for concurrent first calls
            tokio::time::sleep(Duration::from_millis(20)).await;

            if self.fail {
                return Err(TriageError::ArtifactLoad {
                    path: "missing.json".to_string(),
                    message: "No such file or directory".to_string(),
                });
            }
            Ok(Arc::new(FixedModel::new(&[
                ("Billing", 0.92),
                ("Technical", 0.05),
                ("General", 0.03),
            ])))
        }

        fn describe(&self) -> String {
            "counting-loader".to_string()
        }
    }

    #[tokio::test]
    async fn test_classify_returns_max_posterior() {
        let loader = Arc::new(CountingLoader::new(false));
        let service = ClassificationService::new(loader.clone());

        let result = service.classify("My invoice is wrong").await.unwrap();

        assert_eq!(result.label, "Billing");
        assert!((result.confidence - 0.92).abs() < f64::EPSILON);
        assert!(service.is_loaded());
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_before_loading() {
        let loader = Arc::new(CountingLoader::new(false));
        let service = ClassificationService::new(loader.clone());

        for text in ["", "   ", "\n\t"] {
            let err = service.classify(text).await.unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Input);
        }
        assert_eq!(loader.calls(), 0);
        assert!(!service.is_loaded());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_load_once() {
        let loader = Arc::new(CountingLoader::new(false));
        let service = Arc::new(ClassificationService::new(loader.clone()));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.classify(&format!("ticket {}", i)).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().label, "Billing");
        }
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_sticky() {
        let loader = Arc::new(CountingLoader::new(true));
        let service = ClassificationService::new(loader.clone());

        for _ in 0..3 {
            let err = service.classify("printer is broken").await.unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Model);
            assert!(err.to_string().contains("missing.json"));
        }
        assert!(service.preload().await.is_err());
        assert_eq!(loader.calls(), 1);
        assert!(!service.is_loaded());
    }

    #[tokio::test]
    async fn test_preload_then_label_set() {
        let loader = Arc::new(CountingLoader::new(false));
        let service = ClassificationService::new(loader.clone());

        service.preload().await.unwrap();
        service.preload().await.unwrap();
        let labels = service.label_set().await.unwrap();

        assert_eq!(labels, vec!["Billing", "Technical", "General"]);
        assert_eq!(loader.calls(), 1);
    }
}
