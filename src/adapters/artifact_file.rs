use crate::core::artifact::TicketPipeline;
use crate::core::{ArtifactLoader, DepartmentModel};
use crate::utils::error::{Result, TriageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads the JSON model artifact from disk, falling back to a second path
/// when the primary one is missing or unreadable.
#[derive(Debug, Clone)]
pub struct FileArtifactLoader {
    primary: PathBuf,
    fallback: Option<PathBuf>,
}

impl FileArtifactLoader {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<PathBuf>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    async fn load_from(path: &Path) -> Result<TicketPipeline> {
        let source = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TriageError::ArtifactLoad {
                path: source.clone(),
                message: e.to_string(),
            })?;

        let pipeline = TicketPipeline::from_json(&source, &bytes)?;
        tracing::debug!(
            "Parsed artifact {} ({} bytes, {} vocabulary terms)",
            source,
            bytes.len(),
            pipeline.vocabulary_size()
        );
        Ok(pipeline)
    }
}

#[async_trait]
impl ArtifactLoader for FileArtifactLoader {
    async fn load(&self) -> Result<Arc<dyn DepartmentModel>> {
        let primary_err = match Self::load_from(&self.primary).await {
            Ok(pipeline) => return Ok(Arc::new(pipeline)),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_err);
        };

        tracing::warn!(
            "Primary artifact unavailable ({}), trying fallback {}",
            primary_err,
            fallback.display()
        );
        match Self::load_from(fallback).await {
            Ok(pipeline) => Ok(Arc::new(pipeline)),
            Err(TriageError::ArtifactLoad { path, message }) => Err(TriageError::ArtifactLoad {
                path,
                message: format!("{} (primary also failed: {})", message, primary_err),
            }),
            Err(other) => Err(other),
        }
    }

    fn describe(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "{} (fallback {})",
                self.primary.display(),
                fallback.display()
            ),
            None => self.primary.display().to_string(),
        }
    }
}
