//! Loads the text of a single chapter file.

use std::sync::Arc;

use shosai_api::traits::ReaderService;
use tracing::{debug, warn};

use crate::error::PlayerError;
use crate::models::ChapterFile;

pub struct SourceLoader<S> {
    service: Arc<S>,
}

impl<S: ReaderService> SourceLoader<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Fetch a file and split it into lines. Failures are returned as-is;
    /// retrying is up to the caller.
    pub async fn load(&self, file_id: &str) -> Result<ChapterFile, PlayerError> {
        if file_id.is_empty() {
            return Err(PlayerError::MissingParameter("file_id"));
        }

        let raw = self
            .service
            .fetch_chapter_file(file_id)
            .await
            .map_err(|e| {
                warn!(file_id, error = %e, "failed to load chapter file");
                PlayerError::from_service(e, format!("file {file_id}"))
            })?;

        let file = ChapterFile::from_raw(raw.id, raw.name, &raw.content);
        debug!(file_id, lines = file.content.len(), "chapter file loaded");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockService;

    #[tokio::test]
    async fn test_load_splits_and_roundtrips() {
        let raw = "Chapter One\n\nIt was a dark night.\nThe end.\n";
        let service = Arc::new(MockService::new().with_file("f1", raw));
        let loader = SourceLoader::new(service);

        let file = loader.load("f1").await.unwrap();
        assert_eq!(file.content.len(), 5);
        assert_eq!(file.content[2], "It was a dark night.");
        assert_eq!(file.content.join("\n"), raw);
        assert_eq!(file.id, "f1");
    }

    #[tokio::test]
    async fn test_load_failure_is_transport_error() {
        let service = Arc::new(MockService::new().with_failing_file("bad", "connection reset"));
        let loader = SourceLoader::new(service);

        let err = loader.load("bad").await.unwrap_err();
        assert_eq!(err, PlayerError::Transport("connection reset".into()));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let loader = SourceLoader::new(Arc::new(MockService::new()));
        assert!(matches!(
            loader.load("nope").await,
            Err(PlayerError::NotFound(_))
        ));
        assert_eq!(
            loader.load("").await,
            Err(PlayerError::MissingParameter("file_id"))
        );
    }
}
