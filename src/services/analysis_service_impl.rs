//! `SeaORM` implementation of the `AnalysisService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, error, info, warn};

use crate::db::Store;
use crate::models::analysis::AnalysisRecord;
use crate::predictor::{Prediction, Predictor};
use crate::services::analysis_service::{
    AnalysisError, AnalysisService, AnalysisSummary, UploadedImage,
};
use crate::services::storage::MediaStorage;

#[derive(Clone)]
pub struct SeaOrmAnalysisService {
    store: Store,
    storage: Arc<MediaStorage>,
    predictor: Arc<dyn Predictor>,
}

impl SeaOrmAnalysisService {
    #[must_use]
    pub fn new(store: Store, storage: Arc<MediaStorage>, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            store,
            storage,
            predictor,
        }
    }

    /// Removes a failed attempt: the record first, then its image.
    async fn discard(&self, record: &AnalysisRecord) {
        if let Err(e) = self.store.delete_analysis(record.id).await {
            error!(record_id = record.id, "Failed to delete analysis record: {e:#}");
        }
        if let Err(e) = self.storage.remove(&record.image).await {
            warn!(record_id = record.id, "Failed to remove upload: {e:#}");
        }
    }

    async fn run_predictor(&self, record: &AnalysisRecord) -> Result<Prediction, AnalysisError> {
        let predictor = Arc::clone(&self.predictor);
        let path = self.storage.absolute_path(&record.image);

        tokio::task::spawn_blocking(move || predictor.predict(&path))
            .await
            .map_err(|e| AnalysisError::Fault(format!("Predictor task panicked: {e}")))?
            .map_err(|e| AnalysisError::Fault(format!("{e:#}")))
    }

    async fn finalize(
        &self,
        record: &AnalysisRecord,
        prediction: Prediction,
    ) -> Result<Value, AnalysisError> {
        let payload = prediction
            .to_payload()
            .map_err(|e| AnalysisError::Fault(format!("Failed to encode payload: {e}")))?;

        if let Prediction::Failure(failure) = prediction {
            return Err(AnalysisError::AnalysisFailed(failure.error));
        }

        self.store
            .attach_analysis_result(record.id, payload.clone())
            .await
            .map_err(|e| AnalysisError::Fault(format!("{e:#}")))?;

        Ok(payload)
    }

    /// Stores, records and analyses one upload, leaving either a finalized
    /// record or nothing at all.
    async fn run_upload(
        &self,
        user_id: i32,
        upload: UploadedImage,
    ) -> Result<Value, AnalysisError> {
        let stored = self
            .storage
            .save_upload(upload.file_name.as_deref(), &upload.bytes)
            .await
            .map_err(|e| {
                record_outcome("fault");
                AnalysisError::Fault(format!("{e:#}"))
            })?;

        let record = match self.store.create_analysis(user_id, &stored).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&stored).await {
                    warn!("Failed to remove orphaned upload: {cleanup:#}");
                }
                record_outcome("fault");
                return Err(AnalysisError::Fault(format!("{e:#}")));
            }
        };

        let outcome = match self.run_predictor(&record).await {
            Ok(prediction) => self.finalize(&record, prediction).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(payload) => {
                record_outcome("success");
                info!(record_id = record.id, user_id, "Analysis completed");
                Ok(payload)
            }
            Err(err) => {
                self.discard(&record).await;
                match &err {
                    AnalysisError::AnalysisFailed(detail) => {
                        record_outcome("rejected");
                        warn!(record_id = record.id, user_id, "Analysis rejected image: {detail}");
                    }
                    other => {
                        record_outcome("fault");
                        error!(record_id = record.id, user_id, "Analysis failed: {other}");
                    }
                }
                Err(err)
            }
        }
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("analysis_outcomes_total", "outcome" => outcome).increment(1);
}

#[async_trait]
impl AnalysisService for SeaOrmAnalysisService {
    async fn analyze_upload(
        &self,
        user_id: i32,
        upload: UploadedImage,
    ) -> Result<Value, AnalysisError> {
        if upload.bytes.is_empty() {
            return Err(AnalysisError::MissingImage);
        }

        // Owned task: dropping the request future must not skip finalize or discard
        let service = self.clone();
        let task = async move { service.run_upload(user_id, upload).await };
        tokio::spawn(task.in_current_span())
            .await
            .map_err(|e| {
                record_outcome("fault");
                AnalysisError::Fault(format!("Upload task failed: {e}"))
            })?
    }

    async fn history(&self, user_id: i32) -> Result<Vec<AnalysisSummary>, AnalysisError> {
        let records = self.store.list_analyses_for_user(user_id).await?;

        Ok(records
            .into_iter()
            .map(|record| AnalysisSummary {
                id: record.id,
                image: self.storage.public_url(&record.image),
                result: record.result,
                created_at: record.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SecurityConfig, StorageConfig};
    use crate::db::NewUser;
    use crate::predictor::PlaceholderPredictor;
    use std::io::Cursor;
    use std::path::Path;

    struct FaultyPredictor;

    impl Predictor for FaultyPredictor {
        fn predict(&self, _image_path: &Path) -> anyhow::Result<Prediction> {
            anyhow::bail!("model runtime crashed")
        }
    }

    struct PanickingPredictor;

    impl Predictor for PanickingPredictor {
        fn predict(&self, _image_path: &Path) -> anyhow::Result<Prediction> {
            panic!("predictor exploded")
        }
    }

    struct Fixture {
        store: Store,
        storage: Arc<MediaStorage>,
        user_id: i32,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let url = format!("sqlite:{}", dir.path().join("test.db").display());
            let store = Store::new(&url).await.unwrap();
            let storage = Arc::new(MediaStorage::new(&StorageConfig {
                media_root: dir.path().join("media").to_string_lossy().to_string(),
                upload_dir: "uploads".to_string(),
                media_url: "/media".to_string(),
            }));

            let user = store
                .create_user(
                    NewUser {
                        username: "asha".to_string(),
                        email: "asha@example.com".to_string(),
                        first_name: String::new(),
                        last_name: String::new(),
                        password: "monsoon-2026".to_string(),
                    },
                    &SecurityConfig {
                        argon2_memory_cost_kib: 1024,
                        argon2_time_cost: 1,
                        argon2_parallelism: 1,
                    },
                )
                .await
                .unwrap();

            Self {
                store,
                storage,
                user_id: user.id,
                _dir: dir,
            }
        }

        fn service(&self, predictor: Arc<dyn Predictor>) -> SeaOrmAnalysisService {
            SeaOrmAnalysisService::new(self.store.clone(), self.storage.clone(), predictor)
        }

        fn stored_files(&self) -> usize {
            std::fs::read_dir(self.storage.media_root().join("uploads"))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn png_upload() -> UploadedImage {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([30, 160, 40]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        UploadedImage {
            file_name: Some("leaf.png".to_string()),
            bytes: bytes.into_inner(),
        }
    }

    #[tokio::test]
    async fn test_successful_upload_persists_result() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(PlaceholderPredictor::new(224)));

        let payload = service.analyze_upload(fx.user_id, png_upload()).await.unwrap();
        assert_eq!(payload["disease"], "Sample Disease (Placeholder)");

        let records = fx.store.list_analyses_for_user(fx.user_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result.as_ref(), Some(&payload));
        assert_eq!(fx.stored_files(), 1);
    }

    #[tokio::test]
    async fn test_rejected_image_leaves_nothing_behind() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(PlaceholderPredictor::new(224)));

        let err = service
            .analyze_upload(
                fx.user_id,
                UploadedImage {
                    file_name: Some("leaf.jpg".to_string()),
                    bytes: b"not an image".to_vec(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::AnalysisFailed(_)));
        assert_eq!(fx.store.analysis_count_for_user(fx.user_id).await.unwrap(), 0);
        assert_eq!(fx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_predictor_fault_leaves_nothing_behind() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(FaultyPredictor));

        let err = service
            .analyze_upload(fx.user_id, png_upload())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Fault(ref msg) if msg.contains("model runtime crashed")
        ));
        assert_eq!(fx.store.analysis_count_for_user(fx.user_id).await.unwrap(), 0);
        assert_eq!(fx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_predictor_panic_is_a_fault() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(PanickingPredictor));

        let err = service
            .analyze_upload(fx.user_id, png_upload())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Fault(_)));
        assert_eq!(fx.store.analysis_count_for_user(fx.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_before_storage() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(PlaceholderPredictor::new(224)));

        let err = service
            .analyze_upload(
                fx.user_id,
                UploadedImage {
                    file_name: Some("leaf.png".to_string()),
                    bytes: Vec::new(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingImage));
        assert_eq!(fx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_history_maps_images_to_urls() {
        let fx = Fixture::new().await;
        let service = fx.service(Arc::new(PlaceholderPredictor::new(224)));

        service.analyze_upload(fx.user_id, png_upload()).await.unwrap();
        service.analyze_upload(fx.user_id, png_upload()).await.unwrap();

        let history = service.history(fx.user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id);
        assert!(history.iter().all(|h| h.image.starts_with("/media/uploads/")));
        assert!(history.iter().all(|h| h.result.is_some()));
    }
}
