//! Background generation of a favicon's variants.
//!
//! Runs detached from `create`. The outcome is reported only through the
//! record's status: every failure ends with the record marked `FAILED` and the
//! message stored beside it.

use crate::error::{ErrorKind, Result};
use crate::keys;
use crate::pipeline::Pipeline;
use aicon_db::models::{Favicon, NewAsset, Status};
use aicon_generate::Options;
use tracing::Instrument;

impl Pipeline {
    pub(crate) fn spawn_generation(&self, favicon: &Favicon, source: Vec<u8>) {
        let span = tracing::info_span!("generation", favicon_id = %favicon.id, slug = %favicon.slug);
        let pipeline = self.clone();
        let favicon = favicon.clone();
        self.spawner.spawn(Box::pin(
            async move { pipeline.run_generation(&favicon, source).await }.instrument(span),
        ));
    }

    async fn run_generation(&self, favicon: &Favicon, source: Vec<u8>) {
        match self.generate_and_store(favicon, source).await {
            Ok(stored) => {
                tracing::info!(assets = stored, "generation succeeded");
                if let Err(err) = self.repo.update_status(&favicon.id, Status::Success, None).await {
                    tracing::error!(error = ?err, "could not mark favicon as succeeded");
                    let reason = format!("could not record success: {}", *err);
                    self.mark_failed(favicon, &reason).await;
                }
            },
            Err(err) => {
                tracing::error!(error = ?err, "generation failed");
                self.mark_failed(favicon, &(*err).to_string()).await;
            },
        }
    }

    async fn mark_failed(&self, favicon: &Favicon, reason: &str) {
        if let Err(err) = self.repo.update_status(&favicon.id, Status::Failed, Some(reason)).await {
            // Nothing left to report to: the record stays where it is.
            tracing::error!(error = ?err, "could not mark favicon as failed");
        }
    }

    /// Generate every variant, then store and record them in order.
    ///
    /// Returns how many assets were stored. Stops at the first failure; blobs
    /// and asset rows written before it are left for deletion to clean up.
    async fn generate_and_store(&self, favicon: &Favicon, source: Vec<u8>) -> Result<usize> {
        let options = Options {
            embedded_metadata: favicon.embedded_metadata.clone(),
        };
        let generator = self.generator.clone();
        let variants = tokio::task::spawn_blocking(move || generator.generate(&source, &options))
            .await
            .map_err(|err| exn::Exn::from(ErrorKind::Generation(format!("generation task aborted: {err}"))))?
            .map_err(ErrorKind::generation)?;

        let domain = favicon.target_domain.as_deref().unwrap_or(&self.settings.default_domain);
        for variant in &variants {
            let key = keys::variant_key(&favicon.slug, variant.dimension, domain, variant.format());
            self.backend
                .put(&key, &variant.bytes, variant.mime_type())
                .await
                .map_err(ErrorKind::storage)?;
            let asset = NewAsset {
                id: nanoid::nanoid!(),
                favicon_id: favicon.id.clone(),
                kind: variant.kind,
                dimension: Some(variant.dimension),
                format: variant.format().to_string(),
                storage_key: key,
                mime_type: variant.mime_type().to_string(),
            };
            self.repo.insert_asset(&asset).await.map_err(ErrorKind::persistence)?;
            tracing::debug!(key = %asset.storage_key, "stored variant");
        }
        Ok(variants.len())
    }
}

#[cfg(test)]
mod tests {
    use crate::DeleteSummary;
    use crate::keys;
    use crate::pipeline::tests::{harness, red_png};
    use crate::request::CreateRequest;
    use aicon_db::models::Status;
    use aicon_storage::StorageBackend;

    #[tokio::test]
    async fn test_record_deleted_mid_flight() {
        let h = harness().await;
        let created = h.pipeline.create(CreateRequest::upload(red_png(6, 6), "image/png")).await.unwrap();
        // Neither the asset rows nor the status update have a record to
        // attach to; the task still runs to completion.
        h.repo.delete_favicon(&created.id).await.unwrap();
        h.spawner.run_pending().await;
        assert!(h.repo.get_favicon(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_variants_are_stored_with_content_types() {
        let h = harness().await;
        let created = h
            .pipeline
            .create(CreateRequest::upload(red_png(6, 6), "image/png").with_target_domain("test.io"))
            .await
            .unwrap();
        h.spawner.run_pending().await;
        let listed = h.backend.list(&format!("favicons/{}/", created.slug)).await.unwrap();
        let ico = listed.iter().find(|o| o.key.ends_with(".ico")).unwrap();
        assert_eq!(ico.content_type.as_deref(), Some("image/x-icon"));
        let record = h.repo.get_favicon(&created.id).await.unwrap().unwrap();
        assert_eq!(record.status, Status::Success);
    }

    #[tokio::test]
    async fn test_storage_failure_mid_generation() {
        let h = harness().await;
        let created = h
            .pipeline
            .create(CreateRequest::upload(red_png(6, 6), "image/png").with_target_domain("test.io"))
            .await
            .unwrap();
        h.backend.fail_puts_for(format!("favicons/{}/64x64-test.io.png", created.slug)).await;
        h.spawner.run_pending().await;

        let record = h.repo.get_favicon(&created.id).await.unwrap().unwrap();
        assert_eq!(record.status, Status::Failed);
        assert!(record.status_error.is_some_and(|e| !e.is_empty()));
        assert!(record.generated_at.is_some());

        // 16, 32 and 48 were stored and recorded before the failure.
        let assets = h.repo.list_assets(&created.id).await.unwrap();
        assert_eq!(assets.len(), 3);
        let prefix = keys::favicon_prefix(&created.slug);
        assert_eq!(h.backend.list(&prefix).await.unwrap().len(), 3);
        assert_eq!(h.backend.len().await, 4);

        let summary = h.pipeline.delete_favicon(&created.id).await.unwrap();
        assert_eq!(summary, DeleteSummary { blobs_removed: 4, blobs_failed: 0 });
        assert!(h.backend.is_empty().await);
        assert!(h.repo.list_assets(&created.id).await.unwrap().is_empty());
    }
}
