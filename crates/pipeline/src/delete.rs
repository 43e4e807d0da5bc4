//! Deleting favicons with their blobs.
//!
//! Blob removal is best-effort: failures are logged and counted, and never
//! stop the records from being removed. An orphaned blob is preferable to a
//! record pointing at a half-deleted asset set.

use crate::error::{ErrorKind, Result};
use crate::keys;
use crate::pipeline::Pipeline;
use exn::OptionExt;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::HashSet;
use tracing::instrument;

/// Blob outcome of one successful deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub blobs_removed: usize,
    /// Blobs left behind; each was logged.
    pub blobs_failed: usize,
}

/// Per-identifier outcome of a batch deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    pub id: String,
    pub outcome: std::result::Result<DeleteSummary, String>,
}
impl DeletionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Default)]
struct Sweep {
    attempted: HashSet<String>,
    summary: DeleteSummary,
}

impl Pipeline {
    async fn remove_blob(&self, sweep: &mut Sweep, key: &str) {
        if !sweep.attempted.insert(key.to_string()) {
            return;
        }
        match self.backend.delete(key).await {
            Ok(()) => sweep.summary.blobs_removed += 1,
            Err(err) => {
                tracing::warn!(key, error = ?err, "could not delete blob");
                sweep.summary.blobs_failed += 1;
            },
        }
    }

    /// Delete a favicon, its assets and every blob stored for it.
    ///
    /// Blobs go first: the recorded assets, the source, then anything left
    /// under the favicon's prefix. The record and its asset rows go last, in
    /// one transaction.
    #[instrument(skip(self))]
    pub async fn delete_favicon(&self, id: &str) -> Result<DeleteSummary> {
        let favicon = self.repo.get_favicon(id).await.map_err(ErrorKind::persistence)?;
        let favicon = favicon.ok_or_raise(|| ErrorKind::NotFound(format!("favicon {id}")))?;
        let assets = self.repo.list_assets(id).await.map_err(ErrorKind::persistence)?;

        let mut sweep = Sweep::default();
        for asset in &assets {
            self.remove_blob(&mut sweep, &asset.storage_key).await;
        }
        self.remove_blob(&mut sweep, &keys::source_key(id)).await;

        // Variants written by a generation run that failed part-way have no
        // asset row.
        let prefix = keys::favicon_prefix(&favicon.slug);
        match self.backend.list_stream(&prefix).map_ok(|info| info.key).try_collect::<Vec<_>>().await {
            Ok(stray) => {
                for key in stray {
                    self.remove_blob(&mut sweep, &key).await;
                }
            },
            Err(err) => {
                tracing::warn!(%prefix, error = ?err, "could not list leftover blobs");
            },
        }

        self.repo.delete_favicon(id).await.map_err(ErrorKind::persistence)?;
        let summary = sweep.summary;
        tracing::info!(
            blobs_removed = summary.blobs_removed,
            blobs_failed = summary.blobs_failed,
            "favicon deleted"
        );
        Ok(summary)
    }

    /// Delete several favicons, reporting an outcome per identifier in input
    /// order. One failure never stops the others.
    #[instrument(skip_all, fields(count = ids.len()))]
    pub async fn delete_favicons(&self, ids: &[String]) -> Vec<DeletionResult> {
        let concurrency = self.settings.delete_concurrency.max(1);
        stream::iter(ids)
            .map(|id| async move {
                let outcome = self.delete_favicon(id).await.map_err(|err| (*err).to_string());
                DeletionResult { id: id.clone(), outcome }
            })
            .buffered(concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{harness, red_png};
    use crate::request::CreateRequest;
    use aicon_storage::StorageBackend;

    async fn generated(h: &crate::pipeline::tests::Harness, domain: &str) -> crate::Created {
        let created = h
            .pipeline
            .create(CreateRequest::upload(red_png(10, 10), "image/png").with_target_domain(domain))
            .await
            .unwrap();
        h.spawner.run_pending().await;
        created
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let h = harness().await;
        let created = generated(&h, "test.io").await;
        let keep = generated(&h, "keep.io").await;

        let summary = h.pipeline.delete_favicon(&created.id).await.unwrap();
        assert_eq!(summary, DeleteSummary { blobs_removed: 15, blobs_failed: 0 });

        assert!(h.pipeline.favicon(&created.id).await.unwrap_err().is_not_found());
        assert!(h.pipeline.source(&created.id).await.unwrap_err().is_not_found());
        assert!(h.repo.list_assets(&created.id).await.unwrap().is_empty());
        assert!(h.backend.list(&keys::favicon_prefix(&created.slug)).await.unwrap().is_empty());

        // Other favicons are untouched.
        assert_eq!(h.pipeline.favicon(&keep.id).await.unwrap().assets.len(), 14);
        assert_eq!(h.backend.len().await, 15);
    }

    #[tokio::test]
    async fn test_blob_failure_does_not_block_deletion() {
        let h = harness().await;
        let created = generated(&h, "test.io").await;
        let stuck = format!("favicons/{}/32x32-test.io.png", created.slug);
        h.backend.fail_deletes_for(&stuck).await;

        let summary = h.pipeline.delete_favicon(&created.id).await.unwrap();
        assert_eq!(summary.blobs_failed, 1);
        assert_eq!(summary.blobs_removed, 14);
        assert!(h.repo.get_favicon(&created.id).await.unwrap().is_none());
        assert!(h.repo.list_assets(&created.id).await.unwrap().is_empty());
        // Attempted once, then skipped by the prefix sweep.
        assert_eq!(h.backend.keys().await, vec![stuck]);
    }

    #[tokio::test]
    async fn test_sweep_removes_unrecorded_blobs() {
        let h = harness().await;
        let created = generated(&h, "test.io").await;
        let stray = format!("favicons/{}/leftover.png", created.slug);
        h.backend.put(&stray, b"partial", "image/png").await.unwrap();

        let summary = h.pipeline.delete_favicon(&created.id).await.unwrap();
        assert_eq!(summary.blobs_removed, 16);
        assert!(!h.backend.exists(&stray).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_pending_favicon() {
        let h = harness().await;
        let created = h.pipeline.create(CreateRequest::upload(red_png(4, 4), "image/png")).await.unwrap();
        let summary = h.pipeline.delete_favicon(&created.id).await.unwrap();
        assert_eq!(summary.blobs_removed, 1);
        assert!(h.backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let h = harness().await;
        let err = h.pipeline.delete_favicon("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_delete_reports_in_order() {
        let h = harness().await;
        let first = generated(&h, "one.io").await;
        let second = generated(&h, "two.io").await;
        let ids = vec![second.id.clone(), "missing".to_string(), first.id.clone()];

        let results = h.pipeline.delete_favicons(&ids).await;
        let returned: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(returned, vec![second.id.as_str(), "missing", first.id.as_str()]);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[1].outcome.as_ref().unwrap_err().contains("not found"));
        assert!(results[2].is_success());
        assert!(h.backend.is_empty().await);
    }
}
