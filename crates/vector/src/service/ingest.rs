use lake_core::{AppError, AppResult, IngestMode};
use tracing::{debug, info, instrument};

use super::{CallOptions, VectorService};
use crate::types::{IngestionReport, IngestionRequest};

impl VectorService {
    /// Embed and store a validated batch.
    ///
    /// The batch is embedded with one backend call and written with one
    /// store call, so it lands completely or not at all. In strict mode ids
    /// already in the collection reject the whole batch before embedding.
    #[instrument(skip(self, request, opts), fields(collection = %self.collection(), count = request.len()))]
    pub async fn ingest(
        &self,
        request: IngestionRequest,
        opts: &CallOptions,
    ) -> AppResult<IngestionReport> {
        if self.ingest_mode() == IngestMode::Strict {
            let existing = opts
                .run("store lookup", self.store.existing_ids(request.ids().to_vec()))
                .await?;
            if !existing.is_empty() {
                return Err(AppError::ExistingIds(existing));
            }
        }

        debug!(
            "Embedding {} documents with '{}' (model: {})",
            request.len(),
            self.embedder.provider_name(),
            self.embedder.model_name()
        );

        let vectors = opts
            .run("embedding", self.embedder.embed_batch(request.documents()))
            .await?;

        if vectors.len() != request.len() {
            return Err(AppError::BackendUnavailable(format!(
                "Embedding backend returned {} vectors for {} documents",
                vectors.len(),
                request.len()
            )));
        }

        let ids = request.ids().to_vec();
        let records = request.into_records(vectors);

        opts.run("store upsert", self.store.upsert(records)).await?;

        info!(
            "Added {} document(s) to collection '{}'",
            ids.len(),
            self.collection()
        );

        Ok(IngestionReport {
            count: ids.len(),
            ids,
            collection: self.collection().to_string(),
        })
    }
}
