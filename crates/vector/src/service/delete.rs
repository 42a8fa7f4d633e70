use lake_core::AppResult;
use std::collections::HashSet;
use tracing::{info, instrument};

use super::{CallOptions, VectorService};
use crate::types::{DeleteRequest, DeletionReport};

impl VectorService {
    /// Delete ids. Ids that were not stored come back as missing, not as errors.
    #[instrument(skip(self, request, opts), fields(collection = %self.collection(), count = request.ids().len()))]
    pub async fn delete(
        &self,
        request: DeleteRequest,
        opts: &CallOptions,
    ) -> AppResult<DeletionReport> {
        let removed: HashSet<String> = opts
            .run("store delete", self.store.delete(request.ids().to_vec()))
            .await?
            .into_iter()
            .collect();

        let (deleted_ids, missing_ids): (Vec<String>, Vec<String>) = request
            .ids()
            .iter()
            .cloned()
            .partition(|id| removed.contains(id));

        info!(
            "Deleted {} document(s) from collection '{}' ({} not found)",
            deleted_ids.len(),
            self.collection(),
            missing_ids.len()
        );

        Ok(DeletionReport {
            deleted_ids,
            missing_ids,
        })
    }
}
