use lake_core::{AppError, AppResult};
use tracing::{debug, instrument};

use super::{CallOptions, VectorService};
use crate::types::{QueryHit, QueryRequest, QueryResult};

impl VectorService {
    /// Embed the query text and return the store's top matches.
    ///
    /// Results keep the store's order; ties are the store's to break.
    #[instrument(skip(self, request, opts), fields(collection = %self.collection(), top_k = request.top_k()))]
    pub async fn query(&self, request: QueryRequest, opts: &CallOptions) -> AppResult<QueryResult> {
        let top_k = request.top_k();
        if top_k == 0 || top_k > self.max_top_k() {
            return Err(AppError::InvalidTopK(format!(
                "top_k must be between 1 and {}, got {}",
                self.max_top_k(),
                top_k
            )));
        }

        let vector = opts
            .run("embedding", self.embedder.embed(request.text()))
            .await?;

        let mut hits = opts
            .run("store query", self.store.query(vector, top_k))
            .await?;
        hits.truncate(top_k);

        debug!("Query returned {} hits", hits.len());

        Ok(hits.into_iter().map(QueryHit::from).collect())
    }
}
