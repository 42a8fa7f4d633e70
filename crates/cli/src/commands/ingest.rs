//! Ingest command handler.
//!
//! Accepts documents either through structured flags or as one legacy JSON
//! payload (`{"documents": [...], "metadatas": [...], "ids": [...]}`) given
//! positionally or on stdin. Both forms go through the same validation.

use clap::Args;
use lake_core::{AppError, AppResult};
use lake_vector::validate::{
    parse_ingestion_payload, parse_json_list, parse_metadata, parse_metadata_list,
    validate_ingestion,
};
use lake_vector::{CallOptions, IngestionRequest, Metadata, VectorService};
use std::io::Read;

/// Ingest documents into the collection
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Legacy JSON payload with documents, metadatas and ids ("-" reads stdin)
    #[arg(
        value_name = "PAYLOAD",
        conflicts_with_all = ["document", "documents", "id", "ids", "metadata", "metadatas"]
    )]
    pub payload: Option<String>,

    /// Document text (repeatable)
    #[arg(long, conflicts_with = "documents")]
    pub document: Vec<String>,

    /// Document texts as a JSON array
    #[arg(long, value_name = "JSON")]
    pub documents: Option<String>,

    /// Document id (repeatable, aligned with --document)
    #[arg(long, conflicts_with = "ids")]
    pub id: Vec<String>,

    /// Document ids as a JSON array
    #[arg(long, value_name = "JSON")]
    pub ids: Option<String>,

    /// Metadata as a JSON object or key=value list (repeatable, one per document)
    #[arg(long, conflicts_with = "metadatas")]
    pub metadata: Vec<String>,

    /// Metadata entries as a JSON array
    #[arg(long, value_name = "JSON")]
    pub metadatas: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    /// Read and validate the input. Reads stdin for the legacy payload form.
    pub fn prepare(&self) -> AppResult<IngestionRequest> {
        self.build_request(read_stdin)
    }

    pub async fn execute(
        &self,
        service: &VectorService,
        request: IngestionRequest,
        opts: &CallOptions,
    ) -> AppResult<()> {
        tracing::info!("Executing ingest command ({} document(s))", request.len());

        let report = service.ingest(request, opts).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "Added {} document(s) to collection '{}'.",
                report.count, report.collection
            );
        }

        Ok(())
    }

    fn has_structured_input(&self) -> bool {
        !self.document.is_empty()
            || self.documents.is_some()
            || !self.id.is_empty()
            || self.ids.is_some()
            || !self.metadata.is_empty()
            || self.metadatas.is_some()
    }

    /// Turn the parsed arguments into a validated request.
    fn build_request<F>(&self, stdin: F) -> AppResult<IngestionRequest>
    where
        F: FnOnce() -> AppResult<String>,
    {
        match self.payload.as_deref() {
            Some("-") => return parse_ingestion_payload(&stdin()?),
            Some(raw) => return parse_ingestion_payload(raw),
            None if !self.has_structured_input() => {
                tracing::debug!("No structured flags given, reading payload from stdin");
                return parse_ingestion_payload(&stdin()?);
            }
            None => {}
        }

        let documents = match &self.documents {
            Some(raw) => parse_json_list("documents", raw)?,
            None => self.document.clone(),
        };

        let ids = match &self.ids {
            Some(raw) => parse_json_list("ids", raw)?,
            None => self.id.clone(),
        };

        let metadatas = match &self.metadatas {
            Some(raw) => parse_metadata_list(raw)?,
            None if self.metadata.is_empty() => vec![Metadata::new(); documents.len()],
            None => self
                .metadata
                .iter()
                .map(|raw| parse_metadata(raw))
                .collect::<AppResult<Vec<_>>>()?,
        };

        validate_ingestion(documents, metadatas, ids)
    }
}

fn read_stdin() -> AppResult<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Err(AppError::MalformedJson(
            "No payload provided on stdin.".to_string(),
        ));
    }
    Ok(buf)
}
