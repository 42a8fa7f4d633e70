//! Delete command handler.

use clap::Args;
use lake_core::AppResult;
use lake_vector::validate::validate_delete;
use lake_vector::{CallOptions, DeleteRequest, DeletionReport, VectorService};

/// Delete documents by id
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DeleteCommand {
    /// Validate the ids before anything is opened.
    pub fn prepare(&self) -> AppResult<DeleteRequest> {
        validate_delete(self.ids.clone())
    }

    pub async fn execute(
        &self,
        service: &VectorService,
        request: DeleteRequest,
        opts: &CallOptions,
    ) -> AppResult<()> {
        tracing::info!("Executing delete command for {} id(s)", request.ids().len());

        let report = service.delete(request, opts).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render_report(&report, service.collection()));
        }

        Ok(())
    }
}

fn render_report(report: &DeletionReport, collection: &str) -> String {
    let mut out = format!(
        "Deleted {} document(s) from collection '{}'.\n",
        report.deleted_ids.len(),
        collection
    );
    if !report.deleted_ids.is_empty() {
        out.push_str(&format!("Deleted: {}\n", report.deleted_ids.join(", ")));
    }
    if !report.missing_ids.is_empty() {
        out.push_str(&format!("Not found: {}\n", report.missing_ids.join(", ")));
    }
    out
}
