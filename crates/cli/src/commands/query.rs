//! Query command handler.

use clap::Args;
use lake_core::AppResult;
use lake_vector::validate::validate_query;
use lake_vector::{CallOptions, QueryHit, QueryRequest, VectorService};

/// Query the collection for similar documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    #[arg(long)]
    pub text: String,

    /// Number of results to return
    #[arg(short = 'k', long, default_value_t = 5, allow_negative_numbers = true)]
    pub top_k: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    /// Validate text and `top_k` against the configured maximum.
    pub fn prepare(&self, max_top_k: usize) -> AppResult<QueryRequest> {
        validate_query(&self.text, self.top_k, max_top_k)
    }

    pub async fn execute(
        &self,
        service: &VectorService,
        request: QueryRequest,
        opts: &CallOptions,
    ) -> AppResult<()> {
        tracing::info!("Executing query command (top_k={})", self.top_k);

        let hits = service.query(request, opts).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        } else {
            print!("{}", render_hits(&hits));
        }

        Ok(())
    }
}

fn render_hits(hits: &[QueryHit]) -> String {
    if hits.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{}. {} (score: {:.4})\n", rank + 1, hit.id, hit.score));
        out.push_str(&format!("   {}\n", hit.text));
        if !hit.metadata.is_empty() {
            out.push_str(&format!(
                "   metadata: {}\n",
                serde_json::Value::Object(hit.metadata.clone())
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lake_vector::Metadata;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        cmd: QueryCommand,
    }

    #[test]
    fn test_default_top_k() {
        let cmd = Harness::try_parse_from(["query", "--text", "hello"]).unwrap().cmd;
        assert_eq!(cmd.top_k, 5);
        assert!(!cmd.json);
    }

    #[test]
    fn test_non_positive_top_k_reaches_validation() {
        let cmd = Harness::try_parse_from(["query", "--text", "hello", "--top-k", "-1"])
            .unwrap()
            .cmd;
        assert_eq!(cmd.top_k, -1);
        assert!(cmd.prepare(100).is_err());
    }

    #[test]
    fn test_render_hits() {
        let mut metadata = Metadata::new();
        metadata.insert("lang".to_string(), serde_json::json!("en"));

        let out = render_hits(&[
            QueryHit {
                id: "a".to_string(),
                text: "alpha".to_string(),
                metadata,
                score: 0.9,
            },
            QueryHit {
                id: "b".to_string(),
                text: "beta".to_string(),
                metadata: Metadata::new(),
                score: 0.5,
            },
        ]);

        assert!(out.starts_with("1. a (score: 0.9000)\n   alpha\n   metadata: {\"lang\":\"en\"}\n"));
        assert!(out.contains("2. b (score: 0.5000)\n   beta\n"));
        assert_eq!(render_hits(&[]), "No results.\n");
    }
}
