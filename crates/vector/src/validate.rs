//! Request validation.
//!
//! Turns raw ingestion, query and delete input into typed requests. Every
//! function here is pure: no I/O, no store or backend access. Ingestion
//! checks run in a fixed order and the first failure wins:
//!
//! 1. JSON syntax (legacy blob only)
//! 2. top-level value is an object
//! 3. required keys present
//! 4. field types (metadata entries are normalized here)
//! 5. equal lengths
//! 6. at least one document
//! 7. flat metadata values
//! 8. non-empty ids and texts
//! 9. no repeated ids

use lake_core::{AppError, AppResult};
use serde_json::Value;
use std::collections::HashSet;

use crate::types::{DeleteRequest, IngestionRequest, Metadata, QueryRequest};

const REQUIRED_KEYS: [&str; 3] = ["documents", "metadatas", "ids"];

/// Parse the legacy single-blob form: `{"documents": [...], "metadatas": [...], "ids": [...]}`.
///
/// Each `metadatas` entry may be an object or a `key=value` string.
pub fn parse_ingestion_payload(raw: &str) -> AppResult<IngestionRequest> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| AppError::MalformedJson(e.to_string()))?;

    let object = value.as_object().ok_or_else(|| {
        AppError::MalformedJson("The payload must be a JSON object.".to_string())
    })?;

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingKeys(missing));
    }

    let documents = string_array("documents", &object["documents"])?;
    let metadatas = match &object["metadatas"] {
        Value::Array(items) => items
            .iter()
            .map(metadata_from_value)
            .collect::<AppResult<Vec<_>>>()?,
        _ => {
            return Err(AppError::invalid_field(
                "metadatas",
                "expected an array of objects or key=value strings",
            ))
        }
    };
    let ids = string_array("ids", &object["ids"])?;

    validate_ingestion(documents, metadatas, ids)
}

/// Validate the structured form. The legacy blob converges here too.
pub fn validate_ingestion(
    documents: Vec<String>,
    metadatas: Vec<Metadata>,
    ids: Vec<String>,
) -> AppResult<IngestionRequest> {
    if documents.len() != metadatas.len() || documents.len() != ids.len() {
        return Err(AppError::ShapeMismatch {
            documents: documents.len(),
            metadatas: metadatas.len(),
            ids: ids.len(),
        });
    }

    if ids.is_empty() {
        return Err(AppError::invalid_field(
            "documents",
            "at least one document is required",
        ));
    }

    for metadata in &metadatas {
        ensure_flat(metadata)?;
    }

    if let Some(pos) = ids.iter().position(|id| id.trim().is_empty()) {
        return Err(AppError::invalid_field(
            "ids",
            format!("id at position {} is empty", pos),
        ));
    }

    if let Some(pos) = documents.iter().position(|text| text.trim().is_empty()) {
        return Err(AppError::invalid_field(
            "documents",
            format!("document at position {} is empty", pos),
        ));
    }

    let duplicates = find_duplicates(&ids);
    if !duplicates.is_empty() {
        return Err(AppError::DuplicateIds(duplicates));
    }

    Ok(IngestionRequest::new_unchecked(documents, metadatas, ids))
}

/// Parse one metadata argument: a JSON object or `key=value[,key=value...]`.
///
/// Blank input is an empty mapping. Input starting with `{` only takes the
/// JSON branch.
pub fn parse_metadata(raw: &str) -> AppResult<Metadata> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Metadata::new());
    }

    if trimmed.starts_with('{') {
        return parse_metadata_json(trimmed);
    }

    parse_metadata_pairs(trimmed)
}

fn parse_metadata_json(raw: &str) -> AppResult<Metadata> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::MalformedMetadata(format!("invalid JSON object: {}", e)))?;

    match value {
        Value::Object(map) => {
            ensure_flat(&map)?;
            Ok(map)
        }
        _ => Err(AppError::MalformedMetadata(
            "expected a JSON object".to_string(),
        )),
    }
}

fn parse_metadata_pairs(raw: &str) -> AppResult<Metadata> {
    let mut map = Metadata::new();

    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            AppError::MalformedMetadata(format!("expected key=value, got '{}'", segment))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::MalformedMetadata(format!(
                "empty key in '{}'",
                segment
            )));
        }

        map.insert(key.to_string(), Value::String(value.trim().to_string()));
    }

    Ok(map)
}

/// Normalize one `metadatas` entry of the legacy blob.
fn metadata_from_value(value: &Value) -> AppResult<Metadata> {
    match value {
        Value::Object(map) => {
            ensure_flat(map)?;
            Ok(map.clone())
        }
        Value::String(raw) => parse_metadata(raw),
        other => Err(AppError::MalformedMetadata(format!(
            "expected an object or key=value string, got {}",
            json_type_name(other)
        ))),
    }
}

/// Parse a JSON array of strings passed through a flag such as `--documents`.
pub fn parse_json_list(flag: &str, raw: &str) -> AppResult<Vec<String>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::MalformedJson(format!("{}: {}", flag, e)))?;
    string_array(flag, &value)
}

/// Parse a JSON array of metadata entries passed through `--metadatas`.
pub fn parse_metadata_list(raw: &str) -> AppResult<Vec<Metadata>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::MalformedJson(format!("metadatas: {}", e)))?;

    match value {
        Value::Array(items) => items.iter().map(metadata_from_value).collect(),
        _ => Err(AppError::invalid_field(
            "metadatas",
            "expected a JSON array",
        )),
    }
}

/// Validate a similarity query against the configured maximum.
pub fn validate_query(text: &str, top_k: i64, max_top_k: usize) -> AppResult<QueryRequest> {
    if top_k <= 0 {
        return Err(AppError::InvalidTopK(format!(
            "top_k must be a positive integer, got {}",
            top_k
        )));
    }

    let top_k = usize::try_from(top_k).unwrap_or(usize::MAX);
    if top_k > max_top_k {
        return Err(AppError::InvalidTopK(format!(
            "top_k must not exceed {}, got {}",
            max_top_k, top_k
        )));
    }

    if text.trim().is_empty() {
        return Err(AppError::invalid_field("text", "query text must not be empty"));
    }

    Ok(QueryRequest::new_unchecked(text.to_string(), top_k))
}

/// Validate a delete request. Repeated ids collapse to their first occurrence.
pub fn validate_delete(ids: Vec<String>) -> AppResult<DeleteRequest> {
    if ids.is_empty() {
        return Err(AppError::invalid_field("ids", "at least one id is required"));
    }

    if let Some(pos) = ids.iter().position(|id| id.trim().is_empty()) {
        return Err(AppError::invalid_field(
            "ids",
            format!("id at position {} is empty", pos),
        ));
    }

    let mut seen = HashSet::new();
    let unique: Vec<String> = ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    Ok(DeleteRequest::new_unchecked(unique))
}

fn string_array(field: &str, value: &Value) -> AppResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| AppError::invalid_field(field, "expected an array of strings"))?;

    items
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AppError::invalid_field(
                    field,
                    format!(
                        "element {} is {}, expected a string",
                        pos,
                        json_type_name(item)
                    ),
                )
            })
        })
        .collect()
}

/// Metadata values must be strings, numbers or booleans.
fn ensure_flat(metadata: &Metadata) -> AppResult<()> {
    for (key, value) in metadata {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {}
            other => {
                return Err(AppError::MalformedMetadata(format!(
                    "value for '{}' is {}, expected a string, number or boolean",
                    key,
                    json_type_name(other)
                )))
            }
        }
    }
    Ok(())
}

/// Ids that occur more than once, each listed once, in order of first repeat.
fn find_duplicates(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for id in ids {
        if !seen.insert(id.as_str()) && reported.insert(id.as_str()) {
            duplicates.push(id.clone());
        }
    }

    duplicates
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
