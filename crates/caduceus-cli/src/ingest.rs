//! `caduceus ingest` support: the producer pipeline followed by a store
//! through the gateway.

use std::fs;
use std::path::Path;

use caduceus_agent::producer::ClinicalCase;
use color_eyre::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::cli::IngestCommand;
use crate::config::Config;
use crate::context;

pub async fn run(cmd: IngestCommand, token: Option<String>, config: &Config) -> Result<()> {
    match cmd {
        IngestCommand::Case { text, id, metadata } => {
            ingest_case(text, id, metadata, token, config).await
        }
        IngestCommand::File { path, id } => ingest_file(&path, id, token, config).await,
        IngestCommand::Csv { path } => ingest_csv(&path, token, config).await,
    }
}

async fn ingest_case(
    text: String,
    id: Option<String>,
    metadata: Option<String>,
    token: Option<String>,
    config: &Config,
) -> Result<()> {
    let mut case = ClinicalCase::new(id.unwrap_or_else(new_case_id), text);
    if let Some(raw) = metadata {
        let value: Value = serde_json::from_str(&raw)?;
        match value {
            Value::Object(map) => case.metadata = map,
            _ => color_eyre::eyre::bail!("metadata must be a JSON object"),
        }
    }

    let producer = context::producer(config)?;
    let record = producer
        .seal_case(&case)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    store(record, token, config).await
}

async fn ingest_file(
    path: &Path,
    id: Option<String>,
    token: Option<String>,
    config: &Config,
) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&contents)?;
    let case_id = id
        .or_else(|| document.get("case_id").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(new_case_id);

    let producer = context::producer(config)?;
    let record = producer
        .seal_document(&case_id, &document)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    store(record, token, config).await
}

async fn ingest_csv(path: &Path, token: Option<String>, config: &Config) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    let producer = context::producer(config)?;
    let cases = csv_cases(&contents, producer.namespace());

    let proxy = context::proxy(config)?;
    let bearer = context::bearer(token);
    for case in &cases {
        let record = producer
            .seal_case(case)
            .await
            .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
        let receipt = proxy
            .store(bearer.as_deref(), record)
            .await
            .map_err(context::gateway_err)?;
        println!("Stored {} in {}", receipt.record_id, receipt.namespace);
    }
    println!("Ingested {} cases from {}", cases.len(), path.display());
    Ok(())
}

/// Split a CSV export into cases, one per non-empty line. The whole line is
/// the case text (never split on commas); ids carry the namespace and the
/// row position.
fn csv_cases(contents: &str, namespace: &str) -> Vec<ClinicalCase> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| ClinicalCase::new(format!("{namespace}-{idx}"), line))
        .collect()
}

async fn store(
    record: caduceus_core::record::StoredRecord,
    token: Option<String>,
    config: &Config,
) -> Result<()> {
    let proxy = context::proxy(config)?;
    let receipt = proxy
        .store(context::bearer(token).as_deref(), record)
        .await
        .map_err(context::gateway_err)?;
    println!("Stored {} in {}", receipt.record_id, receipt.namespace);
    Ok(())
}

fn new_case_id() -> String {
    Uuid::new_v4().to_string()
}
