//! `caduceus search`, `list`, `fetch`, and `whoami` support.

use caduceus_gateway::proxy::SearchRequest;
use color_eyre::Result;

use crate::config::Config;
use crate::context;

pub async fn search(
    text: &str,
    limit: usize,
    token: Option<String>,
    config: &Config,
) -> Result<()> {
    let producer = context::producer(config)?;
    let query = producer
        .seal_query(text)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let request =
        SearchRequest { namespace: producer.namespace().to_string(), query, limit };

    let proxy = context::proxy(config)?;
    let hits = proxy
        .search(context::bearer(token).as_deref(), request)
        .await
        .map_err(context::gateway_err)?;

    if hits.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for hit in hits {
        println!("{:.3}  {}", hit.score, hit.record_id);
    }
    Ok(())
}

pub async fn list(token: Option<String>, config: &Config) -> Result<()> {
    let proxy = context::proxy(config)?;
    let records = proxy
        .list(context::bearer(token).as_deref(), &context::namespace(config))
        .await
        .map_err(context::gateway_err)?;

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    for record_id in records {
        println!("{record_id}");
    }
    Ok(())
}

pub async fn fetch(
    case_id: &str,
    decrypt: bool,
    token: Option<String>,
    config: &Config,
) -> Result<()> {
    let proxy = context::proxy(config)?;
    let envelope = proxy
        .fetch(context::bearer(token).as_deref(), &context::namespace(config), case_id)
        .await
        .map_err(context::gateway_err)?;

    if decrypt {
        // Opening happens here, inside the tenant boundary, with the local
        // tenant key. The gateway never saw anything but the envelope.
        let producer = context::producer(config)?;
        let payload = producer
            .open_record(&envelope)
            .await
            .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

pub fn whoami(token: Option<String>, config: &Config) -> Result<()> {
    let gate = context::role_gate(config);
    let identity = gate
        .identify(context::bearer(token).as_deref())
        .map_err(context::gateway_err)?;
    println!("subject: {}", identity.subject);
    println!("role: {}", identity.role);
    Ok(())
}
