//! `caduceus health`: probe each dependency and report what is reachable.

use color_eyre::Result;

use crate::config::Config;
use crate::context;

pub async fn run(config: &Config) -> Result<()> {
    let namespace = context::namespace(config);

    match context::key_provider(config) {
        Ok(keys) => match keys.resolve(&namespace).await {
            Ok(_) => println!("Keys: ok ({namespace})"),
            Err(e) => println!("Keys: unavailable ({e})"),
        },
        Err(e) => println!("Keys: unavailable ({e})"),
    }

    match context::index_client(config) {
        Ok(index) => match index.ping().await {
            Ok(()) => println!("Index: ok"),
            Err(e) => println!("Index: unreachable ({e})"),
        },
        Err(e) => println!("Index: unreachable ({e})"),
    }

    let (embedder_name, _) = context::embedder(config);
    println!("Embedder: {embedder_name}");

    let log = context::audit_log(config)?;
    match log.read_all() {
        Ok(entries) => println!("Audit: {} entries at {}", entries.len(), log.path().display()),
        Err(e) => println!("Audit: unreadable ({e})"),
    }

    Ok(())
}
