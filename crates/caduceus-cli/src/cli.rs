use std::path::PathBuf;

use caduceus_auth::issuer::DEFAULT_TTL_SECS;
use caduceus_core::identity::Role;
use clap::{Parser, Subcommand};

/// CLI surface for operating a hospital tenant against the gateway.
#[derive(Parser, Debug)]
#[command(
    name = "caduceus",
    about = "Zero-trust tooling for encrypted clinical case exchange",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Bearer token for gateway operations; falls back to CADUCEUS_TOKEN.
    #[arg(long, global = true)]
    pub token: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mint a signed bearer credential.
    Token {
        /// Subject the credential identifies.
        #[arg(long)]
        subject: String,
        /// Role claim: admin, clinician, researcher, or auditor.
        #[arg(long)]
        role: Role,
        /// Credential lifetime in seconds.
        #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
        ttl_secs: i64,
    },
    /// Show the identity carried by the presented credential.
    Whoami,
    /// Seal and store clinical cases in the tenant namespace.
    #[command(subcommand)]
    Ingest(IngestCommand),
    /// Encrypted search within the tenant namespace.
    Search {
        /// Query text; embedded and sealed locally before leaving.
        text: String,
        /// Maximum number of hits.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// List record ids stored in the tenant namespace.
    List,
    /// Fetch one sealed record.
    Fetch {
        case_id: String,
        /// Open the envelope locally with the tenant key.
        #[arg(long)]
        decrypt: bool,
    },
    /// Inspect the audit journal.
    #[command(subcommand)]
    Audit(AuditCommand),
    /// Probe configuration, keys, and collaborators.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum IngestCommand {
    /// Embed and seal one case given on the command line, then store it.
    Case {
        /// Case text to embed and seal.
        text: String,
        /// Case id; generated when omitted.
        #[arg(long)]
        id: Option<String>,
        /// Metadata as a JSON object, sealed alongside the vector.
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Seal and store a JSON document from disk without embedding it.
    File {
        path: PathBuf,
        /// Record id; taken from the document's `case_id` or generated.
        #[arg(long)]
        id: Option<String>,
    },
    /// Batch-ingest a CSV export: every non-empty line becomes one case.
    Csv {
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AuditCommand {
    /// Print totals per actor, role, and action.
    Report,
    /// Print every journal entry in order.
    Timeline,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
