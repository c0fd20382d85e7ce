//! `caduceus token` support.

use caduceus_auth::issuer::TokenIssuer;
use caduceus_core::identity::Role;
use color_eyre::Result;

use crate::config::Config;
use crate::context;

/// Mint a credential and print it on stdout, ready for piping into
/// `--token` or `CADUCEUS_TOKEN`.
pub fn run(subject: &str, role: Role, ttl_secs: i64, config: &Config) -> Result<()> {
    let issuer = TokenIssuer::new(&context::signing_config(config));
    let token = issuer
        .issue(subject, role, ttl_secs)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("{token}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use caduceus_auth::verifier::{SigningConfig, TokenVerifier};

    use super::*;

    #[test]
    fn minted_tokens_verify_against_the_same_config() {
        let config = Config {
            auth: Some(crate::config::AuthConfig { secret: Some("cli-test-secret".into()) }),
            ..Config::default()
        };
        let issuer = TokenIssuer::new(&context::signing_config(&config));
        let token = issuer.issue("dr-house", Role::Clinician, 600).expect("issue");

        let verifier = TokenVerifier::new(&SigningConfig::hs256("cli-test-secret"));
        let identity = verifier.verify(Some(&format!("Bearer {token}"))).expect("verify");
        assert_eq!(identity.subject, "dr-house");
        assert_eq!(identity.role, Role::Clinician);
    }
}
