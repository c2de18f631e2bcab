use crate::{
    api::AdminConfig,
    auth::AuthConfig,
    cli::actions::{server::Args, Action},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let token_secret = matches
        .get_one::<String>("token-secret")
        .cloned()
        .context("missing required argument: --token-secret")?;

    let api_key = matches
        .get_one::<String>("api-key")
        .filter(|key| !key.trim().is_empty())
        .map(|key| SecretString::from(key.trim().to_string()));

    let mut auth = AuthConfig::new(SecretString::from(token_secret)).with_api_key(api_key);
    if let Some(issuer) = matches.get_one::<String>("issuer") {
        auth = auth.with_issuer(issuer.clone());
    }
    if let Some(seconds) = matches.get_one::<i64>("session-ttl-seconds") {
        auth = auth.with_session_ttl_seconds(*seconds);
    }
    if let Some(seconds) = matches.get_one::<i64>("refresh-ttl-seconds") {
        auth = auth.with_refresh_ttl_seconds(*seconds);
    }

    let platform = matches
        .get_one::<String>("platform")
        .cloned()
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        dsn,
        auth,
        admin: AdminConfig::new(platform),
    }))
}
