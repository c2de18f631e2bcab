use crate::{
    api::{self, AdminConfig},
    auth::AuthConfig,
};
use anyhow::{Context, Result};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
}

/// Start the HTTP server.
/// # Errors
/// Returns an error if the DSN is invalid or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = Url::parse(&args.dsn).context("invalid CHIRPY_DSN")?;

    api::new(args.port, dsn.to_string(), args.auth, args.admin).await
}
