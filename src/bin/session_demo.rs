//! Walks one session through its whole life against the configured backend:
//! login, verify, refresh, replay of the old refresh token, logout, verify.
//!
//! $ cargo run --bin session_demo -- --settings=settings/dev.toml

use sessiongate::application_port::*;
use sessiongate::logger::*;
use sessiongate::server::*;
use sessiongate::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&settings.log))?;

    let seed = settings
        .memory
        .seed_users
        .iter()
        .find(|u| u.status == "active")
        .ok_or_else(|| anyhow::anyhow!("settings need an active [[memory.seed_users]] entry"))?;
    let (email, password) = (seed.email.clone(), seed.password.clone());

    let server = Server::try_new(&settings).await?;
    let auth = server.auth_service.clone();
    let ctx = server.request_context();

    let login = auth.login(LoginInput { email, password }, &ctx).await?;
    info!(user_id = %login.user_id, session_id = %login.tokens.session_id, "logged in");

    let identity = auth
        .verify_token(&login.tokens.access_token.0, &ctx)
        .await?;
    info!(?identity, "access token verified");

    let rotated = auth
        .refresh_token(&login.tokens.refresh_token.0, &ctx)
        .await?;
    info!(session_id = %rotated.session_id, "refresh token rotated");

    match auth.refresh_token(&login.tokens.refresh_token.0, &ctx).await {
        Err(e) => info!(error = %e, "replayed refresh token refused"),
        Ok(_) => error!("replayed refresh token was accepted"),
    }

    auth.logout(&rotated.access_token.0, &ctx).await?;
    auth.logout(&rotated.access_token.0, &ctx).await?;
    info!("logged out twice");

    match auth.verify_token(&rotated.access_token.0, &ctx).await {
        Err(e) => info!(error = %e, "revoked access token refused"),
        Ok(_) => error!("revoked access token still verifies"),
    }

    server.shutdown().await;
    Ok(())
}
