use anyhow::{Context, Result};
use std::sync::Arc;
use supabase_rest::SupabaseClient;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use social_sync::config::Config;
use social_sync::repository::RestRepository;
use social_sync::services::{AuthStore, CultureFeed, CultureStore, JobStore};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,social_sync=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.is_production());

    info!(env = %config.app.env, backend = %config.backend.url, "Starting social-sync");

    let client = SupabaseClient::new(config.backend.clone())
        .context("Failed to create backend client")?;
    let repo = Arc::new(RestRepository::new(client));

    let auth = Arc::new(AuthStore::new(repo.clone(), &config.sync));
    let culture = Arc::new(CultureStore::new(repo.clone(), repo.clone(), &config.sync));
    let jobs = Arc::new(JobStore::new(repo.clone(), repo.clone()));
    let feed = CultureFeed::new(auth.clone(), culture.clone());

    auth.initialize().await;
    if let Some(credentials) = &config.credentials {
        auth.sign_in(&credentials.email, &credentials.password)
            .await
            .context("Failed to sign in")?;
    }

    if let Err(e) = feed.load().await {
        warn!(error = %e, "Initial culture load incomplete");
    }
    if let Err(e) = jobs.fetch_jobs().await {
        warn!(error = %e, "Initial job load failed");
    }

    let snapshot = culture.snapshot().await;
    info!(
        posts = snapshot.posts.len(),
        liked = snapshot.user_likes.len(),
        jobs = jobs.active_jobs().await.len(),
        signed_in = auth.current_user().is_some(),
        "Replica loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = culture.spawn_refresher(
        config.sync.posts_max_age,
        config.sync.refresh_interval,
        shutdown_rx,
    );

    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher.await {
        warn!(error = %e, "Refresher task ended abnormally");
    }

    if auth.current_user().is_some() {
        if let Err(e) = auth.sign_out().await {
            warn!(error = %e, "Sign-out on shutdown failed");
        }
    }

    info!("social-sync stopped");
    Ok(())
}
