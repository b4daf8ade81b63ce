use admin_gate_access::{Principal, Role, SessionStore, hash_password};
use admin_gate_server::{
    app::{AppState, router},
    config::{BootstrapAdmin, ServerConfig},
    db::{PgPrincipalDirectory, PgSessionStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let directory = Arc::new(PgPrincipalDirectory::new(db_pool.clone()));
    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&directory, admin).await;
    }

    // Cleanup expired sessions on startup
    let sessions = Arc::new(PgSessionStore::new(db_pool.clone()));
    match sessions.purge_expired().await {
        Ok(count) if count > 0 => {
            tracing::info!(
                deleted_sessions = count,
                "Cleaned up expired sessions on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions on startup");
        }
    }

    // Spawn periodic session cleanup task
    let cleanup_sessions = Arc::clone(&sessions);
    let cleanup_interval_secs = config.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            match cleanup_sessions.purge_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    let app_state = Arc::new(AppState::new(
        sessions,
        directory,
        &config.gate,
        config.secure_cookies,
    ));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Creates or updates the configured administrator with full access.
async fn bootstrap_admin(directory: &PgPrincipalDirectory, admin: &BootstrapAdmin) {
    let hash = match hash_password(&admin.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to hash bootstrap administrator password");
            return;
        }
    };
    let principal =
        Principal::new(admin.username.clone(), hash).with_roles(vec![Role::administrator()]);
    match directory.upsert(&principal).await {
        Ok(stored) => {
            tracing::info!(principal = %stored.id(), username = %stored.username(), "Bootstrap administrator ready");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create bootstrap administrator");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
