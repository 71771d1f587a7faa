use anyhow::Result;

use incident_desk::{app, auth::AuthProvider, backend, config, logging, store::IncidentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        backend_mode = ?settings.backend_mode,
        "Starting incident desk"
    );

    let backend = backend::from_settings(&settings)?;

    // Non-blocking health probe; the store copes with an unreachable backend
    tokio::spawn({
        let backend = backend.clone();
        async move {
            match backend.health_check().await {
                Ok(()) => tracing::info!("Backing service is healthy"),
                Err(e) => tracing::warn!(error = %e, "Backing service health check failed - serving cached data until it recovers"),
            }
        }
    });

    let auth = AuthProvider::from_tokens(&settings.api_tokens);
    if !auth.is_enabled() {
        tracing::warn!("API_TOKENS is empty - all routes are open");
    }

    // Serve right away; routes report `loading` until the first load lands
    let store = IncidentStore::new(backend);
    store.start_in_background();

    let state = app::AppState::new(settings.clone(), store.clone(), auth);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.dispose();
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
