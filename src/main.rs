mod config;
mod editors;
mod error;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();
    let port = config.port;
    let seed_demo = config.seed_demo;
    let state = state::AppState::new(config);

    // Demo data is optional: a failure is logged and the server still starts.
    if seed_demo {
        if let Err(e) = services::seed::seed_demo_now(&state).await {
            tracing::warn!(error = %e, "demo seed failed");
        }
    }

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "kaizen listening");
    axum::serve(listener, app).await
}
