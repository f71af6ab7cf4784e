use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use newsroom_agent::core::config::AppPaths;
use newsroom_agent::core::logging;
use newsroom_agent::server;
use newsroom_agent::session::spawn_eviction_task;
use newsroom_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "server.log");

    let state = AppState::initialize_with(paths).await?;

    if spawn_eviction_task(state.sessions.clone()).is_some() {
        tracing::info!("Idle session eviction enabled");
    }

    let bind_addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
