use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{self, AppState};

/// HTTP front end for the detection pipeline.
pub struct ApiServer {
    state: AppState,
    bind_addr: String,
}

impl ApiServer {
    pub fn new(state: AppState, bind_addr: String) -> Self {
        Self { state, bind_addr }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/check", get(routes::check))
            .route("/api/cooldown", get(routes::get_cooldown))
            .fallback(routes::check)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the task is aborted.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!("Listening on {}", self.bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
