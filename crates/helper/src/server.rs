//! HTTP server for a helper.
use crate::{HelperConfig, HelperService, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Extension},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use axum_server::Handle;
use custodia_wire::MIME_TYPE_PROTOBUF;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Serves a helper over HTTP.
#[derive(Debug, Clone)]
pub struct HelperServer {
    service: Arc<HelperService>,
    body_limit: usize,
}

impl HelperServer {
    /// Create a server for a helper service.
    pub fn new(service: Arc<HelperService>, body_limit: usize) -> Self {
        Self {
            service,
            body_limit,
        }
    }

    /// Create a server and its service from a config.
    pub fn from_config(config: &HelperConfig) -> Self {
        Self::new(
            Arc::new(HelperService::new(config.name.clone(), config.policy)),
            config.body_limit,
        )
    }

    /// Service handling requests.
    pub fn service(&self) -> &Arc<HelperService> {
        &self.service
    }

    /// Start the server running on HTTP.
    pub async fn start(&self, addr: SocketAddr, handle: Handle) -> Result<()> {
        let app = self.router();
        tracing::info!(
            helper = %self.service.name(),
            addr = %addr,
            "helper_server::start",
        );
        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
        Ok(())
    }

    /// Router exposing the helper endpoint under `/api/v1`.
    pub fn router(&self) -> Router {
        let v1 = Router::new()
            .route("/helper", post(helper))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .on_request(DefaultOnRequest::new().level(Level::TRACE))
                    .on_response(DefaultOnResponse::new().level(Level::TRACE)),
            )
            .layer(Extension(Arc::clone(&self.service)));
        Router::new().nest("/api/v1", v1)
    }
}

async fn helper(
    Extension(service): Extension<Arc<HelperService>>,
    body: Bytes,
) -> impl IntoResponse {
    if service.is_retired() {
        return StatusCode::GONE.into_response();
    }
    match service.handle_bytes(&body) {
        Ok(response) => {
            ([(CONTENT_TYPE, MIME_TYPE_PROTOBUF)], response).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "helper_server::bad_request");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}
