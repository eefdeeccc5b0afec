use axum::{
    Router,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::normalize_path::NormalizePath;
use tower_http::set_header::response::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::provider::{Direction, MigrationProvider, MigrationResult, MigrationStatus, ProviderError};

pub mod handlers;
pub mod paths;
pub mod render;

use render::{Layout, Renderer};

/// Request header htmx sends with the id of the element being swapped.
pub const HX_TARGET: HeaderName = HeaderName::from_static("hx-target");

/// Response header htmx turns into client-side events.
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

/// Fires `statusChanged` on `#status`, which re-fetches the table.
pub const REFRESH_STATUS: &str = r##"{"statusChanged":{"target":"#status"}}"##;

// ---------- shared state ----------

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MigrationProvider>,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(provider: Arc<dyn MigrationProvider>, renderer: Renderer) -> Self {
        Self {
            provider,
            renderer: Arc::new(renderer),
        }
    }
}

// ---------- error type ----------

/// Last-resort HTML error used when the templates themselves fail.
pub struct PageErr {
    status: StatusCode,
    message: String,
    layout: Layout,
}

impl PageErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            layout: Layout::Page,
        }
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }

    /// Fragment requests get a bare `<pre>` so htmx does not swap a whole
    /// document into the target region.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
}

impl IntoResponse for PageErr {
    fn into_response(self) -> Response {
        let message = html_escape::encode_text(&self.message);
        let body = match self.layout {
            Layout::Fragment => format!("<pre class=\"error\">{message}</pre>"),
            Layout::Page => {
                format!("<!DOCTYPE html><title>Error</title><pre class=\"error\">{message}</pre>")
            }
        };
        (self.status, Html(body)).into_response()
    }
}

// ---------- operations ----------

/// One provider call, and the template family that renders its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Status,
    Up,
    Down,
    UpTo(i64),
    DownTo(i64),
}

pub enum Outcome {
    Status(Vec<MigrationStatus>),
    Executed(Vec<MigrationResult>),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Status => "status",
            Operation::Up => "up",
            Operation::Down => "down",
            Operation::UpTo(_) => "up_to",
            Operation::DownTo(_) => "down_to",
        }
    }

    /// None for the read-only status view.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Operation::Status => None,
            Operation::Up | Operation::UpTo(_) => Some(Direction::Up),
            Operation::Down | Operation::DownTo(_) => Some(Direction::Down),
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.direction().is_some()
    }

    fn verb(&self) -> String {
        match self {
            Operation::Status => "Migration Status".to_string(),
            Operation::Up => "Migrate Up".to_string(),
            Operation::Down => "Migrate Down".to_string(),
            Operation::UpTo(v) => format!("Migrate Up to {v}"),
            Operation::DownTo(v) => format!("Migrate Down to {v}"),
        }
    }

    pub fn heading(&self) -> String {
        format!("{} Succeeded", self.verb())
    }

    pub fn failure_heading(&self) -> String {
        format!("{} Failed", self.verb())
    }

    /// Exactly one provider call per operation.
    pub async fn invoke(&self, provider: &dyn MigrationProvider) -> Result<Outcome, ProviderError> {
        Ok(match *self {
            Operation::Status => Outcome::Status(provider.status().await?),
            Operation::Up => Outcome::Executed(provider.up().await?),
            Operation::Down => Outcome::Executed(vec![provider.down().await?]),
            Operation::UpTo(version) => Outcome::Executed(provider.up_to(version).await?),
            Operation::DownTo(version) => Outcome::Executed(provider.down_to(version).await?),
        })
    }
}

// ---------- router ----------

/// The dashboard routes, unprefixed and without middleware. Mount them
/// wherever the host application wants.
pub fn pages(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::status))
        .route("/up", post(handlers::up))
        .route("/down", post(handlers::down))
        .route("/up-to/{version}", post(handlers::up_to))
        .route("/down-to/{version}", post(handlers::down_to))
        .with_state(state)
}

/// Standalone server service: pages under the renderer's base path, plus
/// `/health`, request tracing and security headers. Trailing slashes are
/// trimmed before routing, so the normaliser wraps the router rather than
/// being one of its layers.
pub fn dashboard_router(state: AppState) -> NormalizePath<Router> {
    let base = state.renderer.paths().base().to_string();
    let pages = pages(state);
    let app = if base.is_empty() {
        pages
    } else {
        Router::new().nest(&base, pages)
    };

    let app = app
        .route("/health", get(|| async { StatusCode::OK }))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    NormalizePath::trim_trailing_slash(app)
}
