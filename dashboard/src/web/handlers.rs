use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use super::{
    AppState, HX_TRIGGER, Operation, Outcome, PageErr, REFRESH_STATUS,
    render::{Layout, RenderError},
};

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    dispatch(&state, &headers, Operation::Status).await
}

pub async fn up(State(state): State<AppState>, headers: HeaderMap) -> Response {
    dispatch(&state, &headers, Operation::Up).await
}

pub async fn down(State(state): State<AppState>, headers: HeaderMap) -> Response {
    dispatch(&state, &headers, Operation::Down).await
}

pub async fn up_to(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> Response {
    match parse_version(&version) {
        Ok(v) => dispatch(&state, &headers, Operation::UpTo(v)).await,
        Err(msg) => bad_version(&state, &headers, "up_to", msg),
    }
}

pub async fn down_to(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> Response {
    match parse_version(&version) {
        Ok(v) => dispatch(&state, &headers, Operation::DownTo(v)).await,
        Err(msg) => bad_version(&state, &headers, "down_to", msg),
    }
}

/// Decimal, optionally signed, must fit in an `i64`.
pub fn parse_version(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|e| format!("Invalid migration version {raw:?}: {e}"))
}

fn bad_version(state: &AppState, headers: &HeaderMap, operation: &str, msg: String) -> Response {
    tracing::warn!(operation, error = %msg, "rejected version path segment");
    let layout = Layout::from_headers(headers);
    respond(
        StatusCode::BAD_REQUEST,
        layout,
        state.renderer.error(layout, "Invalid Version", &msg),
        false,
    )
}

async fn dispatch(state: &AppState, headers: &HeaderMap, operation: Operation) -> Response {
    let layout = match operation {
        Operation::Status => Layout::for_status(headers),
        _ => Layout::from_headers(headers),
    };

    match operation.invoke(state.provider.as_ref()).await {
        Ok(Outcome::Status(statuses)) => respond(
            StatusCode::OK,
            layout,
            state.renderer.status(layout, &statuses),
            false,
        ),
        Ok(Outcome::Executed(results)) => {
            tracing::info!(
                operation = operation.name(),
                executed = results.len(),
                "migration operation complete"
            );
            // Nothing ran, so nothing on screen is stale.
            let refresh = !results.is_empty();
            respond(
                StatusCode::OK,
                layout,
                state.renderer.results(layout, &operation, &results),
                refresh,
            )
        }
        Err(e) => {
            tracing::error!(operation = operation.name(), error = %e, "provider call failed");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                layout,
                state
                    .renderer
                    .error(layout, &operation.failure_heading(), &e.to_string()),
                false,
            )
        }
    }
}

/// A render failure downgrades the response to a 500 and drops the
/// refresh trigger.
fn respond(
    status: StatusCode,
    layout: Layout,
    body: Result<String, RenderError>,
    refresh: bool,
) -> Response {
    match body {
        Ok(html) => {
            let mut res = (status, Html(html)).into_response();
            if refresh {
                res.headers_mut()
                    .insert(HX_TRIGGER, HeaderValue::from_static(REFRESH_STATUS));
            }
            res
        }
        Err(e) => {
            tracing::error!(error = %e, "template rendering failed");
            PageErr::internal(e).with_layout(layout).into_response()
        }
    }
}

// ---------- tests ----------
