//! HTTP routes and middleware

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use super::manifest::Manifest;
use crate::credentials;
use crate::gateway::SubtitleGateway;
use crate::ratelimit::{RateLimiter, resolve_client_identity};
use crate::types::{Credentials, SubtitleItem};
use crate::GatewayError;

/// Response header reporting whether the body came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

const ALLOWED_METHODS: &str = "GET, HEAD";
const ALLOWED_HEADERS: &str =
    "Content-Type, X-Requested-With, Accept, Accept-Language, Accept-Encoding, Content-Language, Origin";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SubtitleGateway>,
    pub limiter: Arc<RateLimiter>,
}

/// Build the add-on router.
///
/// Every route is rate limited before anything else runs, except CORS
/// preflights, which are answered directly. The access log wraps both so
/// rejected requests are logged too.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/manifest.json", get(manifest))
        .route("/{config}/manifest.json", get(configured_manifest))
        .route("/{config}/subtitles/{kind}/{id}", get(subtitles))
        .route("/{config}/subtitles/{kind}/{id}/{extra}", get(subtitles_with_extra))
        .route("/serve-subtitle/{kind}/{media_id}", get(serve_subtitle))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn(cors))
        .layer(from_fn(access_log))
        .with_state(state)
}

/// A [`GatewayError`] rendered as a JSON error body with its HTTP status.
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "request failed");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct SubtitlesResponse<'a> {
    subtitles: &'a [SubtitleItem],
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "path": "/" }))
}

async fn manifest() -> Json<Manifest> {
    Json(Manifest::new(false))
}

async fn configured_manifest(Path(config): Path<String>) -> ApiResult<Json<Manifest>> {
    decode_user_config(&config)?;
    Ok(Json(Manifest::new(true)))
}

async fn subtitles(
    State(state): State<AppState>,
    Path((config, kind, id)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    find_subtitles(&state, &config, &kind, &id).await
}

/// Stremio appends `videoHash=..&videoSize=...json` for local files; the
/// extra arguments do not change the lookup.
async fn subtitles_with_extra(
    State(state): State<AppState>,
    Path((config, kind, id, _extra)): Path<(String, String, String, String)>,
) -> ApiResult<Response> {
    find_subtitles(&state, &config, &kind, &id).await
}

async fn find_subtitles(state: &AppState, config: &str, kind: &str, id: &str) -> ApiResult<Response> {
    let credentials = decode_user_config(config)?;
    let video_id = id.strip_suffix(".json").unwrap_or(id);

    let lookup = state.gateway.search(video_id, &credentials).await?;
    debug!(kind, video_id, count = lookup.value.len(), cache = %lookup.cache, "subtitles listed");

    let body = Json(SubtitlesResponse {
        subtitles: &lookup.value,
    });
    Ok(([(CACHE_STATUS_HEADER, lookup.cache.as_str())], body).into_response())
}

async fn serve_subtitle(
    State(state): State<AppState>,
    Path((kind, media_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let lookup = state.gateway.download(&kind, &media_id).await?;
    let file = lookup.value;
    let cache_status = (
        HeaderName::from_static(CACHE_STATUS_HEADER),
        lookup.cache.as_str().to_string(),
    );
    let last_modified = (header::LAST_MODIFIED, file.fetched_at.format(HTTP_DATE).to_string());

    if not_modified_since(&headers, file.fetched_at) {
        return Ok((StatusCode::NOT_MODIFIED, [cache_status, last_modified]).into_response());
    }

    Ok((
        [
            cache_status,
            last_modified,
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", file.file_name()),
            ),
        ],
        file.content,
    )
        .into_response())
}

/// Whether `If-Modified-Since` covers `modified`, at HTTP-date resolution.
fn not_modified_since(headers: &HeaderMap, modified: DateTime<Utc>) -> bool {
    header_str(headers, header::IF_MODIFIED_SINCE.as_str())
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .is_some_and(|since| modified.timestamp() <= since.timestamp())
}

/// The path segment carrying the account is an opaque credential token.
/// A token that does not decode is an authentication failure.
fn decode_user_config(config: &str) -> Result<Credentials, GatewayError> {
    credentials::decode(config)
        .map_err(|e| GatewayError::AuthenticationFailed(format!("cannot decode user config: {e}")))
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let identity = resolve_client_identity(
        header_str(req.headers(), "x-forwarded-for"),
        header_str(req.headers(), "x-real-ip"),
        peer,
    )
    .and_then(|identity| state.limiter.check(&identity));

    match identity {
        Ok(()) => next.run(req).await,
        Err(e) => ApiError(e).into_response(),
    }
}

/// Any origin may read responses; preflights get the allowed methods and
/// headers without reaching a route.
async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        (
            StatusCode::NO_CONTENT,
            [
                (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
                (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
            ],
        )
            .into_response()
    } else {
        next.run(req).await
    };
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = redact_path(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    let cache = header_str(response.headers(), CACHE_STATUS_HEADER).unwrap_or("-");
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        cache,
        latency_ms = start.elapsed().as_millis(),
        "request"
    );
    response
}

/// Mask the credential segment of configured routes.
fn redact_path(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    match (segments.next(), segments.next()) {
        (Some(config), Some(rest))
            if !config.is_empty()
                && (rest == "manifest.json" || rest.starts_with("subtitles/")) =>
        {
            format!("/***/{rest}")
        }
        _ => path.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
