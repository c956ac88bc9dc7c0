use crate::{
    error::AppError,
    models::{DownloadQuery, InfoOutcome, InfoQuery, ProtectedResponse, RawInfo},
    normalize::normalize_info,
    proxy::{self, ProxyError},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

// ===================================================================
//                          INFO HANDLER
// ===================================================================

/// # GET /api/info - Metadata for a video or a playlist.
pub async fn get_info(
    State(state): State<AppState>,
    Query(params): Query<InfoQuery>,
) -> Result<Json<InfoOutcome>, AppError> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("URL parameter is missing.".to_string()))?;
    tracing::info!("Fetching info for URL: {}", url);

    match state.extractor.extract_info(&url).await {
        Ok(info) => {
            let response = normalize_info(info);
            Ok(Json(InfoOutcome::Found(response)))
        }
        Err(e) if e.is_unavailable() => {
            tracing::error!("Extraction refused for {}: {}", url, e);
            Ok(Json(InfoOutcome::Protected(ProtectedResponse::new())))
        }
        Err(e) => {
            tracing::error!("Unexpected failure fetching info for {}", url);
            Err(AppError::Internal(e.into()))
        }
    }
}

// ===================================================================
//                          DOWNLOAD HANDLERS
// ===================================================================

/// # GET /api/download - Streams one format under a title-derived filename.
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let (video_id, format_id) = required_ids(params)?;
    let failure = || AppError::Download(format!("Failed to process download for format {}.", format_id));

    let info = resolve(&state, &video_id, &format_id).await.ok_or_else(failure)?;
    let filename = proxy::download_filename(&info);

    proxy_download(&state, &info, &filename, &video_id, &format_id)
        .await
        .ok_or_else(failure)
}

/// # GET /download/*filename - Same stream, named after the URL path.
pub async fn download_pretty(
    State(state): State<AppState>,
    Path(requested): Path<String>,
    Query(params): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let (video_id, format_id) = required_ids(params)?;
    let failure = || AppError::Download(format!("Failed to process download for {}.", requested));

    let info = resolve(&state, &video_id, &format_id).await.ok_or_else(failure)?;
    let filename = proxy::pretty_filename(&requested);

    proxy_download(&state, &info, &filename, &video_id, &format_id)
        .await
        .ok_or_else(failure)
}

// ===================================================================
//                          HELPER FUNCTIONS
// ===================================================================

fn required_ids(params: DownloadQuery) -> Result<(String, String), AppError> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    match (non_empty(params.video_id), non_empty(params.format_id)) {
        (Some(video_id), Some(format_id)) => Ok((video_id, format_id)),
        _ => Err(AppError::BadRequest(
            "videoId and formatId parameters are required.".to_string(),
        )),
    }
}

/// Resolves a single format; failures are logged here and surface to the
/// client only as a generic download error.
async fn resolve(state: &AppState, video_id: &str, format_id: &str) -> Option<RawInfo> {
    let url = state.config.watch_url(video_id);
    match state.extractor.resolve_format(&url, format_id).await {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::error!("Failed to resolve format {} of {}: {}", format_id, video_id, e);
            None
        }
    }
}

async fn proxy_download(
    state: &AppState,
    info: &RawInfo,
    filename: &str,
    video_id: &str,
    format_id: &str,
) -> Option<Response> {
    tracing::info!("Proxying format {} of {} as '{}'", format_id, video_id, filename);
    let result = proxy::stream_media(&state.http, info, filename, state.config.chunk_size).await;
    match result {
        Ok(response) => Some(response),
        Err(ProxyError::NoMediaUrl) => {
            tracing::error!("No direct media URL for format {} of {}", format_id, video_id);
            None
        }
        Err(e) => {
            tracing::error!("Failed to proxy format {} of {}: {}", format_id, video_id, e);
            None
        }
    }
}
