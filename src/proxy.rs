//! Relays a resolved media URL to the client as a file download.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use tokio_stream::StreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::models::RawInfo;
use crate::normalize::known_size;

static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

// RFC 5987 attr-char minus the alphanumerics.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("extractor returned no direct media URL")]
    NoMediaUrl,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

/// Removes the characters that are illegal in filenames on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(name, "").into_owned()
}

/// Builds `"{title} - {quality}.{ext}"` from a resolved format, dropping the
/// quality segment when there is none.
pub fn download_filename(info: &RawInfo) -> String {
    let title = sanitize_filename(info.title.as_deref().unwrap_or("video"));
    let ext = info.ext.as_deref().unwrap_or("mp4");
    let quality = info
        .format_note
        .as_deref()
        .filter(|q| !q.is_empty())
        .or(info.resolution.as_deref())
        .map(sanitize_filename)
        .unwrap_or_default();

    if quality.is_empty() {
        format!("{}.{}", title, ext)
    } else {
        format!("{} - {}.{}", title, quality, ext)
    }
}

/// Sanitizes a client-chosen filename from a pretty download URL.
pub fn pretty_filename(requested: &str) -> String {
    let name = sanitize_filename(requested);
    if name.trim().is_empty() {
        "download".to_string()
    } else {
        name
    }
}

/// Byte size of a resolved format: exact, else approximate, else estimated
/// from the total bitrate (KBit/s) and duration.
pub fn resolve_size(info: &RawInfo) -> Option<u64> {
    known_size(info.filesize, info.filesize_approx).or_else(|| {
        let tbr = info.tbr.filter(|t| t.is_finite() && *t > 0.0)?;
        let duration = info.duration_secs().filter(|d| d.is_finite() && *d > 0.0)?;
        Some(((tbr * duration) / 8.0).trunc() as u64 * 1024)
    })
}

/// `attachment` disposition with an ASCII fallback name plus the exact
/// UTF-8 name in `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

/// Opens `info.url` and streams it back in pieces of at most `chunk_size` bytes.
///
/// The upstream connection lives as long as the response body; a client
/// hanging up drops the body and with it the upstream request.
pub async fn stream_media(
    client: &reqwest::Client,
    info: &RawInfo,
    filename: &str,
    chunk_size: usize,
) -> Result<Response, ProxyError> {
    let media_url = info
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(ProxyError::NoMediaUrl)?;

    let upstream = client.get(media_url).send().await?.error_for_status()?;

    let mut headers = HeaderMap::new();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(filename))?,
    );
    if let Some(size) = resolve_size(info) {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }

    let bytes = upstream.bytes_stream().map(|chunk| chunk.map_err(std::io::Error::other));
    let reader = StreamReader::new(bytes);
    let body = Body::from_stream(ReaderStream::with_capacity(reader, chunk_size.max(1)));

    Ok((headers, body).into_response())
}
