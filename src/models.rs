use serde::{Deserialize, Serialize};

// === API Request Models ===

/// The query parameters for a `GET /api/info` request.
#[derive(Deserialize, Debug, Default)]
pub struct InfoQuery {
    pub url: Option<String>,
}

/// The query parameters shared by both download routes.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub video_id: Option<String>,
    pub format_id: Option<String>,
}

// === yt-dlp Models ===

/// The subset of `yt-dlp --dump-single-json` output this service reads.
///
/// The same shape covers a single video, a playlist (with `entries`) and a
/// single-format resolution (with a direct `url`). Everything is optional
/// because extractors disagree on which fields they fill in.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawInfo {
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Seconds, but left untyped: some extractors report strings or nothing.
    pub duration: Option<serde_json::Value>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    #[serde(default)]
    pub entries: Vec<Option<RawInfo>>,

    // Populated when a single format was requested with `-f`.
    pub url: Option<String>,
    pub ext: Option<String>,
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub resolution: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    /// Total bitrate in KBit/s.
    pub tbr: Option<f64>,
}

impl RawInfo {
    pub fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist")
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_ref().and_then(serde_json::Value::as_f64)
    }
}

/// Represents a single format as reported by yt-dlp.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    pub format_note: Option<String>,
}

// === API Response Models ===

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Video,
    Audio,
}

/// One downloadable variant of a video, as the frontend expects it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FormatEntry {
    pub format_id: Option<String>,
    pub resolution: String,
    pub ext: Option<String>,
    pub vcodec: String,
    pub acodec: String,
    pub filesize: Option<u64>,
    #[serde(rename = "type")]
    pub kind: FormatKind,
    pub note: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: String,
    pub formats: Vec<FormatEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlaylistDetails {
    pub id: Option<String>,
    pub title: String,
    pub videos: Vec<VideoDetails>,
}

/// Body of a successful `GET /api/info`, tagged with `"type"`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InfoResponse {
    Video(VideoDetails),
    Playlist(PlaylistDetails),
}

/// Returned with a 200 when the extractor refuses the URL, so gateways in
/// front of the service don't swap the body for their own error page.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResponse {
    pub message: String,
    pub is_protected: bool,
}

impl ProtectedResponse {
    pub fn new() -> Self {
        ProtectedResponse {
            message: "This content is protected, private, or geo-restricted and could not be fetched."
                .to_string(),
            is_protected: true,
        }
    }
}

impl Default for ProtectedResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum InfoOutcome {
    Found(InfoResponse),
    Protected(ProtectedResponse),
}
