//! Turns raw yt-dlp metadata into the fixed shapes `/api/info` returns.

use crate::models::{
    FormatEntry, FormatKind, InfoResponse, PlaylistDetails, RawFormat, RawInfo, VideoDetails,
};

/// Normalizes a video or playlist record.
pub fn normalize_info(info: RawInfo) -> InfoResponse {
    if info.is_playlist() {
        let videos = info
            .entries
            .into_iter()
            .flatten()
            .map(|entry| video_details(&entry))
            .collect();
        InfoResponse::Playlist(PlaylistDetails {
            id: info.id,
            title: info.title.unwrap_or_else(|| "Untitled Playlist".to_string()),
            videos,
        })
    } else {
        InfoResponse::Video(video_details(&info))
    }
}

pub fn video_details(entry: &RawInfo) -> VideoDetails {
    VideoDetails {
        id: entry.id.clone(),
        title: entry.title.clone(),
        thumbnail_url: entry.thumbnail.clone(),
        duration: format_duration(entry.duration_secs()),
        formats: process_formats(&entry.formats),
    }
}

/// Formats seconds as `H:MM:SS`, or `M:SS` under an hour.
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 0.0) else {
        return "N/A".to_string();
    };
    let total = seconds.trunc() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Drops formats with no playable stream and shapes the rest for the frontend.
pub fn process_formats(formats: &[RawFormat]) -> Vec<FormatEntry> {
    formats.iter().filter_map(format_entry).collect()
}

fn format_entry(format: &RawFormat) -> Option<FormatEntry> {
    let vcodec = codec(format.vcodec.as_deref());
    let acodec = codec(format.acodec.as_deref());
    if vcodec.is_none() && acodec.is_none() {
        return None;
    }
    let kind = if vcodec.is_some() { FormatKind::Video } else { FormatKind::Audio };

    Some(FormatEntry {
        format_id: format.format_id.clone(),
        resolution: resolution(format, kind),
        ext: format.ext.clone(),
        vcodec: vcodec.unwrap_or("none").to_string(),
        acodec: acodec.unwrap_or("none").to_string(),
        filesize: known_size(format.filesize, format.filesize_approx),
        kind,
        note: format.format_note.clone().unwrap_or_default(),
    })
}

/// yt-dlp spells a missing stream as the literal codec `"none"`.
fn codec(value: Option<&str>) -> Option<&str> {
    value.filter(|c| !c.is_empty() && *c != "none")
}

fn resolution(format: &RawFormat, kind: FormatKind) -> String {
    if let Some(resolution) = format.resolution.as_deref().filter(|r| !r.is_empty()) {
        return resolution.to_string();
    }
    // yt-dlp reports 0 for unknown dimensions on some extractors.
    let known = |d: Option<u64>| d.filter(|d| *d > 0);
    match (known(format.width), known(format.height)) {
        (Some(width), Some(height)) => format!("{}x{}", width, height),
        (None, Some(height)) => format!("{}p", height),
        _ => match kind {
            FormatKind::Audio => "audio".to_string(),
            FormatKind::Video => "N/A".to_string(),
        },
    }
}

/// The exact size if reported, else the approximate one.
pub fn known_size(exact: Option<f64>, approx: Option<f64>) -> Option<u64> {
    [exact, approx]
        .into_iter()
        .flatten()
        .find(|size| size.is_finite() && *size > 0.0)
        .map(|size| size as u64)
}
