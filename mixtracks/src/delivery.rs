//! Diffusion des fichiers audio avec support des requêtes HTTP Range
//!
//! Le corps est lu par blocs bornés, jamais chargé en entier en mémoire.

use crate::error::{Result, TrackError};
use crate::store::TrackStore;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Taille des blocs lus sur le disque
pub const CHUNK_SIZE: usize = 8192;

/// Plage d'octets inclusive `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Nombre d'octets couverts
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Valeur de l'en-tête `Content-Range`
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Type MIME d'un format de piste
pub fn content_type_for(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "opus" => "audio/opus",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}

/// Analyse un en-tête `Range: bytes=START-END` pour un fichier de `total` octets
///
/// `START` absent vaut 0, `END` absent vaut le dernier octet, et `END` est
/// ramené au dernier octet. Une plage illisible ou hors du fichier est
/// refusée en 416.
pub fn parse_range(value: &str, total: u64) -> Result<ByteRange> {
    let unsatisfiable = || TrackError::RangeNotSatisfiable {
        header: value.to_string(),
        total,
    };

    let spec = value.trim().strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    let (start, end) = spec.split_once('-').ok_or_else(unsatisfiable)?;
    let (start, end) = (start.trim(), end.trim());

    if total == 0 {
        return Err(unsatisfiable());
    }
    let last = total - 1;

    let start = if start.is_empty() {
        0
    } else {
        start.parse::<u64>().map_err(|_| unsatisfiable())?
    };
    let end = if end.is_empty() {
        last
    } else {
        end.parse::<u64>().map_err(|_| unsatisfiable())?.min(last)
    };

    if start > end {
        return Err(unsatisfiable());
    }
    Ok(ByteRange { start, end })
}

/// Sert le fichier d'une piste `ready`, entier ou partiel selon `Range`
pub async fn serve_track(store: &TrackStore, id: &str, headers: &HeaderMap) -> Result<Response> {
    let track = store
        .get(id)
        .await
        .ok_or_else(|| TrackError::NotFound(id.to_string()))?;
    if !track.is_ready() {
        return Err(TrackError::NotReady(track.status));
    }

    let path = store.file_path(&track.filename);
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            warn!(track_id = %id, path = %path.display(), "Audio file unavailable: {}", e);
            return Err(TrackError::FileMissing(id.to_string()));
        }
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(TrackError::FileMissing(id.to_string()));
    }
    let total = metadata.len();

    let range = match headers.get(header::RANGE) {
        Some(value) => {
            let value = value.to_str().map_err(|_| TrackError::RangeNotSatisfiable {
                header: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                total,
            })?;
            Some(parse_range(value, total)?)
        }
        None => None,
    };

    let content_type = HeaderValue::from_static(content_type_for(&track.format));

    let (status, length, body) = match range {
        Some(range) => {
            debug!(track_id = %id, start = range.start, end = range.end, "Serving partial content");
            file.seek(std::io::SeekFrom::Start(range.start)).await?;
            let stream = ReaderStream::with_capacity(file.take(range.length()), CHUNK_SIZE);
            (StatusCode::PARTIAL_CONTENT, range.length(), Body::from_stream(stream))
        }
        None => {
            let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);
            (StatusCode::OK, total, Body::from_stream(stream))
        }
    };

    let mut response = (status, body).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::CONTENT_TYPE, content_type);
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(range) = range {
        if let Ok(value) = HeaderValue::from_str(&range.content_range(total)) {
            response_headers.insert(header::CONTENT_RANGE, value);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_range() {
        assert_eq!(
            parse_range("bytes=0-99", 1000).unwrap(),
            ByteRange { start: 0, end: 99 }
        );
    }

    #[test]
    fn test_parse_open_ended_and_clamped() {
        assert_eq!(
            parse_range("bytes=500-", 1000).unwrap(),
            ByteRange { start: 500, end: 999 }
        );
        assert_eq!(
            parse_range("bytes=900-2000", 1000).unwrap(),
            ByteRange { start: 900, end: 999 }
        );
    }

    #[test]
    fn test_missing_start_defaults_to_zero() {
        assert_eq!(
            parse_range("bytes=-100", 1000).unwrap(),
            ByteRange { start: 0, end: 100 }
        );
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        for value in ["bytes=abc", "items=0-10", "bytes=1000-", "bytes=50-10", "bytes=0-1,5-6"] {
            let err = parse_range(value, 1000).unwrap_err();
            assert!(
                matches!(err, TrackError::RangeNotSatisfiable { total: 1000, .. }),
                "{value} should be unsatisfiable"
            );
        }
        assert!(parse_range("bytes=0-", 0).is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("mp3"), "audio/mpeg");
        assert_eq!(content_type_for("FLAC"), "audio/flac");
        assert_eq!(content_type_for("m4a"), "audio/mp4");
        assert_eq!(content_type_for("xyz"), "application/octet-stream");
    }
}
