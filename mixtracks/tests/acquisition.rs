mod common;

use common::{FakeDownloader, FakeProber, Outcome, open_library, wait_settled};
use mixtracks::track::{PENDING_TITLE, UNKNOWN, UPLOAD_SOURCE};
use mixtracks::{AudioFormat, RemoteInfo, TrackError, TrackStatus};
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn download_returns_immediately_then_becomes_ready() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gate = Arc::new(Notify::new());
    let downloader = FakeDownloader::writing("mp3")
        .with_info(RemoteInfo {
            title: Some("Track Title".into()),
            uploader: Some("Channel".into()),
            artist: None,
            duration: Some(212.0),
        })
        .gated(gate.clone());
    let library = open_library(dir.path(), downloader, FakeProber(None)).await?;

    let track = library
        .start_download("https://example.com/v", AudioFormat::Mp3, "192")
        .await?;
    assert_eq!(track.status, TrackStatus::Downloading);
    assert_eq!(track.title.as_deref(), Some(PENDING_TITLE));
    assert_eq!(library.get(&track.id).await?.status, TrackStatus::Downloading);

    gate.notify_one();
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Ready);
    assert_eq!(done.filename, format!("{}.mp3", track.id));
    assert_eq!(done.format, "mp3");
    assert_eq!(done.title.as_deref(), Some("Track Title"));
    assert_eq!(done.artist.as_deref(), Some("Channel"));
    assert_eq!(done.duration, Some(212.0));
    assert_eq!(done.url_source, "https://example.com/v");
    assert!(dir.path().join(&done.filename).exists());

    Ok(())
}

#[tokio::test]
async fn failed_download_keeps_record_with_diagnostic() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let downloader = FakeDownloader::failing("ERROR: [generic] Unsupported URL: https://nope");
    let library = open_library(dir.path(), downloader, FakeProber(None)).await?;

    let track = library
        .start_download("https://nope", AudioFormat::Wav, "192")
        .await?;
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Error);
    assert_eq!(
        done.error.as_deref(),
        Some("ERROR: [generic] Unsupported URL: https://nope")
    );
    assert_eq!(library.list().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn panicking_worker_leaves_an_error_record() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let downloader = FakeDownloader {
        info: None,
        outcome: Outcome::Panic("extractor crashed".into()),
        gate: None,
    };
    let library = open_library(dir.path(), downloader, FakeProber(None)).await?;

    let track = library
        .start_download("https://example.com/v", AudioFormat::Mp3, "192")
        .await?;
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Error);
    let diagnostic = done.error.expect("diagnostic");
    assert!(!diagnostic.is_empty());
    assert!(diagnostic.contains("extractor crashed"));
    assert_eq!(done.title.as_deref(), Some(UNKNOWN));

    // l'échec est persisté
    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(
        dir.path().join(mixtracks::store::DEFAULT_DB_FILE),
    )?)?;
    assert_eq!(saved[&track.id]["status"], "error");

    Ok(())
}

#[tokio::test]
async fn different_output_extension_is_located() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let library = open_library(dir.path(), FakeDownloader::writing("m4a"), FakeProber(None)).await?;

    let track = library
        .start_download("https://example.com/v", AudioFormat::Mp3, "320")
        .await?;
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Ready);
    assert_eq!(done.filename, format!("{}.m4a", track.id));
    assert_eq!(done.format, "m4a");

    Ok(())
}

#[tokio::test]
async fn missing_output_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let downloader = FakeDownloader {
        info: None,
        outcome: Outcome::Nothing,
        gate: None,
    };
    let library = open_library(dir.path(), downloader, FakeProber(None)).await?;

    let track = library
        .start_download("https://example.com/v", AudioFormat::Mp3, "192")
        .await?;
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Error);
    assert_eq!(done.error.as_deref(), Some("File not found after download"));

    Ok(())
}

#[tokio::test]
async fn metadata_failure_is_not_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let library = open_library(dir.path(), FakeDownloader::writing("wav"), FakeProber(None)).await?;

    let track = library
        .start_download("https://example.com/v", AudioFormat::Wav, "192")
        .await?;
    let done = wait_settled(&library, &track.id).await;

    assert_eq!(done.status, TrackStatus::Ready);
    assert_eq!(done.title.as_deref(), Some(UNKNOWN));
    assert!(done.artist.is_none());
    assert!(done.duration.is_none());

    Ok(())
}

#[tokio::test]
async fn upload_stores_file_and_probes_duration() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let library = open_library(
        dir.path(),
        FakeDownloader::writing("mp3"),
        FakeProber(Some(95.5)),
    )
    .await?;

    let track = library.upload("My Mix.FLAC", b"fLaC data").await?;

    assert_eq!(track.status, TrackStatus::Ready);
    assert_eq!(track.filename, format!("{}.flac", track.id));
    assert_eq!(track.format, "flac");
    assert_eq!(track.title.as_deref(), Some("My Mix"));
    assert_eq!(track.url_source, UPLOAD_SOURCE);
    assert_eq!(track.duration, Some(95.5));
    assert_eq!(std::fs::read(dir.path().join(&track.filename))?, b"fLaC data");

    Ok(())
}

#[tokio::test]
async fn upload_survives_probe_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let library = open_library(dir.path(), FakeDownloader::writing("mp3"), FakeProber(None)).await?;

    let track = library.upload("take.ogg", b"OggS").await?;

    assert_eq!(track.status, TrackStatus::Ready);
    assert!(track.duration.is_none());

    Ok(())
}

#[tokio::test]
async fn unsupported_upload_creates_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let library = open_library(dir.path(), FakeDownloader::writing("mp3"), FakeProber(None)).await?;

    let err = library.upload("clip.mp4", b"ftyp").await.unwrap_err();

    assert!(matches!(err, TrackError::UnsupportedFormat { ref extension, .. } if extension == ".mp4"));
    assert!(library.list().await.is_empty());
    let files: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with("tracks_db.json"))
        .collect();
    assert!(files.is_empty());

    Ok(())
}
