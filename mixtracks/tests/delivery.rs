mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use common::{FakeDownloader, FakeProber, open_library};
use mixtracks::api::create_router;
use tower::ServiceExt;

async fn setup() -> anyhow::Result<(tempfile::TempDir, Router, String, Vec<u8>)> {
    let dir = tempfile::tempdir()?;
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(dir.path().join("sample.mp3"), &content)?;

    let library = open_library(dir.path(), FakeDownloader::writing("mp3"), FakeProber(None)).await?;
    let id = library.list().await[0].id.clone();
    let app = create_router(library, 1024 * 1024);
    Ok((dir, app, id, content))
}

fn audio(id: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/tracks/{id}/audio"));
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn full_file_without_range() -> anyhow::Result<()> {
    let (_dir, app, id, content) = setup().await?;

    let response = app.oneshot(audio(&id, None)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "1000");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), content.as_slice());

    Ok(())
}

#[tokio::test]
async fn first_hundred_bytes() -> anyhow::Result<()> {
    let (_dir, app, id, content) = setup().await?;

    let response = app.oneshot(audio(&id, Some("bytes=0-99"))).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "100");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), &content[..100]);

    Ok(())
}

#[tokio::test]
async fn end_beyond_file_is_clamped() -> anyhow::Result<()> {
    let (_dir, app, id, content) = setup().await?;

    let response = app.oneshot(audio(&id, Some("bytes=900-2000"))).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 900-999/1000");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "100");

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), &content[900..]);

    Ok(())
}

#[tokio::test]
async fn open_ended_range_reads_to_the_end() -> anyhow::Result<()> {
    let (_dir, app, id, content) = setup().await?;

    let response = app.oneshot(audio(&id, Some("bytes=500-"))).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 500-999/1000");

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.len(), 500);
    assert_eq!(body.as_ref(), &content[500..]);

    Ok(())
}

#[tokio::test]
async fn unsatisfiable_range_is_416() -> anyhow::Result<()> {
    let (_dir, app, id, _content) = setup().await?;

    let response = app.clone().oneshot(audio(&id, Some("bytes=5000-"))).await?;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");

    let response = app.oneshot(audio(&id, Some("bytes=garbage"))).await?;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);

    Ok(())
}

#[tokio::test]
async fn unknown_track_and_missing_file_are_404() -> anyhow::Result<()> {
    let (dir, app, id, _content) = setup().await?;

    let response = app.clone().oneshot(audio("deadbeef", None)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    std::fs::remove_file(dir.path().join("sample.mp3"))?;
    let response = app.oneshot(audio(&id, None)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
