//! API REST de la bibliothèque de pistes
//!
//! Ce module expose une API REST documentée avec OpenAPI/Swagger pour :
//! - Lancer un téléchargement distant
//! - Envoyer un fichier local
//! - Consulter le catalogue et l'état des pistes
//! - Lire l'audio avec support des requêtes Range
//! - Supprimer une piste

use crate::acquisition::DEFAULT_QUALITY;
use crate::delivery;
use crate::error::{ErrorResponse, Result, TrackError};
use crate::library::TrackLibrary;
use crate::tools::AudioFormat;
use crate::track::{Track, TrackStatus};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}

/// Requête de téléchargement distant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// URL du média
    #[schema(example = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    pub url: String,
    /// Format audio cible
    #[serde(default)]
    pub format: AudioFormat,
    /// Débit mp3 en kbit/s
    #[serde(default = "default_quality")]
    #[schema(example = "192")]
    pub quality: String,
}

/// Réponse au lancement d'un téléchargement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    #[schema(example = "3f9a1c2e")]
    pub track_id: String,
    pub status: TrackStatus,
}

/// Formulaire d'upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Fichier audio (.mp3, .wav, .ogg, .flac)
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Réponse après un upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "3f9a1c2e")]
    pub track_id: String,
    pub status: TrackStatus,
    pub title: Option<String>,
}

/// Réponse de suppression
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    /// Identifiant supprimé
    #[schema(example = "3f9a1c2e")]
    pub deleted: String,
}

/// État du service
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Nombre d'entrées du catalogue
    pub tracks_count: usize,
}

/// Lance un téléchargement distant
///
/// Retourne immédiatement l'identifiant de la piste, en état `downloading`.
/// L'avancement se suit en interrogeant `GET /api/tracks/{id}`.
#[utoipa::path(
    post,
    path = "/api/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Téléchargement lancé", body = DownloadResponse),
        (status = 500, description = "Catalogue impossible à sauvegarder", body = ErrorResponse)
    ),
    tag = "tracks"
)]
pub async fn start_download(
    State(library): State<Arc<TrackLibrary>>,
    Json(req): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>> {
    let track = library
        .start_download(&req.url, req.format, &req.quality)
        .await?;
    Ok(Json(DownloadResponse {
        track_id: track.id,
        status: track.status,
    }))
}

/// Envoie un fichier audio local
///
/// Le champ multipart `file` porte le fichier. La piste est immédiatement `ready`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Fichier enregistré", body = UploadResponse),
        (status = 400, description = "Extension refusée ou formulaire incomplet", body = ErrorResponse),
        (status = 413, description = "Fichier plus gros que la limite configurée", body = ErrorResponse)
    ),
    tag = "tracks"
)]
pub async fn upload_track(
    State(library): State<Arc<TrackLibrary>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let track = library.upload(&original_name, &bytes).await?;
        return Ok(Json(UploadResponse {
            track_id: track.id,
            status: track.status,
            title: track.title,
        }));
    }
    Err(TrackError::BadRequest("Missing 'file' field".to_string()))
}

/// Liste toutes les pistes, quel que soit leur état
#[utoipa::path(
    get,
    path = "/api/tracks",
    responses(
        (status = 200, description = "Catalogue complet", body = Vec<Track>)
    ),
    tag = "tracks"
)]
pub async fn list_tracks(State(library): State<Arc<TrackLibrary>>) -> Json<Vec<Track>> {
    Json(library.list().await)
}

/// Récupère une piste
#[utoipa::path(
    get,
    path = "/api/tracks/{id}",
    params(("id" = String, Path, description = "Identifiant de la piste")),
    responses(
        (status = 200, description = "Piste trouvée", body = Track),
        (status = 404, description = "Piste inconnue", body = ErrorResponse)
    ),
    tag = "tracks"
)]
pub async fn get_track(
    State(library): State<Arc<TrackLibrary>>,
    Path(id): Path<String>,
) -> Result<Json<Track>> {
    Ok(Json(library.get(&id).await?))
}

/// Lit l'audio d'une piste
///
/// Supporte `Range: bytes=START-END` (réponse 206).
#[utoipa::path(
    get,
    path = "/api/tracks/{id}/audio",
    params(
        ("id" = String, Path, description = "Identifiant de la piste"),
        ("Range" = Option<String>, Header, description = "Plage d'octets, ex. bytes=0-1023")
    ),
    responses(
        (status = 200, description = "Fichier complet"),
        (status = 206, description = "Plage d'octets"),
        (status = 400, description = "Piste pas encore prête", body = ErrorResponse),
        (status = 404, description = "Piste ou fichier introuvable", body = ErrorResponse),
        (status = 416, description = "Plage non satisfiable", body = ErrorResponse)
    ),
    tag = "tracks"
)]
pub async fn get_track_audio(
    State(library): State<Arc<TrackLibrary>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    delivery::serve_track(library.store(), &id, &headers).await
}

/// Supprime une piste et son fichier
#[utoipa::path(
    delete,
    path = "/api/tracks/{id}",
    params(("id" = String, Path, description = "Identifiant de la piste")),
    responses(
        (status = 200, description = "Piste supprimée", body = DeleteResponse),
        (status = 404, description = "Piste inconnue", body = ErrorResponse)
    ),
    tag = "tracks"
)]
pub async fn delete_track(
    State(library): State<Arc<TrackLibrary>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let track = library.delete(&id).await?;
    Ok(Json(DeleteResponse { deleted: track.id }))
}

/// État du service
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service opérationnel", body = HealthResponse)
    ),
    tag = "tracks"
)]
pub async fn health(State(library): State<Arc<TrackLibrary>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            tracks_count: library.count().await,
        }),
    )
}

/// Router de l'API, à monter sous `/api`
///
/// `max_upload` borne la taille du corps accepté par `/upload`.
pub fn create_router(library: Arc<TrackLibrary>, max_upload: usize) -> Router {
    Router::new()
        .route("/download", post(start_download))
        .route(
            "/upload",
            post(upload_track).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/tracks", get(list_tracks))
        .route("/tracks/{id}", get(get_track).delete(delete_track))
        .route("/tracks/{id}/audio", get(get_track_audio))
        .route("/health", get(health))
        .with_state(library)
}
