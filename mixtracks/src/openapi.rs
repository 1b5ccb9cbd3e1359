//! Documentation OpenAPI pour l'API REST de la bibliothèque de pistes

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API MixDeck Tracks
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::start_download,
        crate::api::upload_track,
        crate::api::list_tracks,
        crate::api::get_track,
        crate::api::get_track_audio,
        crate::api::delete_track,
        crate::api::health,
    ),
    components(
        schemas(
            crate::track::Track,
            crate::track::TrackStatus,
            crate::tools::AudioFormat,
            crate::api::DownloadRequest,
            crate::api::DownloadResponse,
            crate::api::UploadForm,
            crate::api::UploadResponse,
            crate::api::DeleteResponse,
            crate::api::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "tracks", description = "Acquisition et diffusion de pistes audio")
    ),
    info(
        title = "MixDeck Tracks API",
        version = "0.1.0",
        description = r#"
# API de la bibliothèque de pistes

Cette API acquiert des pistes audio (téléchargement distant ou upload) et les
diffuse avec support des requêtes HTTP Range pour la navigation dans le morceau.

## Cycle de vie d'une piste

- `downloading` : le téléchargement distant est en cours
- `ready` : le fichier est disponible
- `error` : l'acquisition a échoué, le diagnostic est dans `error`

Un upload crée directement une piste `ready`.

## Endpoints principaux

### POST /api/download
Lance un téléchargement (`mp3` ou `wav`) et retourne immédiatement l'identifiant

### POST /api/upload
Envoie un fichier `.mp3`, `.wav`, `.ogg` ou `.flac` (champ multipart `file`)

### GET /api/tracks
Liste toutes les pistes, y compris celles en cours ou en échec

### GET /api/tracks/{id}
Récupère une piste

### GET /api/tracks/{id}/audio
Lit l'audio, entier (200) ou partiel avec `Range: bytes=START-END` (206)

### DELETE /api/tracks/{id}
Supprime la piste et son fichier

### GET /api/health
État du service et nombre de pistes
        "#,
        contact(
            name = "MixDeck",
        ),
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
