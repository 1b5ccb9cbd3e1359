//! Gestion des erreurs de la bibliothèque de pistes

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::track::TrackStatus;

/// Type Result personnalisé pour mixtracks
pub type Result<T> = std::result::Result<T, TrackError>;

/// Erreurs possibles de la bibliothèque de pistes
#[derive(Error, Debug)]
pub enum TrackError {
    /// Identifiant inconnu du catalogue
    #[error("Track not found")]
    NotFound(String),

    /// La piste existe mais n'est pas `ready`
    #[error("Track not ready: {0}")]
    NotReady(TrackStatus),

    /// Le catalogue annonce un fichier absent du disque
    #[error("Audio file not found")]
    FileMissing(String),

    /// Extension refusée à l'upload
    #[error("Unsupported format: {extension}. Use: {allowed}")]
    UnsupportedFormat { extension: String, allowed: String },

    /// Requête mal formée (multipart incomplet, ...)
    #[error("{0}")]
    BadRequest(String),

    /// Corps multipart illisible ou trop volumineux
    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),

    /// En-tête Range impossible à satisfaire
    #[error("Range not satisfiable: {header}")]
    RangeNotSatisfiable { header: String, total: u64 },

    /// Échec d'un outil externe (téléchargeur, sonde)
    #[error("{tool} failed: {diagnostic}")]
    Tool { tool: String, diagnostic: String },

    /// Le téléchargement a réussi mais aucun fichier n'a été produit
    #[error("File not found after download")]
    OutputMissing,

    /// Erreur d'entrée/sortie
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de (dé)sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackError {
    /// Code HTTP associé à l'erreur
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackError::NotFound(_) | TrackError::FileMissing(_) => StatusCode::NOT_FOUND,
            TrackError::NotReady(_)
            | TrackError::UnsupportedFormat { .. }
            | TrackError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TrackError::Multipart(e) => e.status(),
            TrackError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            TrackError::Tool { .. }
            | TrackError::OutputMissing
            | TrackError::Io(_)
            | TrackError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code symbolique renvoyé dans le corps JSON
    pub fn code(&self) -> &'static str {
        match self {
            TrackError::NotFound(_) => "NOT_FOUND",
            TrackError::NotReady(_) => "NOT_READY",
            TrackError::FileMissing(_) => "FILE_MISSING",
            TrackError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TrackError::BadRequest(_) | TrackError::Multipart(_) => "INVALID_REQUEST",
            TrackError::RangeNotSatisfiable { .. } => "RANGE_NOT_SATISFIABLE",
            TrackError::Tool { .. } => "TOOL_ERROR",
            TrackError::OutputMissing => "OUTPUT_MISSING",
            TrackError::Io(_) => "IO_ERROR",
            TrackError::Json(_) => "JSON_ERROR",
        }
    }

    /// Diagnostic à stocker dans le champ `error` d'une piste en échec
    ///
    /// Pour un outil externe, seul son flux d'erreur tronqué est conservé.
    pub fn diagnostic(&self) -> String {
        match self {
            TrackError::Tool { diagnostic, .. } if !diagnostic.is_empty() => diagnostic.clone(),
            other => other.to_string(),
        }
    }
}

/// Réponse d'erreur générique
///
/// Le message est publié sous `detail`, la clé lue par le frontend.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Code d'erreur
    #[schema(example = "NOT_FOUND")]
    pub error: String,
    /// Message descriptif
    #[schema(example = "Track not found")]
    pub detail: String,
}

impl IntoResponse for TrackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            detail: self.to_string(),
        });

        let mut response = (status, body).into_response();
        if let TrackError::RangeNotSatisfiable { total, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TrackError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TrackError::NotReady(TrackStatus::Downloading).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackError::RangeNotSatisfiable {
                header: "bytes=x".into(),
                total: 10
            }
            .status_code(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }

    #[test]
    fn test_tool_diagnostic_is_the_stderr_tail() {
        let err = TrackError::Tool {
            tool: "yt-dlp".into(),
            diagnostic: "ERROR: Unsupported URL".into(),
        };
        assert_eq!(err.diagnostic(), "ERROR: Unsupported URL");
        assert_eq!(
            TrackError::OutputMissing.diagnostic(),
            "File not found after download"
        );
    }

    #[test]
    fn test_range_error_carries_content_range() {
        let response = TrackError::RangeNotSatisfiable {
            header: "bytes=5000-".into(),
            total: 1000,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
    }
}
