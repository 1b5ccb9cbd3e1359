//! Modèle de données : la piste et son cycle de vie

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use utoipa::ToSchema;

/// Provenance d'une piste envoyée par un client
pub const UPLOAD_SOURCE: &str = "upload";

/// Provenance d'un fichier découvert sur le disque sans entrée au catalogue
pub const ORPHAN_SOURCE: &str = "local";

/// Titre affiché tant que les métadonnées distantes ne sont pas connues
pub const PENDING_TITLE: &str = "Downloading...";

/// Valeur par défaut des champs d'affichage absents des métadonnées distantes
pub const UNKNOWN: &str = "Unknown";

/// État d'une piste
///
/// `Downloading` n'évolue que vers `Ready` ou `Error`, deux états terminaux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Downloading,
    Ready,
    Error,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Downloading => "downloading",
            TrackStatus::Ready => "ready",
            TrackStatus::Error => "error",
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entrée du catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Track {
    /// Identifiant court, immuable
    #[schema(example = "3f9a1c2e")]
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Durée en secondes
    #[serde(default)]
    pub duration: Option<f64>,
    /// Réservé, jamais calculé
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Extension du fichier, sans point
    #[schema(example = "mp3")]
    pub format: String,
    /// Nom du fichier dans le répertoire des pistes, vide pendant le téléchargement
    #[serde(default)]
    pub filename: String,
    /// URL d'origine, ou `upload` / `local`
    #[serde(default)]
    pub url_source: String,
    pub status: TrackStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl Track {
    /// Nouvelle piste en cours de téléchargement depuis `url`
    pub fn downloading(id: String, url: &str, format: &str) -> Self {
        Self {
            id,
            title: Some(PENDING_TITLE.to_string()),
            artist: None,
            duration: None,
            bpm: None,
            format: format.to_string(),
            filename: String::new(),
            url_source: url.to_string(),
            status: TrackStatus::Downloading,
            error: None,
        }
    }

    /// Piste prête adossée au fichier `filename`
    ///
    /// Le format est l'extension du fichier.
    pub fn ready(id: String, filename: &str, title: Option<String>, url_source: &str) -> Self {
        Self {
            id,
            title,
            artist: None,
            duration: None,
            bpm: None,
            format: extension_of(filename),
            filename: filename.to_string(),
            url_source: url_source.to_string(),
            status: TrackStatus::Ready,
            error: None,
        }
    }

    /// Piste synthétisée pour un fichier orphelin : titre = nom sans extension
    pub fn orphan(id: String, filename: &str) -> Self {
        Self::ready(id, filename, Some(stem_of(filename)), ORPHAN_SOURCE)
    }

    pub fn is_ready(&self) -> bool {
        self.status == TrackStatus::Ready
    }

    /// Passe la piste en erreur avec son diagnostic
    pub fn fail(&mut self, diagnostic: impl Into<String>) {
        self.status = TrackStatus::Error;
        self.error = Some(diagnostic.into());
    }
}

/// Extension d'un nom de fichier, sans le point
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Nom de fichier sans son extension
pub fn stem_of(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}
