//! Acquisition des pistes : téléchargement distant et upload local
//!
//! Un téléchargement distant crée d'abord une piste `downloading`, puis un
//! worker tokio détaché la fait évoluer vers `ready` ou `error`. Le worker ne
//! remonte jamais d'erreur à l'appelant : tout échec est écrit dans la piste.
//!
//! L'upload est synchrone : la piste est créée directement `ready`.

use crate::error::{Result, TrackError};
use crate::store::TrackStore;
use crate::tools::{AudioFormat, AudioRequest, Downloader, Prober};
use crate::track::{
    PENDING_TITLE, Track, TrackStatus, UNKNOWN, UPLOAD_SOURCE, extension_of, stem_of,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Extensions acceptées à l'upload
pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 4] = [".mp3", ".wav", ".ogg", ".flac"];

/// Débit par défaut d'un mp3, en kbit/s
pub const DEFAULT_QUALITY: &str = "192";

/// Remplace le titre provisoire d'une piste arrivée dans un état terminal
fn settle_title(track: &mut Track) {
    if track.title.as_deref() == Some(PENDING_TITLE) {
        track.title = Some(UNKNOWN.to_string());
    }
}

/// Pilote des acquisitions, partagé entre les handlers
#[derive(Clone)]
pub struct Acquirer {
    store: Arc<TrackStore>,
    downloader: Arc<dyn Downloader>,
    prober: Arc<dyn Prober>,
}

impl Acquirer {
    pub fn new(
        store: Arc<TrackStore>,
        downloader: Arc<dyn Downloader>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            store,
            downloader,
            prober,
        }
    }

    /// Démarre un téléchargement distant
    ///
    /// La piste `downloading` est persistée avant le lancement du worker et
    /// retournée immédiatement.
    pub async fn start_download(
        &self,
        url: &str,
        format: AudioFormat,
        quality: &str,
    ) -> Result<Track> {
        let track = self
            .store
            .create(|id| Track::downloading(id, url, format.extension()))
            .await?;

        info!(track_id = %track.id, url, format = format.extension(), "⬇️ Download queued");

        let request = AudioRequest {
            url: url.to_string(),
            output_dir: self.store.tracks_dir().to_path_buf(),
            stem: track.id.clone(),
            format,
            quality: quality.to_string(),
        };
        let worker = self.clone();
        tokio::spawn(async move {
            let id = request.stem.clone();
            let inner = worker.clone();
            // un panic du worker ne doit pas laisser la piste en `downloading`
            if let Err(e) = tokio::spawn(async move { inner.run_download(request).await }).await {
                error!(track_id = %id, "Download worker aborted: {}", e);
                let diagnostic = format!("Download worker aborted: {}", e);
                let failed = worker
                    .store
                    .update(&id, |track| {
                        track.fail(diagnostic);
                        settle_title(track);
                    })
                    .await;
                if let Err(e) = failed {
                    error!(track_id = %id, "Cannot persist download failure: {}", e);
                }
            }
        });

        Ok(track)
    }

    /// Corps du worker : métadonnées, extraction, localisation du fichier
    ///
    /// L'identifiant de la piste est `request.stem`. Ne panique pas et
    /// laisse toujours la piste dans un état terminal.
    pub async fn run_download(&self, request: AudioRequest) {
        let id = request.stem.clone();

        self.fetch_metadata(&id, &request.url).await;

        let outcome = match self.downloader.download_audio(&request).await {
            Ok(()) => self.locate_output(&request).await,
            Err(e) => Err(e),
        };

        let result = self
            .store
            .update(&id, |track| {
                match &outcome {
                    Ok(filename) => {
                        track.filename = filename.clone();
                        track.format = extension_of(filename);
                        track.status = TrackStatus::Ready;
                        track.error = None;
                    }
                    Err(e) => track.fail(e.diagnostic()),
                }
                settle_title(track);
            })
            .await;

        match (&outcome, result) {
            (_, Err(e)) => error!(track_id = %id, "Cannot persist download outcome: {}", e),
            (_, Ok(None)) => debug!(track_id = %id, "Track deleted while downloading"),
            (Ok(filename), Ok(Some(_))) => info!(track_id = %id, file = %filename, "✅ Download complete"),
            (Err(e), Ok(Some(_))) => warn!(track_id = %id, "❌ Download failed: {}", e),
        }
    }

    /// Remplit titre, artiste et durée ; un échec n'est pas bloquant
    async fn fetch_metadata(&self, id: &str, url: &str) {
        let info = match self.downloader.fetch_info(url).await {
            Ok(info) => info,
            Err(e) => {
                debug!(track_id = %id, "Metadata query failed, keeping defaults: {}", e);
                return;
            }
        };

        let updated = self
            .store
            .update(id, |track| {
                track.title = Some(info.title.clone().unwrap_or_else(|| UNKNOWN.to_string()));
                track.artist = Some(
                    info.display_artist()
                        .map(str::to_string)
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                );
                track.duration = info.duration;
            })
            .await;
        if let Err(e) = updated {
            warn!(track_id = %id, "Cannot persist metadata: {}", e);
        }
    }

    /// Nom du fichier produit : le nom attendu, sinon le premier `ID.*`
    async fn locate_output(&self, request: &AudioRequest) -> Result<String> {
        let expected = request.expected_filename();
        if tokio::fs::metadata(request.output_dir.join(&expected))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Ok(expected);
        }

        let prefix = format!("{}.", request.stem);
        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(&request.output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                if name.starts_with(&prefix) && entry.file_type().await?.is_file() {
                    candidates.push(name);
                }
            }
        }
        candidates.sort();
        candidates.into_iter().next().ok_or(TrackError::OutputMissing)
    }

    /// Enregistre un fichier envoyé par un client
    ///
    /// L'extension est vérifiée avant toute écriture ; le fichier est rangé
    /// sous `ID + extension`.
    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<Track> {
        let ext = match extension_of(original_name) {
            e if e.is_empty() => String::new(),
            e => format!(".{}", e.to_lowercase()),
        };
        if !ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
            return Err(TrackError::UnsupportedFormat {
                extension: ext,
                allowed: ALLOWED_UPLOAD_EXTENSIONS.join(", "),
            });
        }

        let id = self.store.reserve_id().await;
        let filename = format!("{}{}", id, ext);
        let dest = self.store.file_path(&filename);

        if let Err(e) = tokio::fs::write(&dest, bytes).await {
            self.store.release(&id).await;
            return Err(e.into());
        }

        let mut track = Track::ready(id, &filename, Some(stem_of(original_name)), UPLOAD_SOURCE);
        track.duration = self.probe(&dest).await;

        let track = self.store.insert(track).await?;
        info!(
            track_id = %track.id,
            file = %filename,
            size = bytes.len(),
            "📤 Upload stored"
        );
        Ok(track)
    }

    async fn probe(&self, path: &Path) -> Option<f64> {
        match self.prober.probe_duration(path).await {
            Ok(duration) => duration,
            Err(e) => {
                debug!(path = %path.display(), "Duration probe failed: {}", e);
                None
            }
        }
    }
}
