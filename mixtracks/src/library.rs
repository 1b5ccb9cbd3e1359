//! Point d'entrée de la bibliothèque : catalogue + acquisition

use crate::acquisition::Acquirer;
use crate::error::{Result, TrackError};
use crate::store::TrackStore;
use crate::tools::{AudioFormat, Downloader, Prober};
use crate::track::Track;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Bibliothèque de pistes partagée par les handlers HTTP
pub struct TrackLibrary {
    store: Arc<TrackStore>,
    acquirer: Acquirer,
}

impl TrackLibrary {
    /// Ouvre (et réconcilie) le catalogue de `tracks_dir`
    pub async fn open(
        tracks_dir: impl Into<PathBuf>,
        db_file: &str,
        downloader: Arc<dyn Downloader>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self> {
        let store = Arc::new(TrackStore::open(tracks_dir, db_file).await?);
        let library = Self::with_store(store, downloader, prober);
        info!(
            "🎵 {} tracks ready in {}",
            library.store.list_ready().await.len(),
            library.store.tracks_dir().display()
        );
        Ok(library)
    }

    /// Bibliothèque adossée à un catalogue déjà ouvert
    pub fn with_store(
        store: Arc<TrackStore>,
        downloader: Arc<dyn Downloader>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let acquirer = Acquirer::new(store.clone(), downloader, prober);
        Self { store, acquirer }
    }

    pub fn store(&self) -> &Arc<TrackStore> {
        &self.store
    }

    pub async fn list(&self) -> Vec<Track> {
        self.store.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Track> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| TrackError::NotFound(id.to_string()))
    }

    pub async fn start_download(
        &self,
        url: &str,
        format: AudioFormat,
        quality: &str,
    ) -> Result<Track> {
        self.acquirer.start_download(url, format, quality).await
    }

    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<Track> {
        self.acquirer.upload(original_name, bytes).await
    }

    /// Supprime la piste et son fichier
    pub async fn delete(&self, id: &str) -> Result<Track> {
        let track = self
            .store
            .remove(id)
            .await?
            .ok_or_else(|| TrackError::NotFound(id.to_string()))?;
        info!(track_id = %id, "🗑️ Track deleted");
        Ok(track)
    }

    /// Nombre total d'entrées du catalogue, tous états confondus
    pub async fn count(&self) -> usize {
        self.store.len().await
    }
}
