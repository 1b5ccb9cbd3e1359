//! Extension pour intégrer la bibliothèque de pistes dans mixconfig
//!
//! Ce module fournit le trait `TrackConfigExt` qui ajoute à `mixconfig::Config`
//! les réglages du répertoire des pistes et des outils externes.

use crate::library::TrackLibrary;
use crate::tools::{FfProbe, YtDlp};
use anyhow::Result;
use mixconfig::Config;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_TRACKS_DIR: &str = "tracks";
const DEFAULT_DB_FILE: &str = crate::store::DEFAULT_DB_FILE;
const DEFAULT_MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;
const DEFAULT_DOWNLOADER: &str = "yt-dlp";
const DEFAULT_PROBER: &str = "ffprobe";

/// Trait d'extension pour configurer la bibliothèque de pistes
///
/// # Exemple
///
/// ```rust,ignore
/// use mixconfig::get_config;
/// use mixtracks::TrackConfigExt;
///
/// let config = get_config();
/// let library = config.create_track_library().await?;
/// ```
#[async_trait::async_trait]
pub trait TrackConfigExt {
    /// Répertoire des pistes, absolu ou relatif au répertoire de configuration
    /// (default: "tracks"). Il est créé s'il n'existe pas.
    fn get_tracks_dir(&self) -> Result<PathBuf>;

    fn set_tracks_dir(&self, directory: &str) -> Result<()>;

    /// Nom du document de catalogue (default: "tracks_db.json")
    fn get_tracks_db_file(&self) -> String;

    /// Taille maximale d'un upload en octets (default: 200 MiB)
    fn get_max_upload_size(&self) -> usize;

    fn set_max_upload_size(&self, size: usize) -> Result<()>;

    /// Programme de téléchargement (default: "yt-dlp")
    fn get_downloader_program(&self) -> String;

    /// Programme de sonde (default: "ffprobe")
    fn get_prober_program(&self) -> String;

    /// Ouvre la bibliothèque avec les outils configurés
    ///
    /// Le catalogue est réconcilié avec le contenu du répertoire.
    async fn create_track_library(&self) -> Result<Arc<TrackLibrary>>;
}

#[async_trait::async_trait]
impl TrackConfigExt for Config {
    fn get_tracks_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["tracks", "directory"], DEFAULT_TRACKS_DIR)
    }

    fn set_tracks_dir(&self, directory: &str) -> Result<()> {
        self.set_managed_dir(&["tracks", "directory"], directory)
    }

    fn get_tracks_db_file(&self) -> String {
        self.get_string_or(&["tracks", "db_file"], DEFAULT_DB_FILE)
    }

    fn get_max_upload_size(&self) -> usize {
        let raw = self.get_u64_or(&["tracks", "max_upload_size"], DEFAULT_MAX_UPLOAD_SIZE as u64);
        usize::try_from(raw).unwrap_or(DEFAULT_MAX_UPLOAD_SIZE)
    }

    fn set_max_upload_size(&self, size: usize) -> Result<()> {
        self.set_u64(&["tracks", "max_upload_size"], size as u64)
    }

    fn get_downloader_program(&self) -> String {
        self.get_string_or(&["tracks", "downloader", "program"], DEFAULT_DOWNLOADER)
    }

    fn get_prober_program(&self) -> String {
        self.get_string_or(&["tracks", "prober", "program"], DEFAULT_PROBER)
    }

    async fn create_track_library(&self) -> Result<Arc<TrackLibrary>> {
        let dir = self.get_tracks_dir()?;
        let db_file = self.get_tracks_db_file();
        let library = TrackLibrary::open(
            dir,
            &db_file,
            Arc::new(YtDlp::new(self.get_downloader_program())),
            Arc::new(FfProbe::new(self.get_prober_program())),
        )
        .await?;
        Ok(Arc::new(library))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_track_defaults() {
        let (dir, config) = temp_config();
        assert_eq!(config.get_tracks_dir().unwrap(), dir.path().join("tracks"));
        assert_eq!(config.get_tracks_db_file(), "tracks_db.json");
        assert_eq!(config.get_max_upload_size(), DEFAULT_MAX_UPLOAD_SIZE);
        assert_eq!(config.get_downloader_program(), "yt-dlp");
        assert_eq!(config.get_prober_program(), "ffprobe");
    }

    #[tokio::test]
    async fn test_create_track_library_uses_configured_dir() {
        let (dir, config) = temp_config();
        let custom = dir.path().join("audio");
        config.set_tracks_dir(custom.to_str().unwrap()).unwrap();
        std::fs::create_dir_all(&custom).unwrap();
        std::fs::write(custom.join("found.mp3"), b"x").unwrap();

        let library = config.create_track_library().await.unwrap();
        assert_eq!(library.store().tracks_dir(), custom.as_path());
        assert_eq!(library.count().await, 1);
    }
}
