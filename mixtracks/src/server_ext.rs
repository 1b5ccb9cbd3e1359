//! Implémentation du trait TrackLibraryExt pour le serveur mixserver
//!
//! `mixtracks` étend `mixserver::Server` sans que `mixserver` connaisse
//! `mixtracks` : la bibliothèque ajoute ses routes via un trait d'extension.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use mixtracks::TrackLibraryExt;
//! use mixserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new("MixDeck", "localhost", 8000).build();
//! let library = server.init_track_library_configured().await?;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use crate::config_ext::TrackConfigExt;
use crate::library::TrackLibrary;
use crate::{ApiDoc, api};
use mixserver::Server;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

/// Trait d'extension pour ajouter la bibliothèque de pistes à mixserver
#[async_trait::async_trait]
pub trait TrackLibraryExt {
    /// Enregistre les routes HTTP d'une bibliothèque déjà ouverte
    ///
    /// # Routes enregistrées
    ///
    /// - `POST /api/download` - Lancer un téléchargement
    /// - `POST /api/upload` - Envoyer un fichier
    /// - `GET /api/tracks` - Liste des pistes
    /// - `GET|DELETE /api/tracks/{id}` - Consulter / supprimer une piste
    /// - `GET /api/tracks/{id}/audio` - Lire l'audio (Range)
    /// - `GET /api/health` - État du service
    /// - `GET /swagger-ui/tracks` - Documentation interactive
    async fn init_track_library(&mut self, library: Arc<TrackLibrary>, max_upload: usize);

    /// Ouvre la bibliothèque avec la configuration et enregistre ses routes
    async fn init_track_library_configured(&mut self) -> anyhow::Result<Arc<TrackLibrary>>;
}

#[async_trait::async_trait]
impl TrackLibraryExt for Server {
    async fn init_track_library(&mut self, library: Arc<TrackLibrary>, max_upload: usize) {
        // Routes finales : /api/download, /api/tracks/{id}, ...
        let api_router = api::create_router(library, max_upload);
        self.add_openapi("/api", api_router, ApiDoc::openapi(), "tracks")
            .await;
    }

    async fn init_track_library_configured(&mut self) -> anyhow::Result<Arc<TrackLibrary>> {
        let config = mixconfig::get_config();
        let library = config.create_track_library().await?;
        let max_upload = config.get_max_upload_size();

        info!(
            "tracks directory {}, upload limit {} bytes",
            library.store().tracks_dir().display(),
            max_upload
        );

        self.init_track_library(library.clone(), max_upload).await;
        Ok(library)
    }
}
