//! # mixtracks - Bibliothèque de pistes audio pour MixDeck
//!
//! Cette crate acquiert des pistes audio et les diffuse en HTTP :
//!
//! - Téléchargement distant via un outil externe (yt-dlp), en tâche de fond
//! - Upload direct de fichiers `.mp3`, `.wav`, `.ogg`, `.flac`
//! - Catalogue JSON persistant, réconcilié au démarrage avec le disque
//! - Diffusion avec support des requêtes HTTP Range
//!
//! ## Architecture
//!
//! - [`store`] : catalogue persistant et réconciliation
//! - [`tools`] : traits [`Downloader`] / [`Prober`] et leurs implémentations
//! - [`acquisition`] : worker de téléchargement et upload
//! - [`delivery`] : réponses complètes ou partielles
//! - [`api`] : handlers REST documentés (OpenAPI)
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use mixtracks::TrackLibraryExt;
//! use mixserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_track_library_configured().await?;
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod api;
pub mod delivery;
pub mod error;
pub mod library;
pub mod openapi;
pub mod store;
pub mod tools;
pub mod track;

#[cfg(feature = "config")]
pub mod config_ext;

#[cfg(feature = "server")]
pub mod server_ext;

pub use acquisition::{ALLOWED_UPLOAD_EXTENSIONS, Acquirer};
pub use error::{ErrorResponse, Result, TrackError};
pub use library::TrackLibrary;
pub use openapi::ApiDoc;
pub use store::{ReconcileReport, TrackStore};
pub use tools::{AudioFormat, AudioRequest, Downloader, FfProbe, Prober, RemoteInfo, YtDlp};
pub use track::{Track, TrackStatus};

#[cfg(feature = "config")]
pub use config_ext::TrackConfigExt;

#[cfg(feature = "server")]
pub use server_ext::TrackLibraryExt;
