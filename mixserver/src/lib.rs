//! # mixserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour créer le serveur HTTP de MixDeck
//! avec Axum. Les crates métier (comme `mixtracks`) y greffent leurs routes via
//! des traits d'extension, sans que `mixserver` ne les connaisse.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : ajout de routes JSON, de handlers avec état et de sous-routers
//! - 📡 **Server-Sent Events (SSE)** : logs en temps réel via `/log-sse`
//! - 📚 **Documentation OpenAPI** : Swagger UI généré pour chaque API enregistrée
//! - 🌍 **CORS** : couche permissive activable par configuration
//! - ⚡ **Arrêt gracieux** : gestion propre de l'arrêt sur Ctrl+C
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use mixserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
