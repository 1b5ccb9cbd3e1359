//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module cache la complexité de la configuration et du routage d'Axum.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **Routes JSON simples** : endpoints API avec `add_route()`
//! - 🎯 **Handlers avec état** : `add_handler_with_state()` (SSE, dumps, ...)
//! - 🧩 **Sous-routers** : `add_router()` pour monter un router complet
//! - 📚 **Documentation API** : OpenAPI/Swagger avec `add_openapi()`
//! - ⚡ **Gestion gracieuse** : arrêt propre sur Ctrl+C

use crate::logs::{LogsApiDoc, create_logs_router, init_logging, log_dump, log_sse};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use mixconfig::get_config;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Info serveur sérialisable
#[derive(Clone, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    cors: bool,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé dans les logs (ex: "localhost")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            cors: false,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
        }
    }

    async fn mount(&self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Ajoute une route JSON dynamique
    ///
    /// La closure fournie est appelée à chaque requête GET sur le chemin spécifié.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use mixserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({ "status": "online" })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.mount(path, Router::new().route("/", get(handler))).await;
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.mount(path, route).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        if path == "/" {
            self.mount("/", sub_router).await;
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            self.mount(&normalized, sub_router).await;
        }
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// Le `api_router` est monté sous `base_path`, et sa documentation est publiée :
    ///
    /// - `/swagger-ui/{name}` : Swagger UI
    /// - `/api-docs/{name}.json` : spécification OpenAPI
    ///
    /// # Exemple
    ///
    /// ```ignore
    /// // Routes finales : /api/tracks, /api/health, ...
    /// server.add_openapi("/api", api_router, ApiDoc::openapi(), "tracks").await;
    /// ```
    pub async fn add_openapi(
        &mut self,
        base_path: &str,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger_path = format!("/swagger-ui/{}", name);
        let swagger_path_static: &'static str = Box::leak(swagger_path.into_boxed_str());

        let openapi_json_path = format!("/api-docs/{}.json", name);
        let openapi_json_path_static: &'static str = Box::leak(openapi_json_path.into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path_static).url(openapi_json_path_static, openapi);

        self.add_router(base_path, api_router).await;

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(swagger);
    }

    /// Retourne une copie du router courant (utile pour les tests en mémoire)
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Active ou désactive la couche CORS permissive
    pub fn set_cors(&mut self, enabled: bool) {
        self.cors = enabled;
    }

    /// Démarre le serveur HTTP
    ///
    /// Lie le port configuré puis lance le service en tâche de fond, avec un
    /// arrêt gracieux sur Ctrl+C. Une erreur de bind est remontée à l'appelant.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            "Server {} running at http://{}:{}",
            self.name, self.base_url, self.http_port
        );

        let mut router = self.router.read().await.clone();
        if self.cors {
            router = router.layer(CorsLayer::permissive());
        }

        let shutdown = async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                Err(e) => {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        self.join_handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        }));

        Ok(())
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Routes enregistrées :
    ///
    /// - `GET /log-sse` : flux SSE (historique puis temps réel)
    /// - `GET /log-dump` : dump JSON du buffer circulaire
    /// - `GET|POST /api/logs/log_setup` : lecture / changement du niveau de log
    pub async fn init_logging(&mut self) {
        let log_state = init_logging();

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_openapi(
            "/api/logs",
            create_logs_router(log_state),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
    cors: bool,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            cors: false,
        }
    }

    /// Crée un builder à partir de la configuration globale
    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: "MixDeck-Server".to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
            cors: config.get_cors_enabled(),
        }
    }

    /// Active la couche CORS permissive
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        let mut server = Server::new(self.name, self.base_url, self.http_port);
        server.set_cors(self.cors);
        server
    }
}
