use mixserver::ServerBuilder;
use mixtracks::TrackLibraryExt;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let config = mixconfig::get_config();
    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    info!("⚙️ Configuration loaded from {}", config.dir().display());

    server
        .add_route("/info", || async {
            serde_json::json!({"name": "MixDeck", "version": env!("CARGO_PKG_VERSION")})
        })
        .await;

    // ========== PHASE 2 : Bibliothèque de pistes ==========

    info!("🎵 Initializing track library...");
    let library = server.init_track_library_configured().await?;
    info!(
        "✅ Track library ready: {} track(s) in catalog",
        library.count().await
    );

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let server_info = server.info();
    info!(
        "✅ MixDeck is ready on http://{}:{}",
        server_info.base_url, server_info.http_port
    );
    info!(
        "📖 API documentation at http://{}:{}/swagger-ui/tracks",
        server_info.base_url, server_info.http_port
    );
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
