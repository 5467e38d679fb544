pub mod api;

use crate::agent::ChatGateway;
use crate::photos::PhotoLister;
use api::AppState;
use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    addr: String,
    state: AppState,
    assets_dir: PathBuf,
}

impl Server {
    pub fn new(
        addr: String,
        gateway: ChatGateway,
        photos: PhotoLister,
    ) -> Self {
        let assets_dir = photos.root().to_path_buf();
        if !assets_dir.is_dir() {
            warn!("Assets directory {} does not exist; /assets and photo listings will be empty.", assets_dir.display());
        }

        Self {
            addr,
            state: AppState {
                gateway: Arc::new(gateway),
                photos: Arc::new(photos),
            },
            assets_dir,
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let app = api::router(self.state, self.assets_dir);

        let listener = TcpListener::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
