use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nft_openaction_kit::api::{create_kit_router, KitApiState};
use nft_openaction_kit::{KitConfig, NftOpenActionKit};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("NFT_KIT_CONFIG") {
        Ok(path) => KitConfig::load_from_file(&path)?,
        Err(_) => KitConfig::load_from_env(),
    };
    config.validate()?;

    let kit = NftOpenActionKit::new(config)?;
    info!("Platforms enabled: {:?}", kit.platform_names());

    let app = create_kit_router(KitApiState::new(Arc::new(kit))).layer(CorsLayer::permissive());

    let addr = std::env::var("NFT_KIT_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
