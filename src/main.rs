mod builtins;
mod config;
mod dispatch;
mod document;
mod drop;
mod editor;
mod export;
mod frame;
mod props;
mod registry;
mod render;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::generation::{DescriptorGenerator, HttpGenerator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env()?;

    // Generation is optional: without a generator URL the canvas still works.
    let generator: Option<Arc<dyn DescriptorGenerator>> = match &config.generator {
        Some(generator_config) => match HttpGenerator::new(generator_config) {
            Ok(client) => {
                tracing::info!(url = %generator_config.url, "descriptor generator initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "descriptor generator failed to build; generation disabled");
                None
            }
        },
        None => {
            tracing::warn!("GENERATOR_URL not set; generation disabled");
            None
        }
    };

    let sandbox = registry::sandbox::Sandbox::new(config.sandbox);
    let state = state::AppState::new(sandbox, generator);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "composer listening");
    axum::serve(listener, app).await?;
    Ok(())
}
