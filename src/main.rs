//! watsonx-facade: HTTP facade over watsonx.ai chat and embeddings.
//!
//! Loads configuration, wires the watsonx.ai client into the router and
//! serves it.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use watsonx_facade::config::{Cli, Config};
use watsonx_facade::model::watsonx::WatsonxClient;
use watsonx_facade::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "watsonx_facade=debug,tower_http=debug"
    } else {
        "watsonx_facade=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("watsonx-facade v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::load(&cli.config)?;
    let chat_options = config.chat_options();

    info!(
        base_url = %config.watsonx.base_url,
        version = %config.watsonx.version,
        chat_model = chat_options.model.as_deref().unwrap_or_default(),
        embedding_model = %config.embedding.model,
        has_api_key = !config.watsonx.api_key.is_empty(),
        "Configuration loaded"
    );

    let prompts = config.prompt_builder()?;
    let client = Arc::new(WatsonxClient::new(
        config.watsonx.clone(),
        chat_options,
        config.embedding.model.clone(),
    ));

    // Build application state.
    let state = Arc::new(AppState::new(client.clone(), client, prompts));

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = cli.listen.unwrap_or(config.server.listen);
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
