//! # Logistik Router
//!
//! Routes newline-delimited activities read from stdin through the handler
//! registry until Ctrl+C, SIGTERM or end of input.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use logistik::config::ConfigManager;
use logistik::handlers::logging_handler;
use logistik::messaging::LinesBroker;
use logistik::pipeline::{ConsumeLoop, PipelineContext};

#[tokio::main]
async fn main() -> Result<()> {
    logistik::logging::init_tracing();

    let config = ConfigManager::load()
        .context("loading configuration")?
        .into_config();

    let context = PipelineContext::from_config(config)
        .await
        .context("building pipeline context")?;

    let verbs: Vec<&str> = context
        .config()
        .service
        .log_verbs
        .iter()
        .map(String::as_str)
        .collect();
    if !verbs.is_empty() {
        context
            .registry()
            .write()
            .await
            .register_for_verbs(&verbs, logging_handler("log"))
            .context("registering logging handler")?;
    }
    info!(verbs = ?verbs, "logging handler bound");

    let context = Arc::new(context);
    let consume_loop = ConsumeLoop::new(context.clone(), Arc::new(LinesBroker::stdin()));

    info!("🔄 Router running... Press Ctrl+C to shutdown gracefully");
    let reason = consume_loop.run().await?;

    info!(reason = ?reason, "✅ Router shutdown complete");
    Ok(())
}
