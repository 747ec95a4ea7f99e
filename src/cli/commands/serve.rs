//! Serve Command

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::server::{AppState, serve};
use crate::types::Result;

pub async fn run(bind: Option<String>) -> Result<()> {
    let config = ConfigLoader::load()?;
    let state = Arc::new(AppState::from_config(&config)?);

    if !state.analyzer.is_configured() {
        tracing::warn!(
            "OPENAI_API_KEY not set: analysis requests needing inference will be rejected"
        );
    }

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    serve(state, &bind).await
}
