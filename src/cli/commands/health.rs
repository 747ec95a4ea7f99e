//! Health Command
//!
//! Same report as `GET /health`. With `--probe` the provider endpoint is
//! contacted as well.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::server::AppState;
use crate::types::Result;

pub async fn run(probe: bool, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let analyzer = ctx.analyzer();
    let state = AppState::new(analyzer.clone(), ctx.batch(), ctx.metrics.clone());
    let report = state.health();

    let reachable = if probe {
        let adapter = analyzer.inference()?;
        Some(match adapter.provider().health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("Provider probe failed: {}", e);
                false
            }
        })
    } else {
        None
    };

    if format == "json" {
        let mut value = serde_json::to_value(&report)?;
        if let (Some(reachable), Some(obj)) = (reachable, value.as_object_mut()) {
            obj.insert("providerReachable".to_string(), reachable.into());
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let out = Output::new();
    out.section("Greenhouse Monitor");
    out.field("Status", report.status);
    out.field("Version", report.version);
    match &report.openai_model {
        Some(model) => out.field("Model", model),
        None => out.warning("Inference not configured (OPENAI_API_KEY missing)"),
    }
    match reachable {
        Some(true) => out.success("Provider reachable"),
        Some(false) => out.error("Provider unreachable"),
        None => {}
    }

    if let Some(usage) = &report.usage {
        out.section("Usage Today");
        out.usage(usage);
    }
    Ok(())
}
