//! Batch Command
//!
//! Replay the scenario file through the batch analyzer. The run lives in this
//! process, so `start` waits for it; finished runs are persisted and
//! `status`/`show` read them back.
//!
//! Usage:
//!   greenhouse-monitor batch start
//!   greenhouse-monitor batch status [-f json]
//!   greenhouse-monitor batch show <id> [-f json]

use std::io::Write;
use std::time::Duration;

use crate::analysis::RunPhase;
use crate::cli::ui::{Output, render_progress_bar};
use crate::cli::util::CommandContext;
use crate::types::{Result, enum_to_str};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub async fn start() -> Result<()> {
    let ctx = CommandContext::load()?;
    let batch = ctx.batch();
    let out = Output::new();

    let started = batch.start().await?;
    out.info(&format!(
        "Run {} started with {} scenarios",
        started.run_id, started.total
    ));

    loop {
        let status = batch.status();
        print!(
            "\r  {} {}/{}",
            render_progress_bar(status.completed, status.total, 30),
            status.completed,
            status.total
        );
        let _ = std::io::stdout().flush();

        if status.status != RunPhase::Processing {
            println!();
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let status = batch.status();
    if status.status == RunPhase::Complete {
        out.success(&format!("Analyzed {} scenarios", status.completed));
        for result in &status.results {
            out.batch_row(result);
        }
    } else {
        out.error(&format!(
            "Run aborted after {} of {} scenarios (see logs)",
            status.completed, status.total
        ));
    }
    Ok(())
}

pub fn status(format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let status = ctx.batch().status();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let out = Output::new();
    out.section("Batch Analysis");
    out.field("Status", enum_to_str(&status.status));
    out.field("Progress", format!("{}/{}", status.completed, status.total));
    if status.results.is_empty() {
        out.info("No results yet. Run 'greenhouse-monitor batch start'.");
    } else {
        println!();
        for result in &status.results {
            out.batch_row(result);
        }
    }
    Ok(())
}

pub fn show(id: &str, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let result = ctx.batch().result_by_id(id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Scenario {}", result.id));
    out.field("Location", &result.location);
    out.field("Camera", &result.camera_id);
    if let Some(image) = &result.image {
        out.field("Image", image);
    }
    println!();
    out.analysis(&result.result);
    if let Some(alert) = result.pager_alert.as_ref().filter(|a| a.triggered) {
        out.warning(&format!(
            "Pager alert: {}",
            alert.reason.as_deref().unwrap_or("no reason given")
        ));
    }
    Ok(())
}
