//! Analyze Command
//!
//! Run the single-reading pipeline once, outside the HTTP surface.
//!
//! Usage:
//!   greenhouse-monitor analyze reading.json [--image leaf.jpg] [-f json]
//!   greenhouse-monitor analyze '{"temperature": 24, ...}'

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, read_image, read_sensor_payload};
use crate::types::Result;

pub async fn run(sensor_data: &str, image: Option<&Path>, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let payload = read_sensor_payload(sensor_data)?;
    let image = image.map(read_image).transpose()?;

    let analyzer = ctx.analyzer();
    let result = analyzer.analyze_payload(&payload, image).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let out = Output::new();
        out.header("Plant Health Assessment");
        out.analysis(&result);
    }
    Ok(())
}
