//! Usage Command
//!
//! Today's paid-inference calls and estimated spend.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn run(format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let usage = ctx.analyzer().usage()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&usage)?);
    } else {
        let out = Output::new();
        out.section("Inference Usage");
        out.usage(&usage);
    }
    Ok(())
}
