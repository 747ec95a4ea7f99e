//! Init Command
//!
//! Create `.greenhouse/` with a default config and an initialized database.

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::storage::Database;
use crate::types::{MonitorError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let project_dir = root.join(ConfigLoader::project_dir());

    if project_dir.exists() && !force {
        return Err(MonitorError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    ConfigLoader::init_project(&root, force)?;

    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let config = ConfigLoader::load()?;
    Database::open_initialized(config.storage.database_path())?;

    let out = Output::new();
    out.success("Initialized greenhouse monitor in .greenhouse/");
    out.field("Database", config.storage.database_path().display());
    println!();
    println!("Next steps:");
    println!("  1. Export OPENAI_API_KEY (or set llm.api_key in the global config)");
    println!("  2. Run 'greenhouse-monitor serve' or 'greenhouse-monitor analyze <reading.json>'");
    Ok(())
}
