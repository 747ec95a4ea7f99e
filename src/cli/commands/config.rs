//! Config Command
//!
//! Usage:
//!   greenhouse-monitor config show [-g] [-f json]
//!   greenhouse-monitor config path
//!   greenhouse-monitor config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged configuration, or the raw global file with `--global`.
/// The API key is never serialized.
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        return ConfigLoader::show_config(format == "json");
    }

    match ConfigLoader::global_config_path() {
        Some(path) if path.exists() => {
            println!("# Global Config: {}\n", path.display());
            println!("{}", std::fs::read_to_string(&path)?);
        }
        Some(_) => {
            println!("No global config found.");
            println!("Run 'greenhouse-monitor config init --global' to create one.");
        }
        None => println!("Cannot determine global config directory."),
    }
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let out = Output::new();
    if global {
        let dir = ConfigLoader::init_global(force)?;
        out.success("Initialized global configuration");
        out.field("Directory", dir.display());
    } else {
        let root = std::env::current_dir()?;
        let dir = ConfigLoader::init_project(&root, force)?;
        out.success("Initialized project configuration");
        out.field("Directory", dir.display());
        out.field("Config", ConfigLoader::project_config_path().display());
    }
    Ok(())
}
