//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/greenhouse-monitor/config.toml)
//! 3. Project config (.greenhouse/config.toml)
//! 4. Environment variables (GREENHOUSE_*, then legacy OPENAI_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
