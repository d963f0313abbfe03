//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/planforge/config.toml)
//! 3. Project config (./planforge.toml)
//! 4. Environment variables (PLANFORGE_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
