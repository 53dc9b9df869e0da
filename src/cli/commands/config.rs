//! Config Command
//!
//! Usage:
//!   campaign-research config show [-f json]
//!   campaign-research config path
//!   campaign-research config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Directory: {}", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        println!("  Config:    {}", config_path.display());
    }
    Ok(())
}

pub fn init_project() -> Result<()> {
    let root = std::env::current_dir()?;
    let dir = ConfigLoader::init_project_in(&root)?;
    println!("✓ Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!("  Config:    {}", dir.join("config.toml").display());
    Ok(())
}
