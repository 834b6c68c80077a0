//! Init command implementation

use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use safelens::config::Config;

/// Write a default config to `path` (or ~/.safelens/config.toml)
pub fn init_command(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::global_config_path);

    if path.exists() && !force {
        bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save_to_file(&path)?;
    info!("Wrote default config to {}", path.display());
    println!("Created {}", path.display());
    println!("Add an [identity] section with your user_id and email to submit scans.");
    Ok(())
}
