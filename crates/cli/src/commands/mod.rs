pub mod ask;
pub mod ingest;
pub mod init;
pub mod serve;

use docent_config::AppConfig;

/// Load the config, reporting failures the same way in every command.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
