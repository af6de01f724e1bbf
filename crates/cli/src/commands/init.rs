//! `docent init`: Write a default configuration file.

use docent_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run `docent init`.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("   1. Set OPENAI_API_KEY or add api_key to {}", config_path.display());
    println!("   2. Put your markdown under ./docs and run: docent ingest");
    println!("   3. Run: docent ask");

    Ok(())
}
