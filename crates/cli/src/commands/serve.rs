//! `docent serve`: Start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Docent Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Docs:      {}", config.ingest.docs_dir.display());
    println!("   Model:     {}", config.chat.model);

    docent_gateway::start(config).await?;

    Ok(())
}
