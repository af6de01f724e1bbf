//! `docent ingest`: Embed the docs directory into the section store.

use std::path::PathBuf;

use docent_gateway::AppState;

pub async fn run(
    dir: Option<PathBuf>,
    json: bool,
    reset: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    if let Some(dir) = dir {
        config.ingest.docs_dir = dir;
    }

    let state = AppState::from_config(&config).await?;
    let report = if reset {
        state.ingestor.rebuild_dir(&state.docs_dir).await?
    } else {
        state.ingestor.ingest_dir(&state.docs_dir).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report.sections)?);
        return Ok(());
    }

    println!("Ingested {}", state.docs_dir.display());
    println!("   Documents: {}", report.documents);
    println!("   Sections:  {}", report.sections.len());
    println!("   Inserted:  {}", report.inserted);
    println!("   Unchanged: {}", report.unchanged);
    println!("   Stored:    {}", state.sections.count().await?);

    Ok(())
}
