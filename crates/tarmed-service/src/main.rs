//! TARMED packager batch binary.

use tarmed_loader::{discover_input_files, PackageManager, PackagerError};
use tarmed_service::{PackagerServer, ServiceConfig, ServiceError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    tracing::info!("Loading TARMED data from: {}", config.data_path.display());

    let mut files = discover_input_files(&config.data_path)?;
    if let Some(categories) = &config.categories_path {
        files = files.with_categories(categories);
    }
    match &files.category_file {
        Some(path) => tracing::info!("Using categories from: {}", path.display()),
        None => tracing::warn!("No category file found, exporting without category sheets"),
    }

    let (handle, core) = PackagerServer::spawn(PackageManager::new(config.packaging.clone()));

    let summary = handle.load(files).await?;
    tracing::info!("{}", summary);

    let sheets = handle.export_packages(&config.output_dir).await?;
    tracing::info!(
        "Wrote {} sheets to {}: {}",
        sheets.len(),
        config.output_dir.display(),
        sheets.join(", ")
    );

    if let Some(rules_path) = &config.rules_path {
        let count = handle.load_rules(rules_path).await?;
        tracing::info!("Loaded {} rules from {}", count, rules_path.display());

        match handle.export_rules(&config.output_dir).await {
            Ok(rows) => tracing::info!("Wrote {} rule matches", rows),
            Err(ServiceError::Packager(PackagerError::NoRules)) => {
                tracing::warn!("Rule file contains no rules, skipping rule export")
            }
            Err(e) => return Err(e.into()),
        }
    }

    drop(handle);
    core.await?;
    Ok(())
}
