use std::sync::Arc;

use listing_wizard::catalog::HttpCatalogClient;
use listing_wizard::geocoding::NominatimGeocoder;
use listing_wizard::models::{DraftPatch, ListingStatus};
use listing_wizard::persistence::FileDraftStorage;
use listing_wizard::wizard::WizardStep;
use listing_wizard::{WizardConfig, WizardSession};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WizardConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let patch_path = args.next();
    let action = args.next();

    info!("Listing wizard");
    info!("Draft key: {}", config.storage_key());

    let storage = Arc::new(FileDraftStorage::new(&config.storage_dir));
    let geocoder = Arc::new(NominatimGeocoder::new(
        &config.geocoder_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?);
    let catalog = Arc::new(HttpCatalogClient::new(
        &config.catalog_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?);

    let session = WizardSession::mount(&config, storage, geocoder, catalog);

    if let Some(path) = patch_path {
        let raw = tokio::fs::read_to_string(&path).await?;
        let patch: DraftPatch = serde_json::from_str(&raw)?;
        let changed = session.update_property_data(patch);
        info!("Applied {} field change(s) from {}", changed.len(), path);
        // Let a triggered address lookup finish before reporting.
        session.retry_geocoding().await;
    }

    let progress = session.progress();
    println!(
        "Step {} of {} ({})",
        progress.ordinal,
        progress.total,
        session.current_step().label()
    );
    for step in WizardStep::ALL {
        println!("  {:<14} {:?}", step.label(), session.get_step_status(step));
    }

    let missing = session.missing_fields();
    if missing.is_empty() {
        println!("Ready to publish");
    } else {
        println!("Missing: {}", missing.join(", "));
    }

    let result = match action.as_deref() {
        Some("save") => Some(session.save_draft().await),
        Some("publish") => Some(session.publish_property(ListingStatus::Active).await),
        Some(other) => {
            warn!("Unknown action '{}'; expected 'save' or 'publish'", other);
            None
        }
        None => None,
    };
    match result {
        Some(Ok(listing)) => println!("Catalog listing {} ({:?})", listing.id, listing.status),
        Some(Err(e)) => println!("Submission failed: {}", e),
        None => {}
    }

    if session.has_pending_save() {
        let saved_at = session.flush_pending_save()?;
        info!("💾 Draft saved at {}", saved_at);
    }
    session.close();

    Ok(())
}
