//! `vdm history` – list completed downloads.

use anyhow::Result;
use vdm_core::config::VdmConfig;
use vdm_core::controller::MAX_HISTORY_LIMIT;
use vdm_core::store::JobStore;

pub async fn run_history(cfg: &VdmConfig, limit: Option<u32>) -> Result<()> {
    let store = JobStore::open(cfg).await?;
    let limit = limit.unwrap_or(cfg.history_limit).clamp(1, MAX_HISTORY_LIMIT);
    let rows = store.list_downloads(limit).await?;
    if rows.is_empty() {
        println!("No downloads in history.");
        return Ok(());
    }
    println!(
        "{:<20} {:<12} {:<8} {:<6} {:<10} {}",
        "CREATED", "VIDEO", "QUALITY", "FORMAT", "SIZE", "TITLE"
    );
    for d in rows {
        println!(
            "{:<20} {:<12} {:<8} {:<6} {:<10} {}",
            d.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            d.video_id,
            d.quality,
            d.format,
            d.size,
            d.title
        );
    }
    Ok(())
}
