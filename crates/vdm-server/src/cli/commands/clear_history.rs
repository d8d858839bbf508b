//! `vdm clear-history` – delete all download history.

use anyhow::Result;
use vdm_core::config::VdmConfig;
use vdm_core::store::JobStore;

pub async fn run_clear_history(cfg: &VdmConfig) -> Result<()> {
    let store = JobStore::open(cfg).await?;
    let n = store.clear_downloads().await?;
    println!("Removed {} history entries.", n);
    Ok(())
}
