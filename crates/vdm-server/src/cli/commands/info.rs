//! `vdm info <url>` – run the extractor's info mode and print the metadata.

use anyhow::Result;
use vdm_core::config::VdmConfig;
use vdm_core::controller::validate_source_url;
use vdm_core::extractor::{Extractor, ProcessExtractor};

pub async fn run_info(cfg: &VdmConfig, url: &str) -> Result<()> {
    let url = validate_source_url(url)?;
    let extractor = ProcessExtractor::new(cfg.extractor.clone());
    let meta = extractor.info(url.as_str()).await?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
