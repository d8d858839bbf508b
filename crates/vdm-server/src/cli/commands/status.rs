//! `vdm status <id>` – show the persisted row of one job.

use anyhow::{bail, Result};
use vdm_core::config::VdmConfig;
use vdm_core::job::parse_job_id;
use vdm_core::store::JobStore;

pub async fn run_status(cfg: &VdmConfig, raw_id: &str) -> Result<()> {
    let Some(id) = parse_job_id(raw_id) else {
        bail!("not a job id: {raw_id}");
    };
    let store = JobStore::open(cfg).await?;
    let Some(job) = store.get_job(id).await? else {
        bail!("job {id} not found");
    };

    println!("id:        {}", job.id);
    println!("video:     {} (format {})", job.video_id, job.format_id);
    println!("status:    {}", job.status);
    println!("progress:  {}%", job.progress);
    println!("created:   {}", job.created_at.to_rfc3339());
    println!("updated:   {}", job.updated_at.to_rfc3339());
    if let Some(path) = &job.file_path {
        println!("file:      {}", path.display());
    }
    if let Some(error) = &job.error {
        println!("error:     {}", error);
    }
    Ok(())
}
